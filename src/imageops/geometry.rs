use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel};

/// Resize a pixel buffer to `height` x `width`. A zero target is the
/// identity. With `center_crop` the buffer is first cropped to its central
/// square so the aspect ratio survives; otherwise it is stretched.
///
/// The crop origin is a pure function of the input dimensions, so image,
/// mask and edge planes normalized with the same arguments stay aligned.
pub fn normalize<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    height: u32,
    width: u32,
    center_crop: bool,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    if height == 0 || width == 0 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    if center_crop && w != h {
        let side = w.min(h);
        let x = (w - side) / 2;
        let y = (h - side) / 2;
        let square = imageops::crop_imm(image, x, y, side, side).to_image();
        return imageops::resize(&square, width, height, FilterType::Triangle);
    }

    imageops::resize(image, width, height, FilterType::Triangle)
}
