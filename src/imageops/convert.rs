use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use ndarray::{s, Array2, Array3};
use nshare::{AsNdarray2, AsNdarray3};

// skimage rgb2gray luminance coefficients
const LUMA_R: f32 = 0.2125;
const LUMA_G: f32 = 0.7154;
const LUMA_B: f32 = 0.0721;

/// Promote a decoded image to 3-channel RGB, recording the stored shape as
/// an `(H, W, C)` triple. Grayscale sources report `C = 1` but flow through
/// the rest of the pipeline as RGB.
pub fn promote_to_rgb(image: DynamicImage) -> (RgbImage, [usize; 3]) {
    let shape = [
        image.height() as usize,
        image.width() as usize,
        image.color().channel_count() as usize,
    ];
    (image.into_rgb8(), shape)
}

/// Luminance plane in [0, 1], `(H, W)`.
pub fn rgb_to_gray(image: &RgbImage) -> Array2<f32> {
    let (width, height) = image.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let Rgb([r, g, b]) = *image.get_pixel(x as u32, y as u32);
        (LUMA_R * f32::from(r) + LUMA_G * f32::from(g) + LUMA_B * f32::from(b)) / 255.0
    })
}

/// Channel-first float tensor in [0, 1], `(3, H, W)`.
pub fn to_tensor(image: &RgbImage) -> Array3<f32> {
    image.as_ndarray3().mapv(|v| f32::from(v) / 255.0)
}

/// Single-channel plane as `(H, W)` floats in [0, 1].
pub fn to_plane(image: &GrayImage) -> Array2<f32> {
    image.as_ndarray2().mapv(|v| f32::from(v) / 255.0)
}

pub fn hflip2(plane: &Array2<f32>) -> Array2<f32> {
    plane.slice(s![.., ..;-1]).to_owned()
}

pub fn hflip3(tensor: &Array3<f32>) -> Array3<f32> {
    tensor.slice(s![.., .., ..;-1]).to_owned()
}

/// Quantize a [0, 1] plane back to an 8-bit image.
pub fn plane_to_image(plane: &Array2<f32>) -> GrayImage {
    let (height, width) = plane.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([(plane[[y as usize, x as usize]].clamp(0.0, 1.0) * 255.0).round() as u8])
    })
}

/// Quantize a `(3, H, W)` tensor back to an 8-bit RGB image.
pub fn tensor_to_image(tensor: &Array3<f32>) -> RgbImage {
    let (_, height, width) = tensor.dim();
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let q =
            |c: usize| (tensor[[c, y as usize, x as usize]].clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb([q(0), q(1), q(2)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn tensor_is_channel_first_and_normalized() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([255, 51, 0]));

        let tensor = to_tensor(&img);
        assert_eq!(tensor.dim(), (3, 2, 3));
        assert_eq!(tensor[[0, 1, 2]], 1.0);
        assert_eq!(tensor[[1, 1, 2]], 0.2);
        assert_eq!(tensor[[2, 1, 2]], 0.0);
    }

    #[test]
    fn gray_promotion_reports_stored_channels() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([100])));
        let (rgb, shape) = promote_to_rgb(gray);
        assert_eq!(shape, [2, 4, 1]);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn flips_are_involutions() {
        let plane = array![[0.0, 0.25, 0.5], [0.75, 1.0, 0.0]];
        assert_eq!(hflip2(&plane)[[0, 0]], 0.5);
        assert_eq!(hflip2(&hflip2(&plane)), plane);

        let tensor = Array3::from_shape_fn((3, 2, 3), |(c, y, x)| (c + 2 * y + x) as f32);
        assert_eq!(hflip3(&hflip3(&tensor)), tensor);
    }

    #[test]
    fn plane_round_trip() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x * 40 + y * 10) as u8]));
        assert_eq!(plane_to_image(&to_plane(&img)), img);
    }
}
