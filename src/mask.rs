use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use imageproc::map::map_colors;
use ndarray::{Array2, ArrayView2};
use rand::Rng;
use tracing::debug;

use crate::config::{Config, MaskKind};
use crate::errors::{DatasetError, Result};
use crate::imageops::geometry;

pub const OCCLUDED: u8 = 255;

/// Produce the occlusion mask for one sample at the already-normalized
/// image dimensions. Values are 0 (visible) or 255 (occluded).
pub fn generate<R: Rng>(
    config: &Config,
    mask_paths: &[PathBuf],
    (height, width): (u32, u32),
    index: usize,
    rng: &mut R,
) -> Result<GrayImage> {
    let center_crop = config.mode.center_crop();
    dispatch(
        config.mask_kind(),
        mask_paths,
        (height, width),
        index,
        center_crop,
        rng,
    )
}

fn dispatch<R: Rng>(
    kind: MaskKind,
    mask_paths: &[PathBuf],
    (height, width): (u32, u32),
    index: usize,
    center_crop: bool,
    rng: &mut R,
) -> Result<GrayImage> {
    match kind {
        // composite policies re-roll a base policy per call
        MaskKind::RandomBlockOrExternal => {
            let kind = if rng.gen_bool(0.5) {
                MaskKind::RandomBlock
            } else {
                MaskKind::External
            };
            debug!(?kind, "re-rolled composite mask policy");
            dispatch(kind, mask_paths, (height, width), index, center_crop, rng)
        }
        MaskKind::Any => {
            let kind = [MaskKind::RandomBlock, MaskKind::Half, MaskKind::External]
                [rng.gen_range(0..3)];
            debug!(?kind, "re-rolled composite mask policy");
            dispatch(kind, mask_paths, (height, width), index, center_crop, rng)
        }
        MaskKind::RandomBlock => {
            let blocks = rng.gen_range(2..5);
            let params = Array2::from_shape_fn((blocks, 8), |_| rng.gen::<f32>());
            Ok(generate_random_mask(params.view(), height, width))
        }
        MaskKind::Half => {
            let offset = if rng.gen_bool(0.5) { 0 } else { width / 2 };
            Ok(create_mask(width, height, width / 2, height, offset, 0))
        }
        MaskKind::External => {
            if mask_paths.is_empty() {
                return Err(DatasetError::ResourceUnavailable { list: "mask" });
            }
            // independent of the sample index by design
            let choice = rng.gen_range(0..mask_paths.len());
            let mask = load_gray(&mask_paths[choice])?;
            Ok(threshold(&geometry::normalize(
                &mask,
                height,
                width,
                center_crop,
            )))
        }
        MaskKind::ExternalIndexed => {
            if mask_paths.is_empty() {
                return Err(DatasetError::ResourceUnavailable { list: "mask" });
            }
            let mask = load_gray(&mask_paths[index % mask_paths.len()])?;
            Ok(threshold(&geometry::normalize(&mask, height, width, false)))
        }
    }
}

/// Rasterize one `mask_w` x `mask_h` rectangle at `(x, y)` onto a
/// `width` x `height` canvas.
pub fn create_mask(width: u32, height: u32, mask_w: u32, mask_h: u32, x: u32, y: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |px, py| {
        let inside = px >= x
            && px < x.saturating_add(mask_w)
            && py >= y
            && py < y.saturating_add(mask_h);
        Luma([if inside { OCCLUDED } else { 0 }])
    })
}

/// Rasterize the union of randomly parameterized blocks. Each row of
/// `params` holds eight uniform [0, 1) draws describing two jittered
/// rectangles; block sides span 1/8 to 3/8 of the matching canvas side.
pub fn generate_random_mask(params: ArrayView2<f32>, height: u32, width: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    for row in params.rows() {
        if row.len() < 8 {
            continue;
        }
        stamp_block(&mut mask, row[0], row[1], row[2], row[3]);
        stamp_block(&mut mask, row[4], row[5], row[6], row[7]);
    }
    mask
}

fn stamp_block(mask: &mut GrayImage, fx: f32, fy: f32, fw: f32, fh: f32) {
    let (width, height) = mask.dimensions();
    let bw = (width / 8 + (fw * (width / 4) as f32) as u32).max(1);
    let bh = (height / 8 + (fh * (height / 4) as f32) as u32).max(1);
    let x = (fx * width.saturating_sub(bw) as f32) as u32;
    let y = (fy * height.saturating_sub(bh) as f32) as u32;
    for py in y..(y + bh).min(height) {
        for px in x..(x + bw).min(width) {
            mask.put_pixel(px, py, Luma([OCCLUDED]));
        }
    }
}

/// Interpolation during resize smears a binary mask; any positive pixel is
/// pushed back to fully occluded.
pub fn threshold(mask: &GrayImage) -> GrayImage {
    map_colors(mask, |Luma([v])| Luma([if v > 0 { OCCLUDED } else { 0 }]))
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let decoded = image::open(path).map_err(|source| DatasetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.into_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn half_mask_covers_one_side_exactly() {
        for offset in [0, 32] {
            let mask = create_mask(64, 48, 32, 48, offset, 0);
            for (x, _, pixel) in mask.enumerate_pixels() {
                let expected = if (offset..offset + 32).contains(&x) {
                    OCCLUDED
                } else {
                    0
                };
                assert_eq!(pixel[0], expected);
            }
        }
    }

    #[test]
    fn threshold_is_idempotent_and_binary() {
        let soft = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 8 + y) as u8]));
        let hard = threshold(&soft);
        assert!(hard.pixels().all(|p| p[0] == 0 || p[0] == OCCLUDED));
        assert_eq!(threshold(&hard), hard);
        // a single positive count becomes fully occluded
        assert_eq!(hard.get_pixel(0, 1)[0], OCCLUDED);
        assert_eq!(hard.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn random_blocks_stay_on_canvas_and_are_binary() {
        let params = Array2::from_shape_fn((4, 8), |(i, j)| ((i * 8 + j) as f32) / 32.0);
        let mask = generate_random_mask(params.view(), 40, 60);
        assert_eq!(mask.dimensions(), (60, 40));
        assert!(mask.pixels().all(|p| p[0] == 0 || p[0] == OCCLUDED));
        assert!(mask.pixels().any(|p| p[0] == OCCLUDED));
        assert!(mask.pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn external_without_files_is_resource_unavailable() {
        let mut rng = StdRng::seed_from_u64(7);
        for kind in [MaskKind::External, MaskKind::ExternalIndexed] {
            let result = dispatch(kind, &[], (32, 32), 0, false, &mut rng);
            assert!(matches!(
                result,
                Err(DatasetError::ResourceUnavailable { list: "mask" })
            ));
        }
    }
}
