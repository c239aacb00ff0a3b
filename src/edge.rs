use std::path::PathBuf;

use image::GrayImage;
use ndarray::Array2;
use rand::Rng;

use crate::config::{Config, EdgeSource, RunMode, Sigma};
use crate::errors::{DatasetError, Result};
use crate::imageops::canny::canny;
use crate::imageops::{convert, geometry};

/// Produce the edge plane for one sample, either by running the Canny
/// detector over the grayscale plane or by loading a pre-computed map.
///
/// Training never tells the detector about the occlusion mask, so the model
/// cannot learn "no edges under the occluder". Outside training the inverse
/// mask is passed as a visibility field and occluded pixels are excluded.
pub fn generate<R: Rng>(
    config: &Config,
    edge_paths: &[PathBuf],
    gray: &Array2<f32>,
    mask: &GrayImage,
    index: usize,
    rng: &mut R,
) -> Result<Array2<f32>> {
    let visibility = match config.mode {
        RunMode::Train => None,
        _ => Some(visibility_field(mask)),
    };
    let sigma = match config.sigma {
        Sigma::Disabled => None,
        Sigma::Random => Some(rng.gen_range(1..=4) as f32),
        Sigma::Fixed(value) => Some(value),
    };

    match config.edge_source {
        EdgeSource::Canny => {
            let Some(sigma) = sigma else {
                return Ok(Array2::zeros(gray.dim()));
            };
            let detected = canny(gray, sigma, visibility.as_ref());
            Ok(detected.mapv(|edge| if edge { 1.0 } else { 0.0 }))
        }
        EdgeSource::External => {
            let path = edge_paths
                .get(index)
                .ok_or(DatasetError::ResourceUnavailable { list: "edge" })?;
            let loaded = image::open(path).map_err(|source| DatasetError::Decode {
                path: path.clone(),
                source,
            })?;
            let (height, width) = gray.dim();
            let normalized = geometry::normalize(
                &loaded.into_luma8(),
                height as u32,
                width as u32,
                config.mode.center_crop(),
            );
            let mut edge = convert::to_plane(&normalized);

            // keep only loaded edges corroborated by a fresh detection;
            // with sigma disabled there is no detection to corroborate with
            if config.nms {
                if let Some(sigma) = sigma {
                    let detected = canny(gray, sigma, visibility.as_ref());
                    edge.zip_mut_with(&detected.mapv(|e| if e { 1.0 } else { 0.0 }), |a, b| {
                        *a *= b;
                    });
                }
            }
            Ok(edge)
        }
    }
}

/// Boolean visibility field: true where the occlusion mask is clear.
fn visibility_field(mask: &GrayImage) -> Array2<bool> {
    let (width, height) = mask.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        mask.get_pixel(x as u32, y as u32)[0] == 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use image::Luma;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn config(args: &[&str]) -> Config {
        let mut full = vec!["inpaint-data", "/data"];
        full.extend_from_slice(args);
        Config::try_parse_from(full).unwrap()
    }

    fn step_gray() -> Array2<f32> {
        Array2::from_shape_fn((16, 16), |(_, x)| if x < 8 { 0.0 } else { 1.0 })
    }

    #[test]
    fn disabled_sigma_yields_a_zero_plane() {
        let config = config(&["--sigma", "disabled"]);
        let mask = GrayImage::new(16, 16);
        let mut rng = StdRng::seed_from_u64(1);
        let edge = generate(&config, &[], &step_gray(), &mask, 0, &mut rng).unwrap();
        assert_eq!(edge.dim(), (16, 16));
        assert!(edge.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn train_mode_detects_edges_under_the_mask() {
        let config = config(&["--sigma", "1"]);
        // occlude everything; training ignores it
        let mask = GrayImage::from_pixel(16, 16, Luma([255]));
        let mut rng = StdRng::seed_from_u64(1);
        let edge = generate(&config, &[], &step_gray(), &mask, 0, &mut rng).unwrap();
        assert!(edge.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn val_mode_respects_the_mask() {
        let config = config(&["--sigma", "1", "--mode", "val"]);
        let mask = GrayImage::from_pixel(16, 16, Luma([255]));
        let mut rng = StdRng::seed_from_u64(1);
        let edge = generate(&config, &[], &step_gray(), &mask, 0, &mut rng).unwrap();
        assert!(edge.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn random_sigma_is_deterministic_per_rng_seed() {
        let config = config(&["--sigma", "random"]);
        let mask = GrayImage::new(16, 16);
        let gray = step_gray();

        let mut first_rng = StdRng::seed_from_u64(7);
        let first = generate(&config, &[], &gray, &mask, 0, &mut first_rng).unwrap();
        let mut second_rng = StdRng::seed_from_u64(7);
        let second = generate(&config, &[], &gray, &mask, 0, &mut second_rng).unwrap();

        assert_eq!(first, second);
        // whatever sigma was drawn, the step must fire the detector
        assert!(first.iter().any(|&v| v == 1.0));
    }

    #[test]
    fn external_edges_are_scaled_and_resized_to_the_gray_plane() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge.png");
        // twice the gray plane's size: left half on, right half off
        GrayImage::from_fn(32, 32, |x, _| Luma([if x < 16 { 255 } else { 0 }]))
            .save(&path)
            .unwrap();

        let config = config(&["--edge-source", "external", "--sigma", "disabled"]);
        let mask = GrayImage::new(16, 16);
        let mut rng = StdRng::seed_from_u64(1);
        let edge = generate(&config, &[path], &step_gray(), &mask, 0, &mut rng).unwrap();

        assert_eq!(edge.dim(), (16, 16));
        assert!(edge.iter().all(|&v| (0.0..=1.0).contains(&v)));
        for y in 0..16 {
            assert_eq!(edge[[y, 0]], 1.0);
            assert_eq!(edge[[y, 15]], 0.0);
        }
    }

    #[test]
    fn nms_drops_uncorroborated_external_edges() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edge.png");
        // the loaded map claims edges everywhere
        GrayImage::from_pixel(16, 16, Luma([255]))
            .save(&path)
            .unwrap();

        let mask = GrayImage::new(16, 16);
        let gray = step_gray();

        let plain_config = config(&["--edge-source", "external", "--sigma", "1"]);
        let mut rng = StdRng::seed_from_u64(1);
        let plain = generate(&plain_config, &[path.clone()], &gray, &mask, 0, &mut rng).unwrap();
        assert!(plain.iter().all(|&v| v == 1.0));

        let nms_config = config(&["--edge-source", "external", "--sigma", "1", "--nms"]);
        let mut rng = StdRng::seed_from_u64(1);
        let nms = generate(&nms_config, &[path], &gray, &mask, 0, &mut rng).unwrap();

        // only pixels the detector confirms near the step survive
        assert!(nms.iter().any(|&v| v == 1.0));
        for ((_, x), &v) in nms.indexed_iter() {
            if v != 0.0 {
                assert!((6..=9).contains(&x));
            }
        }
    }

    #[test]
    fn external_without_files_is_resource_unavailable() {
        let config = config(&["--edge-source", "external"]);
        let mask = GrayImage::new(16, 16);
        let mut rng = StdRng::seed_from_u64(1);
        let result = generate(&config, &[], &step_gray(), &mask, 0, &mut rng);
        assert!(matches!(
            result,
            Err(DatasetError::ResourceUnavailable { list: "edge" })
        ));
    }
}
