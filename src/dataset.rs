use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::Config;
use crate::errors::{DatasetError, Result};
use crate::flist::{self, ListSource};
use crate::imageops::{convert, geometry};
use crate::stream::Stream;
use crate::{edge, mask};

/// One aligned training sample. All planes share the same `(H, W)`; the
/// image tensor is channel-first and every value sits in [0, 1] (the mask
/// plane is 0/1 after normalization of the 0/255 raster).
#[derive(Debug, Clone)]
pub struct Sample {
    /// Shape of the source file as stored, before grayscale promotion and
    /// geometric normalization.
    pub original_shape: [usize; 3],
    pub image: Array3<f32>,
    pub grayscale: Array2<f32>,
    pub edge: Array2<f32>,
    pub mask: Array2<f32>,
}

/// The sample factory. File lists are resolved once at construction; after
/// that the dataset is immutable and safe to share across worker threads.
pub struct Dataset {
    config: Config,
    images: Vec<PathBuf>,
    edges: Vec<PathBuf>,
    masks: Vec<PathBuf>,
    fallbacks: AtomicUsize,
}

impl Dataset {
    pub fn new(config: &Config) -> Self {
        Self::with_sources(
            config,
            &ListSource::from(config.images.as_str()),
            &ListSource::from(config.edges.as_str()),
            &ListSource::from(config.masks.as_str()),
        )
    }

    pub fn with_sources(
        config: &Config,
        images: &ListSource,
        edges: &ListSource,
        masks: &ListSource,
    ) -> Self {
        let root = config.data_dir.as_path();
        Self {
            config: config.clone(),
            images: flist::resolve(root, images),
            edges: flist::resolve(root, edges),
            masks: flist::resolve(root, masks),
            fallbacks: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Basename of the source image behind `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.images
            .get(index)?
            .file_name()
            .and_then(|name| name.to_str())
    }

    /// How many samples were substituted by index 0 so far.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn stream(&self, batch_size: usize) -> Stream<'_> {
        Stream::new(self, batch_size)
    }

    /// Per-index failure boundary: a failing sample is logged, counted and
    /// replaced by index 0 so a long training run survives isolated corrupt
    /// files. A failing index 0 propagates; there is nothing left to
    /// substitute. No retry is attempted against the failing index.
    pub fn sample(&self, index: usize) -> Result<Sample> {
        match self.build(index) {
            Ok(sample) => Ok(sample),
            Err(err) if index != 0 => {
                warn!(
                    index,
                    path = self.name(index).unwrap_or("<unknown>"),
                    %err,
                    "sample construction failed, substituting index 0"
                );
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.build(0)
            }
            Err(err) => Err(err),
        }
    }

    fn build(&self, index: usize) -> Result<Sample> {
        let path = self
            .images
            .get(index)
            .ok_or(DatasetError::ResourceUnavailable { list: "image" })?;
        // every stochastic decision draws from this per-index rng, so a
        // sample is a pure function of (config, seed, index)
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(index as u64));

        let decoded = image::open(path).map_err(|source| DatasetError::Decode {
            path: path.clone(),
            source,
        })?;
        let (mut rgb, original_shape) = convert::promote_to_rgb(decoded);

        let size = self.config.input_size;
        let center_crop = self.config.mode.center_crop();
        if size != 0 {
            rgb = geometry::normalize(&rgb, size, size, center_crop);
        }
        let (width, height) = rgb.dimensions();

        let grayscale = convert::rgb_to_gray(&rgb);
        let mask_raster = mask::generate(
            &self.config,
            &self.masks,
            (height, width),
            index,
            &mut rng,
        )?;
        let edge = edge::generate(
            &self.config,
            &self.edges,
            &grayscale,
            &mask_raster,
            index,
            &mut rng,
        )?;

        let mut image = convert::to_tensor(&rgb);
        let mut grayscale = grayscale;
        let mut edge = edge;
        let mut mask = convert::to_plane(&mask_raster);

        let spatial = (height as usize, width as usize);
        ensure_aligned("grayscale", spatial, grayscale.dim())?;
        ensure_aligned("edge", spatial, edge.dim())?;
        ensure_aligned("mask", spatial, mask.dim())?;

        // one coin flip mirrors all four planes, or none of them
        if self.config.augment && rng.gen_bool(0.5) {
            image = convert::hflip3(&image);
            grayscale = convert::hflip2(&grayscale);
            edge = convert::hflip2(&edge);
            mask = convert::hflip2(&mask);
        }

        Ok(Sample {
            original_shape,
            image,
            grayscale,
            edge,
            mask,
        })
    }
}

fn ensure_aligned(
    plane: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(DatasetError::ShapeMismatch {
            plane,
            expected,
            actual,
        })
    }
}
