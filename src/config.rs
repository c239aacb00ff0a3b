use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Run mode of the dataset. Test mode forces index-aligned external masks
/// and, like Val, tells the edge detector which pixels are occluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Train,
    Val,
    Test,
}

impl RunMode {
    /// Center-crop keeps a stable evaluation ratio in Val; Train/Test use a
    /// plain stretch resize.
    pub const fn center_crop(self) -> bool {
        matches!(self, Self::Val)
    }
}

/// Mask synthesis policy. The composite variants re-roll a base policy per
/// sample with fixed probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaskKind {
    /// Union of 2-4 randomly parameterized blocks.
    RandomBlock,
    /// Left or right half of the image, fair coin flip.
    Half,
    /// A mask drawn uniformly from the mask file list.
    External,
    /// 50/50 between `RandomBlock` and `External`.
    RandomBlockOrExternal,
    /// Uniform over `RandomBlock`, `Half` and `External`.
    Any,
    /// Mask `index % len(mask_list)`, deterministic. Forced in Test mode.
    ExternalIndexed,
}

/// Where the edge plane comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EdgeSource {
    /// Computed from the grayscale plane by the Canny detector.
    Canny,
    /// Loaded from the edge file list, entry matching the sample index.
    External,
}

/// Gaussian sigma selection for the Canny detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sigma {
    Fixed(f32),
    /// Uniform integer in 1..=4, drawn per sample.
    Random,
    /// No detector invocation; the edge plane is all zeros.
    Disabled,
}

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Dataset root; file-list references are resolved relative to it.
    pub data_dir: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    /// Image list: a directory, a text file with one path per line, or a
    /// single image file.
    #[arg(short, long, default_value = "images")]
    pub images: String,

    /// Edge list, same reference forms as --images.
    #[arg(long, default_value = "edges")]
    pub edges: String,

    /// Mask list, same reference forms as --images.
    #[arg(long, default_value = "masks")]
    pub masks: String,

    /// Target side length; 0 disables resizing.
    #[arg(short = 's', long, default_value_t = 256)]
    pub input_size: u32,

    /// Canny sigma: a number, `random`, or `disabled`.
    #[arg(long, default_value = "2", value_parser = parse_sigma)]
    pub sigma: Sigma,

    #[arg(long, value_enum, default_value_t = EdgeSource::Canny)]
    pub edge_source: EdgeSource,

    /// Suppress loaded edge pixels not corroborated by a fresh Canny pass.
    #[arg(long)]
    pub nms: bool,

    #[arg(long, value_enum, default_value_t = MaskKind::RandomBlock)]
    pub mask: MaskKind,

    #[arg(long, value_enum, default_value_t = RunMode::Train)]
    pub mode: RunMode,

    /// Horizontal mirror with probability 0.5, applied to all four planes.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub augment: bool,

    /// Base seed; sample `i` derives its own rng from `seed + i`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(short, long, default_value_t = 8)]
    pub batch_size: usize,

    /// Pull this many batches through the stream iterator instead of
    /// dumping samples to the output directory.
    #[arg(long)]
    pub stream_batches: Option<usize>,

    /// Dump at most this many samples.
    #[arg(long)]
    pub limit: Option<usize>,
}

impl Config {
    /// Effective mask policy: Test mode pins masks one-to-one to images so
    /// evaluation is reproducible.
    pub const fn mask_kind(&self) -> MaskKind {
        match self.mode {
            RunMode::Test => MaskKind::ExternalIndexed,
            _ => self.mask,
        }
    }
}

fn parse_sigma(s: &str) -> Result<Sigma, String> {
    match s {
        "disabled" => Ok(Sigma::Disabled),
        "random" => Ok(Sigma::Random),
        _ => {
            let value: f32 = s
                .parse()
                .map_err(|_| format!("`{s}` is not a number, `random` or `disabled`"))?;
            if value.is_finite() && value > 0.0 {
                Ok(Sigma::Fixed(value))
            } else {
                Err(format!("sigma must be positive and finite, got `{s}`"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_parsing() {
        assert_eq!(parse_sigma("disabled").unwrap(), Sigma::Disabled);
        assert_eq!(parse_sigma("random").unwrap(), Sigma::Random);
        assert_eq!(parse_sigma("1.5").unwrap(), Sigma::Fixed(1.5));
        assert!(parse_sigma("-1").is_err());
        assert!(parse_sigma("nan").is_err());
        assert!(parse_sigma("canny").is_err());
    }

    #[test]
    fn test_mode_forces_indexed_masks() {
        let mut config = Config::try_parse_from(["inpaint-data", "/data"]).unwrap();
        config.mask = MaskKind::RandomBlock;
        config.mode = RunMode::Test;
        assert_eq!(config.mask_kind(), MaskKind::ExternalIndexed);

        config.mode = RunMode::Train;
        assert_eq!(config.mask_kind(), MaskKind::RandomBlock);
    }

    #[test]
    fn center_crop_only_in_val() {
        assert!(!RunMode::Train.center_crop());
        assert!(RunMode::Val.center_crop());
        assert!(!RunMode::Test.center_crop());
    }
}
