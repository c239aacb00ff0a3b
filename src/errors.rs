use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for sample construction.
///
/// Each variant captures the context of its failure domain so callers can
/// react per kind: `ResourceUnavailable` aborts the sample, `Decode` triggers
/// the index-0 fallback, `ShapeMismatch` signals a broken internal invariant
/// (normalization must keep all planes aligned).
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("no files resolved for the {list} list")]
    ResourceUnavailable { list: &'static str },

    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{plane} plane is {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        plane: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

pub type Result<T> = std::result::Result<T, DatasetError>;
