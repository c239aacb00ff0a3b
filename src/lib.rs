pub mod config;
pub mod dataset;
pub mod edge;
pub mod errors;
pub mod flist;
pub mod imageops;
pub mod mask;
pub mod stream;

pub use config::{Config, EdgeSource, MaskKind, RunMode, Sigma};
pub use dataset::{Dataset, Sample};
pub use errors::{DatasetError, Result};
pub use flist::ListSource;
pub use stream::Stream;
