pub mod canny;
pub mod convert;
pub mod geometry;

pub use canny::canny;
