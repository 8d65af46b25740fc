pub mod file_format;
pub mod grid;
pub mod log_setup;
pub mod serde;

pub use grid::{Grid, GridShape, ShapeError};
