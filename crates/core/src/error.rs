//! Error types for coastflood

use thiserror::Error;

/// Main error type for coastflood operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid bounding box ({min_x}, {min_y}, {max_x}, {max_y}): {reason}")]
    InvalidBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        reason: String,
    },

    #[error("Non-finite elevation {value} at ({row}, {col})")]
    NonFiniteElevation { row: usize, col: usize, value: f64 },

    #[error("No coverage: requested bounds {0} do not intersect the grid")]
    NoCoverage(String),

    #[error("No valid data: all {cells} cells in the window are no-data")]
    NoValidData { cells: usize },

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(io) => Error::Io(io),
            other => Error::Tiff(other.to_string()),
        }
    }
}

/// Result type alias for coastflood operations
pub type Result<T> = std::result::Result<T, Error>;
