//! # coastflood core
//!
//! Core types and I/O for hydrologically connected coastal flood delineation.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `BoundingBox` and `PixelWindow`: geographic regions and their pixel footprint
//! - `Connectivity`: neighbor sets used by grid propagation
//! - `CRS`: Coordinate Reference System handling
//! - Algorithm trait for consistent API
//! - Native GeoTIFF I/O and VRT mosaic output

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{BoundingBox, Connectivity, GeoTransform, PixelWindow, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BoundingBox, Connectivity, GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in coastflood.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
