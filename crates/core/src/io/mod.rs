//! I/O operations for reading and writing geospatial data

mod native;
mod vrt;

pub use native::{
    read_geotiff, read_geotiff_header, read_geotiff_window, write_geotiff, write_mask_geotiff,
    Compression, GeoTiffHeader, GeoTiffOptions,
};
pub use vrt::{write_vrt_mosaic, VrtSource};
