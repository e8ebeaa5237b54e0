//! Hydrologically connected coastal flooding
//!
//! - **scenario**: tide + surge + sea-level rise, shifted by the datum offset
//! - **sanitize**: masks no-data and sub-floor cells as always dry
//! - **delineation**: sea-connected flood mask via reconstruction by erosion
//! - **area**: flooded area with latitude-corrected degree conversion
//! - **output**: 1/0/255 encoding of the mask for persistence
//! - **simulation**: the full single-region pipeline

mod area;
mod delineation;
mod output;
mod sanitize;
mod scenario;
mod simulation;

pub use area::{
    area_statistics, area_statistics_projected, count_flooded, degrees_to_meters,
    meters_per_degree_lon, AreaStatistics, METERS_PER_DEGREE,
};
pub use delineation::{connected_flood, flood_seed, ConnectedFlood, DelineationParams, FloodDelineation};
pub use output::{flood_mask_to_raster, DRY, FLOODED, MASK_NODATA};
pub use sanitize::{
    is_below_floor, is_sentinel, sanitize, Sanitize, SanitizeParams, SanitizedGrid,
    DEFAULT_NODATA, DRY_ELEVATION, SAFETY_FLOOR,
};
pub use scenario::{Scenario, DEFAULT_DATUM_OFFSET};
pub use simulation::{simulate, FloodSimulation, Simulate, SimulationParams, SimulationReport};
