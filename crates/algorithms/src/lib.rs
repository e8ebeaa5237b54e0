//! # coastflood algorithms
//!
//! Hydrologically connected flood delineation for coastal elevation grids.
//!
//! ## Modules
//!
//! - **flood**: scenario arithmetic, sanitization, connected delineation,
//!   area statistics and the single-region simulation pipeline
//! - **morphology**: grayscale reconstruction by erosion (hybrid and
//!   full-scan)

pub mod flood;
pub mod morphology;
pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::flood::{
        connected_flood, flood_mask_to_raster, sanitize, simulate, AreaStatistics,
        DelineationParams, FloodDelineation, FloodSimulation, SanitizeParams, Scenario,
        SimulationParams, SimulationReport,
    };
    pub use crate::morphology::{
        reconstruct_by_erosion, ReconstructionMethod, ReconstructionParams,
    };
    pub use coastflood_core::prelude::*;
}
