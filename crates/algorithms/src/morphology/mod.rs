//! Mathematical morphology on elevation grids
//!
//! - **Reconstruction by erosion**: lowers a marker surface towards a mask
//!   surface through neighbor propagation

mod reconstruction;

pub use reconstruction::{
    check_finite, erosion_step, reconstruct_by_erosion, ReconstructByErosion,
    ReconstructionMethod, ReconstructionParams, ReconstructionStats,
};
