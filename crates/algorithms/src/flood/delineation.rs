//! Connected flood delineation
//!
//! A cell floods only when water can reach it from the grid's outer ring
//! without rising above the flood threshold on the way. Isolated
//! depressions below the threshold stay dry.
//!
//! The connectivity is computed as a morphological reconstruction by
//! erosion of a seed surface above the elevation grid:
//!
//! - cells at or above the threshold keep their own elevation;
//! - sub-threshold border cells keep their own elevation (open sea);
//! - sub-threshold interior cells start at the grid maximum.
//!
//! Reconstruction lowers the interior seeds only where a sub-threshold
//! path leads to a border cell, so `flooded = reconstructed < threshold`.

use ndarray::Array2;
use coastflood_core::raster::{Connectivity, Raster};
use coastflood_core::{Algorithm, Error, Result};
use tracing::debug;

use crate::morphology::{check_finite, reconstruct_by_erosion, ReconstructionMethod, ReconstructionParams};

/// Parameters for connected flood delineation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelineationParams {
    /// Neighbor set water may travel through
    pub connectivity: Connectivity,
    /// Reconstruction algorithm
    pub method: ReconstructionMethod,
}

/// Result of a delineation run
#[derive(Debug, Clone)]
pub struct FloodDelineation {
    /// Reconstructed surface at the fixed point
    pub surface: Raster<f64>,
    /// 1 where flooded, 0 where dry
    pub mask: Raster<u8>,
    /// Number of flooded cells
    pub flooded_cells: usize,
    /// Sub-threshold cells with no connected path to the border
    pub isolated_cells: usize,
}

impl FloodDelineation {
    pub fn is_flooded(&self, row: usize, col: usize) -> bool {
        self.mask.get(row, col).map_or(false, |v| v == 1)
    }
}

/// Connected flood delineation algorithm
#[derive(Debug, Clone, Default)]
pub struct ConnectedFlood {
    pub threshold: f64,
}

impl Algorithm for ConnectedFlood {
    type Input = Raster<f64>;
    type Output = FloodDelineation;
    type Params = DelineationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Connected Flood"
    }

    fn description(&self) -> &'static str {
        "Flood cells below a threshold that are connected to the grid border"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        connected_flood(&input, self.threshold, &params)
    }
}

/// Build the reconstruction marker for `dem` at `threshold`.
///
/// Grids without an interior (fewer than 3 rows or columns) get a seed
/// equal to the elevations, so the flood reduces to `dem < threshold`.
pub fn flood_seed(dem: &Array2<f64>, threshold: f64) -> Array2<f64> {
    let (rows, cols) = dem.dim();
    let peak = dem.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Array2::from_shape_fn((rows, cols), |(row, col)| {
        let e = dem[(row, col)];
        let border = row == 0 || col == 0 || row + 1 == rows || col + 1 == cols;
        if e < threshold && !border {
            peak
        } else {
            e
        }
    })
}

/// Delineate the sea-connected flood on a sanitized elevation grid.
///
/// The grid must be fully finite; run it through
/// [`sanitize`](crate::flood::sanitize) first.
pub fn connected_flood(
    dem: &Raster<f64>,
    threshold: f64,
    params: &DelineationParams,
) -> Result<FloodDelineation> {
    if !threshold.is_finite() {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: threshold.to_string(),
            reason: "flood threshold must be finite".to_string(),
        });
    }
    check_finite(dem.data())?;

    let (rows, cols) = dem.shape();
    let mut marker = dem.with_same_meta::<f64>(rows, cols);
    *marker.data_mut() = flood_seed(dem.data(), threshold);

    let (surface, stats) = reconstruct_by_erosion(
        &marker,
        dem,
        &ReconstructionParams {
            connectivity: params.connectivity,
            method: params.method,
        },
    )?;
    debug!(
        rows,
        cols,
        passes = stats.passes,
        queued = stats.queued,
        "reconstruction converged"
    );

    let mut mask = dem.with_same_meta::<u8>(rows, cols);
    let mut flooded_cells = 0;
    let mut eligible_cells = 0;
    for ((row, col), &r) in surface.data().indexed_iter() {
        if dem.data()[(row, col)] < threshold {
            eligible_cells += 1;
        }
        if r < threshold {
            mask.data_mut()[(row, col)] = 1;
            flooded_cells += 1;
        }
    }

    Ok(FloodDelineation {
        surface,
        mask,
        flooded_cells,
        isolated_cells: eligible_cells - flooded_cells,
    })
}
