//! Elevation grid sanitization
//!
//! Two independent rules replace unusable cells with a value high enough
//! that they can never flood nor carry water to their neighbors:
//!
//! 1. cells equal to the no-data sentinel (declared by the source, or
//!    −9999 when the source declares none);
//! 2. cells below a safety floor (−100 m), which catches sentinels the
//!    source forgot to declare.

use ndarray::Array2;
use crate::maybe_rayon::*;
use coastflood_core::raster::Raster;
use coastflood_core::{Algorithm, Error, Result};

/// Sentinel assumed when neither the caller nor the source declares one
pub const DEFAULT_NODATA: f64 = -9999.0;

/// Anything below this is treated as no-data, whatever the sentinel
pub const SAFETY_FLOOR: f64 = -100.0;

/// Replacement for masked cells; above any realistic flood threshold
pub const DRY_ELEVATION: f64 = 9999.0;

/// Parameters for grid sanitization
#[derive(Debug, Clone)]
pub struct SanitizeParams {
    /// Explicit sentinel. `None` uses the raster's declared no-data, then −9999.
    pub nodata: Option<f64>,
    /// Safety floor in meters
    pub floor: f64,
    /// Value written into masked cells
    pub dry_value: f64,
}

impl Default for SanitizeParams {
    fn default() -> Self {
        Self {
            nodata: None,
            floor: SAFETY_FLOOR,
            dry_value: DRY_ELEVATION,
        }
    }
}

/// A sanitized elevation grid and a record of what was masked
#[derive(Debug, Clone)]
pub struct SanitizedGrid {
    /// Elevations with masked cells set to the dry value; no no-data remains
    pub elevation: Raster<f64>,
    /// `true` where the source cell was masked by either rule
    pub masked: Array2<bool>,
    /// The sentinel that was applied
    pub sentinel: f64,
    /// Cells masked because they equal the sentinel
    pub sentinel_cells: usize,
    /// Cells masked only because they fall below the safety floor
    pub floor_cells: usize,
}

impl SanitizedGrid {
    /// Cells that carry real elevation data
    pub fn valid_cells(&self) -> usize {
        self.masked.len() - self.sentinel_cells - self.floor_cells
    }
}

/// Rule 1: the cell holds the sentinel. A NaN sentinel matches NaN cells.
pub fn is_sentinel(value: f64, sentinel: f64) -> bool {
    if sentinel.is_nan() {
        value.is_nan()
    } else {
        value == sentinel
    }
}

/// Rule 2: the cell lies below the safety floor
pub fn is_below_floor(value: f64, floor: f64) -> bool {
    value < floor
}

/// Grid sanitizer
#[derive(Debug, Clone, Default)]
pub struct Sanitize;

impl Algorithm for Sanitize {
    type Input = Raster<f64>;
    type Output = SanitizedGrid;
    type Params = SanitizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Sanitize"
    }

    fn description(&self) -> &'static str {
        "Mask no-data and sub-floor elevations with an always-dry value"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        sanitize(&input, &params)
    }
}

/// Sanitize a raw elevation grid.
///
/// Returns a new grid; the source is left untouched. The result carries the
/// source's transform and CRS and no no-data value.
pub fn sanitize(dem: &Raster<f64>, params: &SanitizeParams) -> Result<SanitizedGrid> {
    if params.floor.is_nan() || !params.dry_value.is_finite() {
        return Err(Error::InvalidParameter {
            name: "sanitize",
            value: format!("floor={}, dry_value={}", params.floor, params.dry_value),
            reason: "floor must be a number and dry_value finite".to_string(),
        });
    }

    let (rows, cols) = dem.shape();
    let sentinel = params.nodata.or(dem.nodata()).unwrap_or(DEFAULT_NODATA);
    let floor = params.floor;
    let dry = params.dry_value;

    // (value, 0 = kept, 1 = sentinel, 2 = floor)
    let cells: Vec<(f64, u8)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = Vec::with_capacity(cols);
            for col in 0..cols {
                let v = unsafe { dem.get_unchecked(row, col) };
                let cell = if is_sentinel(v, sentinel) {
                    (dry, 1)
                } else if is_below_floor(v, floor) {
                    (dry, 2)
                } else {
                    (v, 0)
                };
                row_data.push(cell);
            }
            row_data
        })
        .collect();

    let sentinel_cells = cells.iter().filter(|c| c.1 == 1).count();
    let floor_cells = cells.iter().filter(|c| c.1 == 2).count();

    let masked = Array2::from_shape_vec((rows, cols), cells.iter().map(|c| c.1 != 0).collect())
        .map_err(|e| Error::Other(e.to_string()))?;
    let values: Vec<f64> = cells.into_iter().map(|c| c.0).collect();

    let mut elevation = dem.with_same_meta::<f64>(rows, cols);
    *elevation.data_mut() =
        Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::Other(e.to_string()))?;

    Ok(SanitizedGrid {
        elevation,
        masked,
        sentinel,
        sentinel_cells,
        floor_cells,
    })
}
