//! Single-region flood simulation
//!
//! Chains sanitization, threshold arithmetic, connected delineation and area
//! statistics for one elevation grid.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use coastflood_core::raster::{BoundingBox, Raster};
use coastflood_core::{Algorithm, Error, Result};
use tracing::{debug, info};

use super::area::{area_statistics, area_statistics_projected, AreaStatistics};
use super::delineation::{connected_flood, DelineationParams};
use super::output::flood_mask_to_raster;
use super::sanitize::{sanitize, SanitizeParams};
use super::scenario::Scenario;

/// Parameters for a single-region simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationParams {
    pub sanitize: SanitizeParams,
    pub delineation: DelineationParams,
    /// Latitude for the degree-to-meter conversion. `None` uses the grid's
    /// vertical midpoint.
    pub reference_latitude: Option<f64>,
}

/// Outcome of one simulation
#[derive(Debug, Clone)]
pub struct FloodSimulation {
    pub scenario: Scenario,
    pub total_water_level: f64,
    pub flood_threshold: f64,
    /// 1 where flooded, 0 elsewhere
    pub mask: Raster<u8>,
    /// Cells removed by sanitization
    pub masked: Array2<bool>,
    pub statistics: AreaStatistics,
    pub bounds: Option<BoundingBox>,
    pub sentinel_cells: usize,
    pub floor_cells: usize,
    pub isolated_cells: usize,
}

impl FloodSimulation {
    /// The mask encoded for output: 1 flooded, 0 dry, 255 no-data
    pub fn output_raster(&self) -> Result<Raster<u8>> {
        flood_mask_to_raster(&self.mask, &self.masked)
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            scenario: self.scenario,
            total_water_level: self.total_water_level,
            flood_threshold: self.flood_threshold,
            bounds: self.bounds,
            rows: self.mask.rows(),
            cols: self.mask.cols(),
            sentinel_cells: self.sentinel_cells,
            floor_cells: self.floor_cells,
            isolated_cells: self.isolated_cells,
            statistics: self.statistics,
        }
    }
}

/// Serializable summary of a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: Scenario,
    pub total_water_level: f64,
    pub flood_threshold: f64,
    pub bounds: Option<BoundingBox>,
    pub rows: usize,
    pub cols: usize,
    pub sentinel_cells: usize,
    pub floor_cells: usize,
    pub isolated_cells: usize,
    pub statistics: AreaStatistics,
}

/// Flood simulation algorithm
#[derive(Debug, Clone)]
pub struct Simulate {
    pub scenario: Scenario,
}

impl Algorithm for Simulate {
    type Input = Raster<f64>;
    type Output = FloodSimulation;
    type Params = SimulationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Simulate"
    }

    fn description(&self) -> &'static str {
        "Connected coastal flood simulation for one elevation grid"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        simulate(&input, &self.scenario, &params)
    }
}

/// Run a simulation on a raw (unsanitized) elevation grid.
///
/// Fails with [`Error::NoValidData`] when every cell is masked.
pub fn simulate(
    dem: &Raster<f64>,
    scenario: &Scenario,
    params: &SimulationParams,
) -> Result<FloodSimulation> {
    scenario.validate()?;
    let total_water_level = scenario.total_water_level();
    let flood_threshold = scenario.flood_threshold();
    info!(
        "Total water level {:.2} m (ZH), flood threshold {:.2} m",
        total_water_level, flood_threshold
    );

    let grid = sanitize(dem, &params.sanitize)?;
    debug!(
        sentinel = grid.sentinel,
        sentinel_cells = grid.sentinel_cells,
        floor_cells = grid.floor_cells,
        "sanitized"
    );
    if grid.valid_cells() == 0 {
        return Err(Error::NoValidData { cells: grid.masked.len() });
    }

    let flood = connected_flood(&grid.elevation, flood_threshold, &params.delineation)?;

    let bounds = dem.extent().ok();
    let projected = dem.crs().map_or(false, |crs| !crs.is_geographic());
    let statistics = if projected {
        area_statistics_projected(&flood.mask)
    } else {
        let latitude = params
            .reference_latitude
            .or(bounds.map(|b| b.center_y()))
            .unwrap_or(0.0);
        area_statistics(&flood.mask, latitude)
    };

    info!(
        "Flooded {} pixels of {:.2} m x {:.2} m: {:.3} km2",
        statistics.flooded_pixel_count,
        statistics.pixel_width_m,
        statistics.pixel_height_m,
        statistics.flooded_area_km2
    );

    Ok(FloodSimulation {
        scenario: *scenario,
        total_water_level,
        flood_threshold,
        mask: flood.mask,
        masked: grid.masked,
        statistics,
        bounds,
        sentinel_cells: grid.sentinel_cells,
        floor_cells: grid.floor_cells,
        isolated_cells: flood.isolated_cells,
    })
}
