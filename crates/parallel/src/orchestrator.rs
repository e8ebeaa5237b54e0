//! Tile orchestration
//!
//! Runs the single-region simulation once per planned tile, in parallel
//! when configured, and folds the ordered results into batch totals. A tile
//! that fails (no coverage, no valid data, bad values) is recorded and the
//! batch carries on.

use std::path::{Path, PathBuf};

use coastflood_algorithms::flood::{
    simulate, AreaStatistics, FloodSimulation, Scenario, SimulationParams,
};
use coastflood_core::io::read_geotiff_window;
use coastflood_core::raster::{BoundingBox, Raster};
use coastflood_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::planner::Tile;
use crate::strategy::{ParallelStrategy, ProcessingMode};

/// Supplies the elevation grid for a tile's bounds
pub trait TileSource: Sync {
    fn load(&self, bounds: &BoundingBox) -> Result<Raster<f64>>;
}

/// Tiles cut from a raster already in memory
#[derive(Debug, Clone, Copy)]
pub struct RasterSource<'a> {
    raster: &'a Raster<f64>,
}

impl<'a> RasterSource<'a> {
    pub fn new(raster: &'a Raster<f64>) -> Self {
        Self { raster }
    }
}

impl TileSource for RasterSource<'_> {
    fn load(&self, bounds: &BoundingBox) -> Result<Raster<f64>> {
        self.raster.window(bounds)
    }
}

/// Tiles read on demand from a GeoTIFF; only the covered blocks are decoded
#[derive(Debug, Clone)]
pub struct GeoTiffSource {
    path: PathBuf,
}

impl GeoTiffSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TileSource for GeoTiffSource {
    fn load(&self, bounds: &BoundingBox) -> Result<Raster<f64>> {
        read_geotiff_window::<f64, _>(&self.path, bounds)
    }
}

/// Parameters for a tiled batch
#[derive(Debug, Clone, Default)]
pub struct OrchestratorParams {
    pub mode: ProcessingMode,
    /// Applied to every tile. The reference latitude is replaced by each
    /// tile's own midpoint.
    pub simulation: SimulationParams,
}

/// Result of one tile, successful or not
#[derive(Debug)]
pub struct TileResult {
    pub tile: Tile,
    pub outcome: Result<FloodSimulation>,
}

impl TileResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn simulation(&self) -> Option<&FloodSimulation> {
        self.outcome.as_ref().ok()
    }

    pub fn statistics(&self) -> Option<&AreaStatistics> {
        self.simulation().map(|s| &s.statistics)
    }

    pub fn error(&self) -> Option<&Error> {
        self.outcome.as_ref().err()
    }

    pub fn report(&self) -> TileReport {
        TileReport {
            index: self.tile.index,
            row: self.tile.row,
            col: self.tile.col,
            bounds: self.tile.bounds,
            success: self.is_success(),
            statistics: self.statistics().copied(),
            isolated_cells: self.simulation().map(|s| s.isolated_cells),
            error: self.error().map(|e| e.to_string()),
        }
    }
}

/// Running totals over a batch; only successful tiles add area
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub succeeded: usize,
    pub failed: usize,
    pub flooded_pixels: usize,
    pub flooded_area_m2: f64,
    pub flooded_area_km2: f64,
}

impl BatchTotals {
    /// Fold one tile result into the totals
    pub fn record(mut self, result: &TileResult) -> Self {
        match result.statistics() {
            Some(stats) => {
                self.succeeded += 1;
                self.flooded_pixels += stats.flooded_pixel_count;
                self.flooded_area_m2 += stats.flooded_area_m2;
                self.flooded_area_km2 += stats.flooded_area_km2;
            }
            None => self.failed += 1,
        }
        self
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Everything a batch produced, in planning order
#[derive(Debug)]
pub struct BatchSummary {
    pub scenario: Scenario,
    pub results: Vec<TileResult>,
    pub totals: BatchTotals,
}

impl BatchSummary {
    /// True when there was work and none of it succeeded
    pub fn all_failed(&self) -> bool {
        self.totals.total() > 0 && self.totals.succeeded == 0
    }

    pub fn report(&self) -> BatchReport {
        BatchReport {
            scenario: self.scenario,
            total_water_level: self.scenario.total_water_level(),
            flood_threshold: self.scenario.flood_threshold(),
            totals: self.totals,
            tiles: self.results.iter().map(TileResult::report).collect(),
        }
    }
}

/// Serializable per-tile entry of a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReport {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
    pub success: bool,
    pub statistics: Option<AreaStatistics>,
    pub isolated_cells: Option<usize>,
    pub error: Option<String>,
}

/// Serializable batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub scenario: Scenario,
    pub total_water_level: f64,
    pub flood_threshold: f64,
    pub totals: BatchTotals,
    pub tiles: Vec<TileReport>,
}

/// Simulate one tile. Errors are returned, not raised.
pub fn process_tile<S: TileSource + ?Sized>(
    source: &S,
    tile: &Tile,
    scenario: &Scenario,
    params: &SimulationParams,
) -> TileResult {
    let params = SimulationParams {
        reference_latitude: Some(tile.bounds.center_y()),
        ..params.clone()
    };
    let outcome = source
        .load(&tile.bounds)
        .and_then(|dem| {
            debug!(tile = tile.index, rows = dem.rows(), cols = dem.cols(), "tile loaded");
            simulate(&dem, scenario, &params)
        });

    match &outcome {
        Ok(sim) => info!(
            "Tile {} ({}): {} flooded pixels, {:.3} km2",
            tile.index,
            tile.label(),
            sim.statistics.flooded_pixel_count,
            sim.statistics.flooded_area_km2
        ),
        Err(e) => warn!("Tile {} ({}) failed: {}", tile.index, tile.label(), e),
    }

    TileResult {
        tile: *tile,
        outcome,
    }
}

/// Run every tile and aggregate.
///
/// The scenario is checked before any tile runs. Results keep the order of
/// `tiles` regardless of completion order.
pub fn process_tiles<S: TileSource + ?Sized>(
    source: &S,
    tiles: &[Tile],
    scenario: &Scenario,
    params: &OrchestratorParams,
) -> Result<BatchSummary> {
    process_tiles_with_progress(source, tiles, scenario, params, |_| {})
}

/// [`process_tiles`] with a callback invoked as each tile finishes.
///
/// The callback may run on worker threads and in any order.
pub fn process_tiles_with_progress<S, F>(
    source: &S,
    tiles: &[Tile],
    scenario: &Scenario,
    params: &OrchestratorParams,
    on_tile: F,
) -> Result<BatchSummary>
where
    S: TileSource + ?Sized,
    F: Fn(&TileResult) + Sync + Send,
{
    scenario.validate()?;
    info!(
        "Processing {} tiles on {} thread(s)",
        tiles.len(),
        params.mode.threads()
    );

    let results = params.mode.par_map(0..tiles.len(), |i| {
        let result = process_tile(source, &tiles[i], scenario, &params.simulation);
        on_tile(&result);
        result
    })?;

    let totals = results.iter().fold(BatchTotals::default(), BatchTotals::record);
    info!(
        "Batch done: {} succeeded, {} failed, {:.3} km2 flooded",
        totals.succeeded, totals.failed, totals.flooded_area_km2
    );

    Ok(BatchSummary {
        scenario: *scenario,
        results,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{plan_tiles, TilingParams};
    use approx::assert_relative_eq;
    use coastflood_core::{GeoTransform, CRS};

    /// 0.2 deg x 0.1 deg of low terrain at 0.001 deg, west half of a
    /// 0.3 deg region
    fn coastal_strip() -> Raster<f64> {
        let mut r = Raster::filled(100, 200, 0.0);
        r.set_transform(GeoTransform::new(-8.9, 41.1, 0.001, -0.001));
        r.set_crs(Some(CRS::wgs84()));
        r
    }

    #[test]
    fn test_failed_tile_recorded_and_excluded() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let region = BoundingBox::new(-8.9, 41.0, -8.6, 41.1).unwrap();
        let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.1, overlap: 0.0 }).unwrap();
        assert_eq!(tiles.len(), 3);

        let summary =
            process_tiles(&source, &tiles, &Scenario::default(), &OrchestratorParams::default())
                .unwrap();

        assert_eq!(summary.totals.succeeded, 2);
        assert_eq!(summary.totals.failed, 1);
        assert!(!summary.all_failed());
        assert!(summary.results[0].is_success());
        assert!(summary.results[1].is_success());
        assert!(matches!(summary.results[2].error(), Some(Error::NoCoverage(_))));

        let expected: f64 = summary.results[..2]
            .iter()
            .map(|r| r.statistics().unwrap().flooded_area_m2)
            .sum();
        assert_relative_eq!(summary.totals.flooded_area_m2, expected);
        assert_eq!(summary.totals.flooded_pixels, 200 * 100);
    }

    #[test]
    fn test_order_preserved_in_parallel() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let region = BoundingBox::new(-8.9, 41.0, -8.7, 41.1).unwrap();
        let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.02, overlap: 0.001 }).unwrap();
        let params = OrchestratorParams {
            mode: ProcessingMode::ParallelWith(4),
            ..Default::default()
        };
        let summary = process_tiles(&source, &tiles, &Scenario::default(), &params).unwrap();
        for (i, r) in summary.results.iter().enumerate() {
            assert_eq!(r.tile.index, i);
            assert!(r.is_success());
        }
    }

    #[test]
    fn test_all_failed() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let region = BoundingBox::new(10.0, 10.0, 10.2, 10.1).unwrap();
        let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.1, overlap: 0.0 }).unwrap();
        let summary =
            process_tiles(&source, &tiles, &Scenario::default(), &OrchestratorParams::default())
                .unwrap();
        assert!(summary.all_failed());
        assert_eq!(summary.totals.flooded_area_m2, 0.0);
    }

    #[test]
    fn test_invalid_scenario_fails_before_tiles() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let tiles = plan_tiles(&dem.extent().unwrap(), &TilingParams::default()).unwrap();
        let scenario = Scenario::new(f64::NAN, 0.0, 0.0, 0.0);
        let err = process_tiles(&source, &tiles, &scenario, &OrchestratorParams::default());
        assert!(matches!(err, Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_tile_uses_own_midpoint_latitude() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let tiles = plan_tiles(&dem.extent().unwrap(), &TilingParams { tile_size: 0.05, overlap: 0.0 }).unwrap();
        let result = process_tile(&source, &tiles[0], &Scenario::default(), &SimulationParams::default());
        let lat = result.statistics().unwrap().center_latitude.unwrap();
        assert_relative_eq!(lat, tiles[0].bounds.center_y(), epsilon = 1e-12);
    }

    #[test]
    fn test_report_shape() {
        let dem = coastal_strip();
        let source = RasterSource::new(&dem);
        let region = BoundingBox::new(-8.9, 41.0, -8.6, 41.1).unwrap();
        let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.1, overlap: 0.0 }).unwrap();
        let summary =
            process_tiles(&source, &tiles, &Scenario::default(), &OrchestratorParams::default())
                .unwrap();
        let report = summary.report();
        assert_eq!(report.tiles.len(), 3);
        assert!(report.tiles[2].error.is_some());
        assert!(report.tiles[2].statistics.is_none());
        assert_relative_eq!(report.flood_threshold, 3.53, epsilon = 1e-12);
    }
}
