//! # coastflood parallel
//!
//! Scaling the flood engine to large regions.
//!
//! This crate provides:
//! - Tile planning with overlap over a geographic region
//! - Tile orchestration across a worker pool, tolerant of per-tile failure
//! - Processing modes (sequential, all cores, fixed thread count)

pub mod orchestrator;
pub mod planner;
pub mod strategy;

pub use orchestrator::{
    process_tile, process_tiles, process_tiles_with_progress, BatchReport, BatchSummary,
    BatchTotals, GeoTiffSource, OrchestratorParams, RasterSource, TileReport, TileResult,
    TileSource,
};
pub use planner::{plan_tiles, tile_counts, Tile, TilingParams, DEFAULT_OVERLAP, DEFAULT_TILE_SIZE};
pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
