//! coastflood CLI - connected coastal flood delineation

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use coastflood_algorithms::flood::{
    simulate, DelineationParams, SanitizeParams, Scenario, SimulationParams, MASK_NODATA,
    DEFAULT_DATUM_OFFSET,
};
use coastflood_core::io::{
    read_geotiff, read_geotiff_header, read_geotiff_window, write_mask_geotiff, write_vrt_mosaic,
    GeoTiffOptions, VrtSource,
};
use coastflood_core::{BoundingBox, Connectivity, Raster};
use coastflood_parallel::{
    plan_tiles, process_tiles_with_progress, tile_counts, GeoTiffSource, OrchestratorParams,
    ProcessingMode, Tile, TilingParams, DEFAULT_OVERLAP, DEFAULT_TILE_SIZE,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "coastflood")]
#[command(author, version, about = "Hydrologically connected coastal flood delineation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Plan the tile grid for a region and write it as GeoJSON
    Plan {
        /// Region as min_lon,min_lat,max_lon,max_lat
        #[arg(long, allow_hyphen_values = true)]
        bbox: BoundingBox,
        #[command(flatten)]
        tiling: TilingArgs,
        /// Output GeoJSON file
        #[arg(short, long, default_value = "tiles.geojson")]
        output: PathBuf,
    },
    /// Simulate flooding over a single region
    Simulate {
        /// Input elevation GeoTIFF
        input: PathBuf,
        /// Region as min_lon,min_lat,max_lon,max_lat
        #[arg(long, allow_hyphen_values = true)]
        bbox: BoundingBox,
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Simulate flooding over a large region, tile by tile
    Tiled {
        /// Input elevation GeoTIFF (or a file covering the whole region)
        input: PathBuf,
        /// Region as min_lon,min_lat,max_lon,max_lat
        #[arg(long, allow_hyphen_values = true)]
        bbox: BoundingBox,
        #[command(flatten)]
        tiling: TilingArgs,
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Worker threads (default: all cores, 1 = sequential)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

#[derive(Args)]
struct ScenarioArgs {
    /// Tide level in meters (ZH)
    #[arg(long, default_value_t = 3.8, allow_hyphen_values = true)]
    tide: f64,
    /// Storm surge height in meters
    #[arg(long, default_value_t = 0.6, allow_hyphen_values = true)]
    surge: f64,
    /// Sea-level rise in meters
    #[arg(long, default_value_t = 1.13, allow_hyphen_values = true)]
    slr: f64,
    /// Offset between ZH and the elevation datum, in meters
    #[arg(long, default_value_t = DEFAULT_DATUM_OFFSET, allow_hyphen_values = true)]
    datum_offset: f64,
}

impl ScenarioArgs {
    fn scenario(&self) -> Scenario {
        Scenario::new(self.tide, self.surge, self.slr, self.datum_offset)
    }
}

#[derive(Args)]
struct EngineArgs {
    /// No-data sentinel (default: the file's declared value, else -9999)
    #[arg(long, allow_hyphen_values = true)]
    nodata: Option<f64>,
    /// Let water travel diagonally
    #[arg(long)]
    eight_connected: bool,
}

impl EngineArgs {
    fn params(&self) -> SimulationParams {
        SimulationParams {
            sanitize: SanitizeParams {
                nodata: self.nodata,
                ..Default::default()
            },
            delineation: DelineationParams {
                connectivity: if self.eight_connected {
                    Connectivity::Eight
                } else {
                    Connectivity::Four
                },
                ..Default::default()
            },
            reference_latitude: None,
        }
    }
}

#[derive(Args)]
struct TilingArgs {
    /// Tile size in degrees
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: f64,
    /// Overlap between neighboring tiles in degrees
    #[arg(long, default_value_t = DEFAULT_OVERLAP)]
    overlap: f64,
}

impl TilingArgs {
    fn params(&self) -> TilingParams {
        TilingParams {
            tile_size: self.tile_size,
            overlap: self.overlap,
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} tiles ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

fn require_input(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_mask(raster: &Raster<u8>, path: &Path) -> Result<()> {
    write_mask_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn bbox_polygon(b: &BoundingBox) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [b.min_x, b.min_y],
            [b.max_x, b.min_y],
            [b.max_x, b.max_y],
            [b.min_x, b.max_y],
            [b.min_x, b.min_y],
        ]]
    })
}

fn tiles_geojson(tiles: &[Tile]) -> serde_json::Value {
    let features: Vec<_> = tiles
        .iter()
        .map(|t| {
            json!({
                "type": "Feature",
                "properties": {
                    "index": t.index,
                    "row": t.row,
                    "col": t.col,
                    "name": t.label(),
                },
                "geometry": bbox_polygon(&t.bounds),
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run_info(input: &Path) -> Result<()> {
    require_input(input)?;
    let header = read_geotiff_header(input).context("Failed to read raster header")?;
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(input).context("Failed to read raster")?;
    pb.finish_and_clear();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", header.cols, header.rows, raster.len());
    let (px_w, px_h) = header.transform.pixel_size();
    println!("Pixel size: {} x {}", px_w, px_h);
    if let Ok(extent) = header.extent() {
        println!("Bounds: {}", extent);
    }
    match &header.crs {
        Some(crs) => println!("CRS: {}", crs),
        None => println!("CRS: unknown (assuming geographic degrees)"),
    }
    match header.nodata {
        Some(nodata) => println!("NoData: {}", nodata),
        None => println!("NoData: not declared"),
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
    );
    Ok(())
}

fn run_plan(bbox: &BoundingBox, tiling: &TilingParams, output: &Path) -> Result<()> {
    let (nx, ny) = tile_counts(bbox, tiling).context("Invalid tiling configuration")?;
    let tiles = plan_tiles(bbox, tiling)?;
    info!("{} x {} tiles = {}", nx, ny, tiles.len());
    write_json(&tiles_geojson(&tiles), output)?;
    println!("Tile index ({} tiles) saved to: {}", tiles.len(), output.display());
    Ok(())
}

fn run_simulate(
    input: &Path,
    bbox: &BoundingBox,
    scenario: &Scenario,
    params: &SimulationParams,
    output_dir: &Path,
) -> Result<()> {
    require_input(input)?;
    scenario.validate()?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let pb = spinner("Reading raster...");
    let dem: Raster<f64> =
        read_geotiff_window(input, bbox).context("Failed to read raster window")?;
    pb.finish_and_clear();
    info!("Input window: {} x {}", dem.cols(), dem.rows());

    let params = SimulationParams {
        reference_latitude: Some(bbox.center_y()),
        ..params.clone()
    };
    let start = Instant::now();
    let pb = spinner("Calculating hydrological connectivity...");
    let result = simulate(&dem, scenario, &params);
    pb.finish_and_clear();
    let sim = result.context("Flood simulation failed")?;
    let elapsed = start.elapsed();

    let raster_path = output_dir.join("flood_mask.tif");
    write_mask(&sim.output_raster()?, &raster_path)?;
    write_json(&sim.report(), &output_dir.join("summary.json"))?;

    let stats = &sim.statistics;
    println!("Total water level: {:.2} m (ZH)", sim.total_water_level);
    println!("Flood threshold:   {:.2} m", sim.flood_threshold);
    println!("Flooded pixels:    {}", stats.flooded_pixel_count);
    println!(
        "Pixel size:        {:.2} m x {:.2} m",
        stats.pixel_width_m, stats.pixel_height_m
    );
    println!(
        "Flooded area:      {:.3} km2 ({:.0} m2)",
        stats.flooded_area_km2, stats.flooded_area_m2
    );
    done("Flood mask", &raster_path, elapsed);
    Ok(())
}

fn run_tiled(
    input: &Path,
    bbox: &BoundingBox,
    tiling: &TilingParams,
    scenario: &Scenario,
    params: OrchestratorParams,
    output_dir: &Path,
) -> Result<()> {
    require_input(input)?;
    let tiles = plan_tiles(bbox, tiling).context("Invalid tiling configuration")?;
    let tiles_dir = output_dir.join("tiles");
    fs::create_dir_all(&tiles_dir)
        .with_context(|| format!("Failed to create {}", tiles_dir.display()))?;

    let source = GeoTiffSource::new(input);
    let start = Instant::now();
    let pb = progress_bar(tiles.len());
    let summary = process_tiles_with_progress(&source, &tiles, scenario, &params, |_| pb.inc(1))?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    let mut sources = Vec::new();
    let mut crs = None;
    for result in &summary.results {
        let Some(sim) = result.simulation() else {
            continue;
        };
        let raster = sim.output_raster()?;
        let path = tiles_dir.join(format!("{}.tif", result.tile.label()));
        write_mask(&raster, &path)?;
        if crs.is_none() {
            crs = raster.crs().cloned();
        }
        sources.push(VrtSource {
            path,
            transform: *raster.transform(),
            rows: raster.rows(),
            cols: raster.cols(),
        });
    }

    write_json(&summary.report(), &output_dir.join("summary.json"))?;

    let totals = &summary.totals;
    println!(
        "Tiles: {} succeeded, {} failed of {}",
        totals.succeeded,
        totals.failed,
        totals.total()
    );
    for result in summary.results.iter().filter(|r| !r.is_success()) {
        if let Some(e) = result.error() {
            println!("  {} ({}): {}", result.tile.index, result.tile.label(), e);
        }
    }

    if summary.all_failed() {
        anyhow::bail!("All {} tiles failed", totals.total());
    }

    let vrt_path = output_dir.join("flood_mosaic.vrt");
    write_vrt_mosaic(&sources, crs.as_ref(), Some(MASK_NODATA), &vrt_path)
        .context("Failed to write mosaic")?;
    if totals.failed > 0 {
        warn!("{} tiles failed; the mosaic has gaps", totals.failed);
    }

    println!("Flooded pixels: {}", totals.flooded_pixels);
    println!(
        "Flooded area:   {:.3} km2 (overlap strips may be counted twice)",
        totals.flooded_area_km2
    );
    done("Mosaic", &vrt_path, elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => run_info(&input),
        Commands::Plan {
            bbox,
            tiling,
            output,
        } => run_plan(&bbox, &tiling.params(), &output),
        Commands::Simulate {
            input,
            bbox,
            scenario,
            engine,
            output_dir,
        } => run_simulate(
            &input,
            &bbox,
            &scenario.scenario(),
            &engine.params(),
            &output_dir,
        ),
        Commands::Tiled {
            input,
            bbox,
            tiling,
            scenario,
            engine,
            threads,
            output_dir,
        } => run_tiled(
            &input,
            &bbox,
            &tiling.params(),
            &scenario.scenario(),
            OrchestratorParams {
                mode: ProcessingMode::from_threads(threads),
                simulation: engine.params(),
            },
            &output_dir,
        ),
    }
}
