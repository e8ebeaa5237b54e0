//! Tiled batches read from GeoTIFF files on disk

use coastflood_algorithms::flood::Scenario;
use coastflood_core::io::write_geotiff;
use coastflood_core::{BoundingBox, Error, GeoTransform, Raster, CRS};
use coastflood_parallel::{
    plan_tiles, process_tiles, GeoTiffSource, OrchestratorParams, ProcessingMode, TilingParams,
};

/// West half: a low coastal shelf with an isolated pit behind a dune.
/// East half: declared no-data.
fn write_dem(dir: &std::path::Path) -> std::path::PathBuf {
    let (rows, cols) = (50, 200);
    let mut dem = Raster::filled(rows, cols, 0.5);
    dem.set_transform(GeoTransform::new(-8.9, 41.05, 0.001, -0.001));
    dem.set_crs(Some(CRS::wgs84()));
    dem.set_nodata(Some(-9999.0));

    for row in 0..rows {
        for col in 0..cols {
            let v = if col >= 100 {
                -9999.0
            } else if (20..=30).contains(&row) && (40..=50).contains(&col) {
                // dune ring around a pit
                if (21..=29).contains(&row) && (41..=49).contains(&col) { 0.2 } else { 8.0 }
            } else {
                0.5
            };
            dem.set(row, col, v).unwrap();
        }
    }

    let path = dir.join("dem.tif");
    write_geotiff(&dem, &path, None).unwrap();
    path
}

#[test]
fn geotiff_batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let source = GeoTiffSource::new(write_dem(dir.path()));

    let region = BoundingBox::new(-8.9, 41.0, -8.6, 41.05).unwrap();
    let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.1, overlap: 0.0 }).unwrap();
    assert_eq!(tiles.len(), 3);

    let params = OrchestratorParams {
        mode: ProcessingMode::ParallelWith(2),
        ..Default::default()
    };
    let summary = process_tiles(&source, &tiles, &Scenario::default(), &params).unwrap();

    assert_eq!(summary.totals.succeeded, 1);
    assert_eq!(summary.totals.failed, 2);
    assert!(matches!(summary.results[1].error(), Some(Error::NoValidData { .. })));
    assert!(matches!(summary.results[2].error(), Some(Error::NoCoverage(_))));

    let sim = summary.results[0].simulation().unwrap();
    // Everything but the dune ring and the pit inside it
    let ring_and_pit = 11 * 11;
    assert_eq!(sim.statistics.flooded_pixel_count, 50 * 100 - ring_and_pit);
    assert_eq!(sim.isolated_cells, 9 * 9);
    assert_eq!(summary.totals.flooded_pixels, sim.statistics.flooded_pixel_count);
}

#[test]
fn sequential_and_parallel_agree() {
    let dir = tempfile::tempdir().unwrap();
    let source = GeoTiffSource::new(write_dem(dir.path()));
    let region = BoundingBox::new(-8.9, 41.0, -8.8, 41.05).unwrap();
    let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.025, overlap: 0.002 }).unwrap();

    let run = |mode| {
        let params = OrchestratorParams { mode, ..Default::default() };
        process_tiles(&source, &tiles, &Scenario::default(), &params).unwrap()
    };
    let seq = run(ProcessingMode::Sequential);
    let par = run(ProcessingMode::Parallel);

    assert_eq!(seq.totals, par.totals);
    assert_eq!(seq.report(), par.report());
}

#[test]
fn missing_file_fails_every_tile() {
    let dir = tempfile::tempdir().unwrap();
    let source = GeoTiffSource::new(dir.path().join("absent.tif"));
    let region = BoundingBox::new(-8.9, 41.0, -8.7, 41.05).unwrap();
    let tiles = plan_tiles(&region, &TilingParams { tile_size: 0.1, overlap: 0.0 }).unwrap();

    let summary =
        process_tiles(&source, &tiles, &Scenario::default(), &OrchestratorParams::default()).unwrap();
    assert!(summary.all_failed());
    assert!(summary.results.iter().all(|r| matches!(r.error(), Some(Error::Io(_)))));
}
