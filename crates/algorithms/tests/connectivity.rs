//! Connectivity and reconstruction invariants on synthetic terrains.
//!
//! The hybrid reconstruction is checked against the full-scan reference and
//! against a breadth-first search over sub-threshold cells started from the
//! grid border.

use std::collections::VecDeque;

use coastflood_algorithms::flood::{
    connected_flood, flood_seed, simulate, DelineationParams, Scenario, SimulationParams,
};
use coastflood_algorithms::morphology::{erosion_step, ReconstructionMethod};
use coastflood_core::{Connectivity, GeoTransform, Raster, CRS};
use ndarray::Array2;

/// Deterministic terrain from a linear congruential generator, with a
/// seaward ramp so both flooded and dry regions appear.
fn lcg_terrain(rows: usize, cols: usize, seed: u64) -> Raster<f64> {
    let mut state = seed;
    let mut data = Vec::with_capacity(rows * cols);
    for _row in 0..rows {
        for col in 0..cols {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = (state >> 33) as f64 / (1u64 << 31) as f64;
            let ramp = col as f64 / cols.max(1) as f64 * 6.0;
            data.push(ramp + noise * 6.0);
        }
    }
    let mut r = Raster::from_vec(data, rows, cols).unwrap();
    r.set_transform(GeoTransform::new(-8.8, 41.0, 0.0001, -0.0001));
    r
}

/// Cells below `threshold` reachable from a sub-threshold border cell
fn bfs_oracle(dem: &Array2<f64>, threshold: f64, connectivity: Connectivity) -> Array2<bool> {
    let (rows, cols) = dem.dim();
    let mut flooded = Array2::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();

    for ((row, col), &e) in dem.indexed_iter() {
        let border = row == 0 || col == 0 || row + 1 == rows || col + 1 == cols;
        if border && e < threshold {
            flooded[(row, col)] = true;
            queue.push_back((row, col));
        }
    }
    while let Some((row, col)) = queue.pop_front() {
        for n in connectivity.neighbors(row, col, rows, cols) {
            if !flooded[n] && dem[n] < threshold {
                flooded[n] = true;
                queue.push_back(n);
            }
        }
    }
    flooded
}

const SHAPES: [(usize, usize); 7] = [(1, 1), (1, 9), (9, 1), (2, 2), (3, 3), (13, 17), (48, 40)];

#[test]
fn hybrid_matches_full_scan_and_bfs() {
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        for (i, &(rows, cols)) in SHAPES.iter().enumerate() {
            for seed in 0..4u64 {
                let dem = lcg_terrain(rows, cols, seed * 31 + i as u64);
                let threshold = 5.0;

                let hybrid = connected_flood(
                    &dem,
                    threshold,
                    &DelineationParams { connectivity, method: ReconstructionMethod::Hybrid },
                )
                .unwrap();
                let full = connected_flood(
                    &dem,
                    threshold,
                    &DelineationParams { connectivity, method: ReconstructionMethod::FullScan },
                )
                .unwrap();
                let oracle = bfs_oracle(dem.data(), threshold, connectivity);

                assert_eq!(
                    hybrid.surface.data(),
                    full.surface.data(),
                    "surfaces differ for {:?} {}x{} seed {}",
                    connectivity,
                    rows,
                    cols,
                    seed
                );
                for ((row, col), &expected) in oracle.indexed_iter() {
                    assert_eq!(
                        hybrid.is_flooded(row, col),
                        expected,
                        "cell ({}, {}) for {:?} {}x{} seed {}",
                        row,
                        col,
                        connectivity,
                        rows,
                        cols,
                        seed
                    );
                }
            }
        }
    }
}

#[test]
fn reconstruction_never_drops_below_terrain() {
    let dem = lcg_terrain(30, 30, 7);
    let out = connected_flood(&dem, 5.0, &DelineationParams::default()).unwrap();
    for (r, e) in out.surface.data().iter().zip(dem.data().iter()) {
        assert!(r >= e);
    }
}

#[test]
fn erosion_steps_are_monotone_and_bounded() {
    let dem = lcg_terrain(20, 25, 3);
    let mut current = flood_seed(dem.data(), 5.0);

    loop {
        let (next, changed) = erosion_step(&current, dem.data(), Connectivity::Four);
        for ((n, c), e) in next.iter().zip(current.iter()).zip(dem.data().iter()) {
            assert!(n <= c, "surface rose between steps");
            assert!(n >= e, "surface fell below terrain");
        }
        current = next;
        if changed == 0 {
            break;
        }
    }

    let hybrid = connected_flood(&dem, 5.0, &DelineationParams::default()).unwrap();
    assert_eq!(&current, hybrid.surface.data());
}

#[test]
fn fixed_point_is_idempotent() {
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let dem = lcg_terrain(33, 21, 11);
        let params = DelineationParams { connectivity, ..Default::default() };
        let out = connected_flood(&dem, 5.0, &params).unwrap();
        let (again, changed) = erosion_step(out.surface.data(), dem.data(), connectivity);
        assert_eq!(changed, 0);
        assert_eq!(&again, out.surface.data());
    }
}

#[test]
fn channel_reaches_interior_but_not_isolated_pit() {
    // Border cell (0, 1) opens a channel to interior cell (1, 1).
    // Interior cell (3, 3) is equally low but walled in.
    #[rustfmt::skip]
    let values = vec![
        9.0, 0.5, 9.0, 9.0, 9.0,
        9.0, 0.5, 9.0, 9.0, 9.0,
        9.0, 9.0, 9.0, 9.0, 9.0,
        9.0, 9.0, 9.0, 0.5, 9.0,
        9.0, 9.0, 9.0, 9.0, 9.0,
    ];
    let mut dem = Raster::from_vec(values, 5, 5).unwrap();
    dem.set_transform(GeoTransform::new(-8.7, 41.0, 0.0001, -0.0001));
    dem.set_crs(Some(CRS::wgs84()));

    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        let params = SimulationParams {
            delineation: DelineationParams { connectivity, ..Default::default() },
            ..Default::default()
        };
        let out = simulate(&dem, &Scenario::new(3.8, 0.6, 1.13, 2.0), &params).unwrap();

        let flooded: Vec<(usize, usize)> = out
            .mask
            .data()
            .indexed_iter()
            .filter(|(_, &v)| v == 1)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(flooded, vec![(0, 1), (1, 1)]);
        assert_eq!(out.isolated_cells, 1);
        assert_eq!(out.statistics.flooded_pixel_count, 2);
    }
}

#[test]
fn pointwise_rule_would_overflood() {
    let dem = lcg_terrain(40, 40, 99);
    let threshold = 5.0;
    let out = connected_flood(&dem, threshold, &DelineationParams::default()).unwrap();
    let pointwise = dem.data().iter().filter(|&&e| e < threshold).count();
    assert_eq!(out.flooded_cells + out.isolated_cells, pointwise);
}
