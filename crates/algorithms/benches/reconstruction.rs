//! Benchmarks for reconstruction by erosion and connected flooding

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use coastflood_algorithms::flood::{connected_flood, DelineationParams};
use coastflood_algorithms::morphology::ReconstructionMethod;
use coastflood_core::{Connectivity, GeoTransform, Raster};

/// Coastal ramp rising inland with a ridge pattern and scattered pits
fn create_test_dem(size: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let ramp = col as f64 / size as f64 * 10.0;
            let ridges = ((row * 7 + col * 13) % 17) as f64 * 0.25;
            r.set(row, col, ramp + ridges).unwrap();
        }
    }
    r
}

fn bench_hybrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood/hybrid");
    for connectivity in [Connectivity::Four, Connectivity::Eight] {
        for size in [256, 512, 1024] {
            let dem = create_test_dem(size);
            let params = DelineationParams {
                connectivity,
                method: ReconstructionMethod::Hybrid,
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", connectivity), size),
                &size,
                |b, _| b.iter(|| connected_flood(black_box(&dem), 3.53, &params).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood/full_scan");
    group.sample_size(10);
    for size in [64, 128, 256] {
        let dem = create_test_dem(size);
        let params = DelineationParams {
            connectivity: Connectivity::Four,
            method: ReconstructionMethod::FullScan,
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| connected_flood(black_box(&dem), 3.53, &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_hybrid, bench_full_scan);
criterion_main!(benches);
