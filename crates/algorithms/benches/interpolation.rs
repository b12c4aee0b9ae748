//! Benchmarks for error-field interpolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use offsetfield_algorithms::interpolation::{
    interpolation_model_transform, Interpolant, QuerySpec,
};
use offsetfield_algorithms::regression::KnnRegressor;
use offsetfield_core::{InterpolantKind, SpatialSample, TrainingSet};

/// Scattered samples of a smooth surge-like field on a jittered lattice
fn create_samples(n: usize) -> Vec<SpatialSample> {
    let side = (n as f64).sqrt().ceil() as usize;
    (0..n)
        .map(|i| {
            let (row, col) = (i / side, i % side);
            let jitter = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            let lon = -80.0 + col as f64 * 0.1 + jitter;
            let lat = 25.0 + row as f64 * 0.1 - jitter * 0.5;
            let value = 0.3 * (lon * 0.7).sin() * (lat * 0.4).cos();
            SpatialSample::new(lon, lat, value)
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation/fit");
    for n in [100, 500, 2000] {
        let training = TrainingSet::new(create_samples(n));
        for kind in [InterpolantKind::Linear, InterpolantKind::CloughTocher] {
            group.bench_with_input(BenchmarkId::new(kind.name(), n), &n, |b, _| {
                b.iter(|| Interpolant::fit(black_box(&training), kind, 0.0).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_grid_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation/grid_query");
    let training = TrainingSet::new(create_samples(1000));
    for kind in [InterpolantKind::Linear, InterpolantKind::CloughTocher] {
        let model = Interpolant::fit(&training, kind, 0.0).unwrap();
        for size in [64, 256] {
            let res = 3.2 / size as f64;
            let query = QuerySpec::regular_grid(-80.0, 25.0, res, size, size).unwrap();
            group.bench_with_input(BenchmarkId::new(kind.name(), size), &size, |b, _| {
                b.iter(|| interpolation_model_transform(black_box(&model), &query).unwrap())
            });
        }
    }
    group.finish();
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression/knn_predict");
    let samples = create_samples(5000);
    let targets: Vec<(f64, f64)> = create_samples(1000)
        .iter()
        .map(|s| (s.lon + 0.03, s.lat + 0.02))
        .collect();
    for k in [1, 3, 10] {
        let reg = KnnRegressor::fit(&samples, k).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, _| {
            b.iter(|| reg.predict_many(black_box(&targets)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_grid_query, bench_knn);
criterion_main!(benches);
