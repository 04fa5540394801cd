//! K-means training/scoring micro-benchmark.
//!
//! Measures throughput of the two hot-path operations a per-dimension
//! worker performs each cycle: fitting a fresh model against a training
//! window, and scoring a single feature vector against an already-trained
//! model.

use criterion::{criterion_group, criterion_main, Criterion};

use ad_common::feature::{FeatureMatrix, FeaturePipeline};
use ad_common::kmeans::KMeansModel;

fn synthetic_matrix(rows: usize) -> FeatureMatrix {
    let xs: Vec<f64> = (0..rows + 20)
        .map(|i| {
            let t = i as f64 * 0.01;
            10.0 * t.sin() + 0.1 * (i % 7) as f64
        })
        .collect();
    FeaturePipeline::new(1, 3, 5).transform(&xs).unwrap()
}

fn bench_train(c: &mut Criterion) {
    let matrix = synthetic_matrix(900);

    c.bench_function("kmeans_train_900_rows", |b| {
        b.iter(|| {
            let mut model = KMeansModel::new();
            model.train(&matrix, 1234)
        });
    });
}

fn bench_score(c: &mut Criterion) {
    let matrix = synthetic_matrix(900);
    let mut model = KMeansModel::new();
    model.train(&matrix, 1234);
    let probe = matrix.rows[0].clone();

    c.bench_function("kmeans_score", |b| {
        b.iter(|| model.score(&probe));
    });
}

criterion_group!(benches, bench_train, bench_score);
criterion_main!(benches);
