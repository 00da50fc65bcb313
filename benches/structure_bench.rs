//! Performance benchmarks for structure analysis

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use refrain_dsp::similarity::fuse;
use refrain_dsp::structure::{build_recurrence, cliques_from_labels};
use refrain_dsp::{self_similarity_matrix, FeatureSet, StructureConfig};

/// Three-minute song at the default hop: ~7750 frames of slowly varying features
fn synthetic_features() -> FeatureSet {
    let frames = 7750;
    let section = |t: usize| ((t / 700) % 3) as f64;
    FeatureSet {
        mfcc: Array2::from_shape_fn((frames, 20), |(t, r)| (section(t) * 0.7 + r as f64 * 0.1).sin()),
        chroma: Array2::from_shape_fn((frames, 12), |(t, r)| ((r as f64 + section(t) * 5.0) * 0.5).cos().abs()),
        tempogram: Array2::from_shape_fn((frames, 32), |(t, r)| (section(t) + r as f64 * 0.05).cos()),
        pitches: Some((0..frames).map(|t| 220.0 * (1.0 + section(t) * 0.25)).collect()),
    }
}

fn bench_self_similarity(c: &mut Criterion) {
    let features = synthetic_features();
    let config = StructureConfig::default();

    c.bench_function("self_similarity_3min", |b| {
        b.iter(|| {
            let _ = self_similarity_matrix(black_box(&features), black_box(&config));
        });
    });
}

fn bench_fusion(c: &mut Criterion) {
    let n = 400;
    let affinities: Vec<Array2<f64>> = (0..3)
        .map(|m| Array2::from_shape_fn((n, n), |(i, j)| (-((i as f64 - j as f64) / (10.0 + m as f64)).powi(2)).exp()))
        .collect();
    let config = StructureConfig::default();

    c.bench_function("fuse_3x400", |b| {
        b.iter(|| {
            let _ = fuse(black_box(&affinities), black_box(&config.fusion));
        });
    });
}

fn bench_recurrence(c: &mut Criterion) {
    let labels: Vec<usize> = (0..2000).map(|i| ((i / 37) * 7) % 11).collect();
    let cliques = cliques_from_labels(&labels);
    let times: Vec<f64> = (0..=labels.len()).map(|i| i as f64 * 0.23).collect();
    let config = StructureConfig::default();

    c.bench_function("build_recurrence_2000", |b| {
        b.iter(|| {
            let _ = build_recurrence(black_box(&cliques), black_box(&times), black_box(&config.cliques));
        });
    });
}

criterion_group!(benches, bench_self_similarity, bench_fusion, bench_recurrence);
criterion_main!(benches);
