//! Reconstruction Kernel Performance Benchmark
//!
//! Measures one channel's rank-k reconstruction, the dominant per-request cost.
//!
//! **Goal:** 512x512 at rank 50 well under one display frame interval

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rankview_common::config::Precision;
use rankview_common::{Dimensions, FactorSet};
use rankview_engine::reconstruct::PreparedFactors;

fn synthetic_factors(width: usize, height: usize) -> FactorSet {
    let dims = Dimensions::new(width, height).unwrap();
    let r = dims.full_rank();

    let u = (0..dims.u_len()).map(|i| ((i * 31 % 97) as f32 / 97.0) - 0.5).collect();
    let s = (0..r).map(|i| 1000.0 / (i as f32 + 1.0)).collect();
    let vt = (0..dims.vt_len()).map(|i| ((i * 17 % 89) as f32 / 89.0) - 0.5).collect();

    FactorSet::from_parts(u, s, vt, dims)
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_512x512");
    let prepared = PreparedFactors::prepare(synthetic_factors(512, 512)).unwrap();

    for rank in [1usize, 10, 50, 200] {
        group.bench_with_input(BenchmarkId::new("single", rank), &rank, |b, &rank| {
            b.iter(|| black_box(prepared.reconstruct(black_box(rank), Precision::Single).unwrap()));
        });
    }

    group.bench_with_input(BenchmarkId::new("double", 50), &50usize, |b, &rank| {
        b.iter(|| black_box(prepared.reconstruct(black_box(rank), Precision::Double).unwrap()));
    });

    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    c.bench_function("prepare_512x512", |b| {
        b.iter_batched(
            || synthetic_factors(512, 512),
            |factors| black_box(PreparedFactors::prepare(factors).unwrap()),
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_reconstruct, bench_prepare);
criterion_main!(benches);
