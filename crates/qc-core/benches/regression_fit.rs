//! Criterion benchmarks for the regression and permutation hot paths.
//!
//! Inputs are synthetic daily counts on an explicit window, so the runs are
//! deterministic and need no catalog files.

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qc_config::{EncoderConfig, MonteCarloConfig, RegressionConfig};
use qc_core::features::{FeatureEncoder, FeatureTable};
use qc_core::montecarlo::MonteCarloValidator;
use qc_core::regression::RegressionEngine;

fn synthetic_table(days: i64) -> FeatureTable {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date");
    let cfg = EncoderConfig {
        start: Some(start),
        end: Some(start + Duration::days(days - 1)),
        ..EncoderConfig::default()
    };
    let counts: Vec<u32> = (0..days as usize)
        .map(|i| [0, 1, 2, 1, 0, 3, 1, 0, 2, 1, 1][(i * 7 + i / 5) % 11])
        .collect();
    FeatureEncoder::new(cfg)
        .encode(&[], None)
        .and_then(|t| t.with_counts(&counts))
        .expect("synthetic table")
}

fn bench_fit(c: &mut Criterion) {
    let engine = RegressionEngine::new(RegressionConfig::default());
    let mut group = c.benchmark_group("regression");

    for years in [1i64, 5, 20] {
        let table = synthetic_table(years * 365);
        group.bench_with_input(BenchmarkId::new("fit", format!("{years}y")), &table, |b, t| {
            b.iter(|| {
                let (outcome, _) = engine.fit(black_box(t)).expect("fit should run");
                black_box(outcome);
            })
        });
    }
    group.finish();
}

fn bench_permutations(c: &mut Criterion) {
    let engine = RegressionEngine::new(RegressionConfig::default());
    let table = synthetic_table(5 * 365);
    let model = engine.prepare(&table).expect("prepared model");

    let mut group = c.benchmark_group("permutation");
    group.sample_size(10);
    for workers in [1usize, 4] {
        let validator = MonteCarloValidator::new(
            MonteCarloConfig {
                iterations: 16,
                workers,
                ..MonteCarloConfig::default()
            },
            0.05,
        );
        group.bench_with_input(BenchmarkId::new("validate_16", workers), &validator, |b, v| {
            b.iter(|| black_box(v.validate(&engine, &model, -2.0)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit, bench_permutations);
criterion_main!(benches);
