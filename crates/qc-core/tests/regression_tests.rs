//! Regression engine behaviour on feature tables with and without a signal.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use qc_common::{Body, BodyMap, ModelFailure, ModelOutcome};
use qc_config::{EncoderConfig, RegressionConfig};
use qc_core::features::{BodyReading, CelestialSignal, FeatureEncoder, FeatureTable};
use qc_core::regression::RegressionEngine;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2012, 6, 1).unwrap()
}

fn window(days: i64, bodies: Vec<Body>) -> EncoderConfig {
    EncoderConfig {
        start: Some(start()),
        end: Some(start() + Duration::days(days - 1)),
        bodies,
        ..EncoderConfig::default()
    }
}

fn plain_table(counts: &[u32]) -> FeatureTable {
    FeatureEncoder::new(window(counts.len() as i64, vec![]))
        .encode(&[], None)
        .unwrap()
        .with_counts(counts)
        .unwrap()
}

/// Sun and Moon move at their mean rates; nothing is ever retrograde.
fn signal(days: i64) -> CelestialSignal {
    CelestialSignal::from_days((0..days).map(|i| {
        let t = i as f64;
        let readings = BodyMap::from_fn(|b| BodyReading {
            geocentric_longitude_degrees: match b {
                Body::Sun => (280.0 + 0.9856 * t) % 360.0,
                Body::Moon => (218.0 + 13.176 * t) % 360.0,
                _ => (b.index() as f64 * 40.0 + 0.5 * t) % 360.0,
            },
            strength_score_0_100: match b {
                Body::Sun => 50.0 + 40.0 * (t / 30.0).sin(),
                _ => ((i * 7 + b.index() as i64 * 3) % 100) as f64,
            },
            is_retrograde: false,
        });
        (start() + Duration::days(i), readings)
    }))
    .unwrap()
}

fn noisy_counts(days: usize) -> Vec<u32> {
    // deterministic, roughly Poisson(1) shaped
    (0..days).map(|i| [0, 1, 2, 1, 0, 3, 1, 0, 2, 1, 1][(i * 7 + i / 5) % 11]).collect()
}

#[test]
fn constant_retrograde_flags_are_aliased() {
    let days = 600;
    let table = FeatureEncoder::new(window(days, vec![Body::Sun, Body::Moon]))
        .encode(&[], Some(&signal(days)))
        .unwrap()
        .with_counts(&noisy_counts(days as usize))
        .unwrap();
    let engine = RegressionEngine::new(RegressionConfig::default());
    let model = engine.prepare(&table).unwrap();

    assert!(model.aliased().iter().any(|n| n == "sun_retrograde"));
    assert!(model.aliased().iter().any(|n| n == "moon_retrograde"));
    assert!(model.tested_names().iter().any(|n| n == "moon_sin"));
    assert!(model.tested_names().iter().any(|n| n == "sun_strength"));
    assert_eq!(model.baseline_names().len(), 4);

    let (outcome, _) = engine.fit(&table).unwrap();
    if let ModelOutcome::Converged(r) = outcome {
        assert!(r.coefficients.iter().all(|c| !c.name.ends_with("_retrograde")));
        assert_eq!(r.aliased_features.len(), 2);
        assert_eq!(r.n_parameters, model.parameters());
    }
}

#[test]
fn sample_rule_counts_kept_columns() {
    let engine = RegressionEngine::new(RegressionConfig::default());
    // 13 parameters need N >= 130
    let short = plain_table(&vec![1; 129]);
    match engine.fit(&short).unwrap().0 {
        ModelOutcome::Failed(ModelFailure::InsufficientSample(s)) => {
            assert_eq!(s.parameters, 13);
            assert_eq!(s.effective_n, 129);
        }
        other => panic!("expected insufficient sample, got {other:?}"),
    }

    // plenty of days but too few events
    let mut sparse = vec![0; 800];
    for i in (0..800).step_by(8) {
        sparse[i] = 1;
    }
    match engine.fit(&plain_table(&sparse)).unwrap().0 {
        ModelOutcome::Failed(ModelFailure::InsufficientSample(s)) => assert_eq!(s.effective_n, 100),
        other => panic!("expected insufficient sample, got {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn outcomes_never_carry_non_finite_numbers(counts in prop::collection::vec(0u32..6, 150..400)) {
        let engine = RegressionEngine::new(RegressionConfig::default());
        let (outcome, prepared) = engine.fit(&plain_table(&counts)).unwrap();
        match outcome {
            ModelOutcome::Converged(r) => {
                prop_assert!(prepared.is_some());
                prop_assert!(r.delta_aic.is_finite());
                prop_assert!(r.dispersion_alpha.is_finite() && r.dispersion_alpha > 0.0);
                prop_assert!((0.0..=1.0).contains(&r.dispersion_lr_p_value));
                for c in &r.coefficients {
                    prop_assert!(c.estimate.is_finite() && c.std_error.is_finite(), "{:?}", c);
                    prop_assert!((0.0..=1.0).contains(&c.p_value));
                }
            }
            ModelOutcome::Failed(_) => {}
        }
    }
}
