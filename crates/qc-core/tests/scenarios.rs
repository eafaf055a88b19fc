//! End-to-end studies on synthetic catalogs with known answers.

mod support;

use qc_common::{ModelFailure, ModelOutcome, Verdict};
use qc_core::catalog::RawEntry;
use qc_core::{Study, VerdictBundle};
use support::*;

#[test]
fn empty_catalog_is_inconclusive() {
    let start = date(2019, 1, 1);
    let study = Study::new(study_config(start, 365, 20));
    let bundle = study.run(Vec::<RawEntry>::new(), None).unwrap();

    assert_eq!(bundle.window.days, 365);
    assert_eq!(bundle.window.events, 0);
    assert_eq!(bundle.periodicity.event_count, 0);
    assert_eq!(bundle.periodicity.p_value, 1.0);
    match &bundle.regression {
        ModelOutcome::Failed(ModelFailure::InsufficientSample(s)) => {
            assert_eq!(s.effective_n, 0);
            assert_eq!(s.days, 365);
        }
        other => panic!("expected insufficient sample, got {other:?}"),
    }
    assert!(bundle.permutation.is_none());
    assert_eq!(bundle.verdict, Verdict::Inconclusive);
}

#[test]
fn constant_daily_counts_show_no_signal() {
    let start = date(2015, 1, 1);
    let days = 1096;
    let study = Study::new(study_config(start, days, 30));
    let bundle = study.run(spaced_rows(&every_day(start, days)), None).unwrap();

    assert_eq!(bundle.decluster.mainshocks, days as usize);
    let result = bundle.regression.result().expect("constant counts converge");
    assert!(result.delta_aic > 0.0);

    let perm = bundle.permutation.as_ref().expect("permutation ran");
    assert_eq!(perm.iterations_completed, 30);
    assert!(perm.empirical_p_value > 0.2);
    assert!(!perm.validated);
    assert_eq!(bundle.verdict, Verdict::NoSignal);
}

/// Several uniform catalogs: any single draw can land in the null's tail
/// by chance, so the p-value check is made on the median.
#[test]
fn uniform_random_dates_show_no_signal() {
    let start = date(2015, 1, 1);
    let days = 1096;
    let mut p_values = Vec::new();
    for seed in 1..=5 {
        let study = Study::new(study_config(start, days, 200));
        let dates = uniform_dates(start, days, 400, seed);
        let bundle = study.run(spaced_rows(&dates), None).unwrap();

        assert_eq!(bundle.window.events, 400);
        let perm = bundle.permutation.as_ref().expect("permutation ran");
        assert_eq!(perm.iterations_completed, 200);
        assert_eq!(bundle.verdict, Verdict::NoSignal, "seed {seed}");
        p_values.push(perm.empirical_p_value);
    }
    p_values.sort_by(f64::total_cmp);
    assert!(p_values[2] > 0.2, "median p {:?}", p_values);
}

#[test]
fn periodicity_uses_the_regression_window() {
    let start = date(2015, 1, 1);
    let days = 1096;
    let mut dates = uniform_dates(date(2014, 12, 1), 31, 50, 21);
    dates.extend(uniform_dates(start, days, 200, 22));

    let mut cfg = study_config(start, days, 5);
    cfg.monte_carlo.enabled = false;
    let bundle = Study::new(cfg).run(spaced_rows(&dates), None).unwrap();

    assert_eq!(bundle.decluster.mainshocks, 250);
    assert_eq!(bundle.window.events, 200);
    assert_eq!(bundle.window.events_outside_window, 50);
    assert_eq!(bundle.periodicity.event_count, bundle.window.events);
    assert_eq!(bundle.periodicity.position_counts.iter().sum::<u64>(), 200);
}

#[test]
fn concentrated_code_is_detected() {
    let start = date(2015, 1, 1);
    let days = 1096;
    let study = Study::new(study_config(start, days, 30));
    let dates = code_biased_dates(start, days, 400, 5, 0.8, 3);
    let bundle = study.run(spaced_rows(&dates), None).unwrap();

    assert!(bundle.periodicity.p_value < 0.01);
    assert_eq!(bundle.periodicity.position_counts.iter().sum::<u64>(), 400);

    let result = bundle.regression.result().expect("biased counts converge");
    let code5 = result
        .coefficients
        .iter()
        .find(|c| c.name == "cyclic_code=5")
        .expect("code 5 column");
    assert!(code5.estimate > 0.0);
    assert!(code5.p_value < 1e-3);
    assert!(result.delta_aic <= -2.0);

    let screen = bundle.coefficient_screen.as_ref().unwrap();
    assert!(screen.passing.iter().any(|n| n == "cyclic_code=5"));

    let perm = bundle.permutation.as_ref().unwrap();
    assert!(perm.validated);
    assert_eq!(bundle.verdict, Verdict::SignalDetected);
}

#[test]
fn same_seed_gives_same_null_distribution() {
    let start = date(2016, 1, 1);
    let days = 730;
    let dates = uniform_dates(start, days, 300, 5);
    let a = Study::new(study_config(start, days, 12))
        .run(spaced_rows(&dates), None)
        .unwrap();

    let mut single = study_config(start, days, 12);
    single.monte_carlo.workers = 1;
    let b = Study::new(single).run(spaced_rows(&dates), None).unwrap();

    let (pa, pb) = (a.permutation.unwrap(), b.permutation.unwrap());
    assert_eq!(pa.null_samples, pb.null_samples);
    assert_eq!(pa.empirical_p_value, pb.empirical_p_value);
    assert_eq!(a.verdict, b.verdict);
}

#[test]
fn catalog_file_round_trip_through_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2017, 1, 1);
    let days = 730;

    let lines: Vec<String> = spaced_rows(&uniform_dates(start, days, 250, 9))
        .into_iter()
        .map(|entry| match entry {
            RawEntry::Row(row) => serde_json::to_string(&row).unwrap(),
            RawEntry::Malformed(reason) => panic!("{reason}"),
        })
        .collect();
    let catalog = dir.path().join("catalog.jsonl");
    std::fs::write(&catalog, lines.join("\n")).unwrap();

    let mut cfg = study_config(start, days, 10);
    cfg.monte_carlo.enabled = false;
    let bundle = Study::new(cfg).run_files(&catalog, None).unwrap();
    assert_eq!(bundle.ingest.accepted, 250);
    assert!(bundle.permutation.is_none());
    assert_eq!(bundle.verdict, Verdict::Inconclusive);

    let out = dir.path().join("verdict.json");
    bundle.write_json(&out).unwrap();
    let back = VerdictBundle::read_json(&out).unwrap();
    assert_eq!(back.verdict, bundle.verdict);
    assert_eq!(back.window, bundle.window);
    assert_eq!(back.schema_version, VerdictBundle::current_schema());
    assert_eq!(back.ingest, bundle.ingest);
    let (r, r_back) = (bundle.regression.result().unwrap(), back.regression.result().unwrap());
    assert!((r.delta_aic - r_back.delta_aic).abs() < 1e-9);
    assert_eq!(r.coefficients.len(), r_back.coefficients.len());
}

#[test]
fn loaded_config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let start = date(2020, 1, 1);
    let path = dir.path().join("study.json");
    let cfg = study_config(start, 400, 5);
    std::fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();

    let loaded = qc_config::load_study_config(Some(&path)).unwrap();
    let study = Study::from_loaded(loaded);
    assert_eq!(study.config().encoder.start, Some(start));

    let bundle = study.run(Vec::<RawEntry>::new(), None).unwrap();
    assert_eq!(bundle.window.days, 400);
    assert_eq!(bundle.config.short_id().len(), 12);
    assert_eq!(bundle.verdict, Verdict::Inconclusive);
}
