//! End-to-end study execution.
//!
//! Stages run in a fixed order: ingest, decluster, encode, regress,
//! periodicity, validate, verdict. All file reading happens before the
//! first computation. Only input problems are errors; modeling failures
//! and inconclusive validation end up in the bundle.

use std::path::Path;

use chrono::Utc;
use qc_common::{Event, ModelOutcome, Result, RunId, StudyId, SCHEMA_VERSION};
use qc_config::{validate_study, ConfigSnapshot, LoadedConfig, StudyConfig};
use tracing::info;

use crate::catalog::{read_catalog, CatalogIngestor, RawEntry};
use crate::decluster::Declusterer;
use crate::diagnostics::DiagnosticsRunner;
use crate::features::{event_day, CelestialSignal, FeatureEncoder};
use crate::logging::{emit, event_names, LogContext, Stage};
use crate::montecarlo::MonteCarloValidator;
use crate::periodicity::PeriodicityTester;
use crate::regression::RegressionEngine;
use crate::verdict::{bonferroni_screen, decide, Thresholds, VerdictBundle, WindowSummary};

/// One configured study, ready to run on a catalog.
#[derive(Debug, Clone)]
pub struct Study {
    config: StudyConfig,
    snapshot: ConfigSnapshot,
    study_id: StudyId,
}

impl Study {
    pub fn new(config: StudyConfig) -> Self {
        let snapshot = ConfigSnapshot::in_memory(&config);
        Study {
            config,
            snapshot,
            study_id: StudyId::new(),
        }
    }

    pub fn from_loaded(loaded: LoadedConfig) -> Self {
        info!(
            target: event_names::CONFIG_LOADED,
            config_hash = %loaded.snapshot.short_id(),
            "study config loaded"
        );
        Study {
            config: loaded.config,
            snapshot: loaded.snapshot,
            study_id: StudyId::new(),
        }
    }

    pub fn with_study_id(mut self, study_id: StudyId) -> Self {
        self.study_id = study_id;
        self
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn study_id(&self) -> &StudyId {
        &self.study_id
    }

    /// Read the catalog and optional signal, then run.
    pub fn run_files(&self, catalog: &Path, signal: Option<&Path>) -> Result<VerdictBundle> {
        let entries = read_catalog(catalog)?;
        let signal = signal.map(CelestialSignal::from_file).transpose()?;
        self.run(entries, signal.as_ref())
    }

    /// Run every stage on already-parsed catalog entries.
    pub fn run(&self, entries: Vec<RawEntry>, signal: Option<&CelestialSignal>) -> Result<VerdictBundle> {
        validate_study(&self.config)?;
        let cfg = &self.config;
        let ctx = LogContext::new(RunId::new()).with_study_id(self.study_id.clone());
        emit(
            &ctx.info(event_names::RUN_STARTED, Stage::Ingest, "study started")
                .with_field("rows", entries.len())
                .with_field("config_hash", self.snapshot.short_id()),
        );

        let ingested = {
            let _span = ctx.span(Stage::Ingest).entered();
            CatalogIngestor::new(cfg.ingest.clone()).ingest(entries)?
        };

        let declustered = {
            let _span = ctx.span(Stage::Decluster).entered();
            Declusterer::new(&cfg.decluster).decluster(&ingested.events)
        };
        let mainshocks = declustered.mainshocks(&ingested.events);

        let table = {
            let _span = ctx.span(Stage::Encode).entered();
            FeatureEncoder::new(cfg.encoder.clone()).encode(&mainshocks, signal)?
        };

        let engine = RegressionEngine::new(cfg.regression.clone());
        let (regression, prepared) = {
            let _span = ctx.span(Stage::Regress).entered();
            engine.fit(&table)?
        };

        // same sample as the regression: mainshocks dated inside the window
        let in_window: Vec<&Event> = mainshocks
            .iter()
            .copied()
            .filter(|e| table.covers(event_day(e, cfg.encoder.day_convention)))
            .collect();
        let periodicity = {
            let _span = ctx.span(Stage::Periodicity).entered();
            PeriodicityTester::new(cfg.periodicity.clone(), cfg.encoder.day_convention).test(&in_window)
        };

        let permutation = match (&regression, &prepared) {
            (ModelOutcome::Converged(result), Some(model)) if cfg.monte_carlo.enabled => {
                let _span = ctx.span(Stage::Validate).entered();
                let validator = MonteCarloValidator::new(cfg.monte_carlo.clone(), cfg.verdict.alpha);
                Some(validator.validate(&engine, model, result.delta_aic))
            }
            _ => None,
        };

        let diagnostics = DiagnosticsRunner::new(cfg.diagnostics.clone()).run(&table);

        let _span = ctx.span(Stage::Verdict).entered();
        let verdict = decide(&regression, permutation.as_ref(), &cfg.verdict);
        let coefficient_screen = regression
            .result()
            .and_then(|r| bonferroni_screen(r, cfg.verdict.coefficient_alpha));
        let mut thresholds = Thresholds::new(&cfg.verdict, &cfg.monte_carlo);
        thresholds.bonferroni = coefficient_screen.as_ref().map(|s| s.threshold);

        info!(target: event_names::VERDICT_ISSUED, verdict = %verdict, "verdict issued");
        emit(
            &ctx.info(event_names::RUN_FINISHED, Stage::Verdict, "study finished")
                .with_field("verdict", verdict)
                .with_field("mainshocks", mainshocks.len()),
        );

        Ok(VerdictBundle {
            schema_version: SCHEMA_VERSION.to_string(),
            study_id: self.study_id.clone(),
            run_id: ctx.run_id.clone(),
            generated_at: Utc::now(),
            ingest: ingested.report,
            decluster: declustered.summary,
            window: WindowSummary {
                start: table.start,
                end: table.end,
                days: table.days(),
                events: table.total_events(),
                events_outside_window: table.events_outside_window,
            },
            regression,
            periodicity,
            permutation,
            diagnostics,
            coefficient_screen,
            verdict,
            thresholds,
            config: self.snapshot.clone(),
        })
    }
}
