//! Structured event definitions for logging.
//!
//! Every event carries the run id, the study id when one exists, and the
//! pipeline stage that produced it.

use chrono::{DateTime, Utc};
use qc_common::{RunId, StudyId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Catalog normalization.
    Ingest,
    /// Aftershock removal.
    Decluster,
    /// Daily feature table construction.
    Encode,
    /// Negative-binomial fitting.
    Regress,
    /// Schuster phase test.
    Periodicity,
    /// Permutation null distribution.
    Validate,
    /// Verdict assembly.
    Verdict,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Decluster => "decluster",
            Stage::Encode => "encode",
            Stage::Regress => "regress",
            Stage::Periodicity => "periodicity",
            Stage::Validate => "validate",
            Stage::Verdict => "verdict",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event names used as tracing targets.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const INGEST_ROW_DROPPED: &str = "ingest.row_dropped";
    pub const INGEST_DUPLICATE: &str = "ingest.duplicate";
    pub const INGEST_FINISHED: &str = "ingest.finished";

    pub const DECLUSTER_FINISHED: &str = "decluster.finished";

    pub const ENCODE_SIGNAL_FILLED: &str = "encode.signal_filled";
    pub const ENCODE_FINISHED: &str = "encode.finished";

    pub const REGRESS_ALIASED: &str = "regress.aliased";
    pub const REGRESS_ITERATION: &str = "regress.iteration";
    pub const REGRESS_FAILED: &str = "regress.failed";
    pub const REGRESS_FINISHED: &str = "regress.finished";

    pub const PERIODICITY_FINISHED: &str = "periodicity.finished";

    pub const VALIDATE_STARTED: &str = "validate.started";
    pub const VALIDATE_SKIPPED_FIT: &str = "validate.skipped_fit";
    pub const VALIDATE_BUDGET_EXHAUSTED: &str = "validate.budget_exhausted";
    pub const VALIDATE_FINISHED: &str = "validate.finished";

    pub const VERDICT_ISSUED: &str = "verdict.issued";

    pub const CONFIG_LOADED: &str = "config.loaded";
}

/// A structured log event for JSONL output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub ts: DateTime<Utc>,
    pub level: Level,
    /// Event name, for example `ingest.row_dropped`.
    pub event: String,
    pub run_id: RunId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_id: Option<StudyId>,
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, serde_json::Value>,
}

impl LogEvent {
    pub fn new(
        level: Level,
        event: impl Into<String>,
        run_id: RunId,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        LogEvent {
            ts: Utc::now(),
            level,
            event: event.into(),
            run_id,
            study_id: None,
            stage,
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    /// Add a field to the event; values that fail to serialize are dropped.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.insert(key.into(), v);
        }
        self
    }

    /// Serialize to a single JSON line.
    pub fn to_jsonl(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"error":"serialization_failed","event":"{}"}}"#,
                self.event
            )
        })
    }
}

/// Correlation ids shared by every event of one study run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: RunId,
    pub study_id: Option<StudyId>,
}

impl LogContext {
    pub fn new(run_id: RunId) -> Self {
        LogContext {
            run_id,
            study_id: None,
        }
    }

    pub fn with_study_id(mut self, study_id: StudyId) -> Self {
        self.study_id = Some(study_id);
        self
    }

    /// Create an event with this context.
    pub fn event(
        &self,
        level: Level,
        event: impl Into<String>,
        stage: Stage,
        message: impl Into<String>,
    ) -> LogEvent {
        let mut e = LogEvent::new(level, event, self.run_id.clone(), stage, message);
        e.study_id = self.study_id.clone();
        e
    }

    pub fn info(&self, event: impl Into<String>, stage: Stage, message: impl Into<String>) -> LogEvent {
        self.event(Level::Info, event, stage, message)
    }

    pub fn warn(&self, event: impl Into<String>, stage: Stage, message: impl Into<String>) -> LogEvent {
        self.event(Level::Warn, event, stage, message)
    }

    /// A tracing span carrying the correlation ids, picked up by
    /// [`JsonlLayer`](super::JsonlLayer) for every event inside it.
    pub fn span(&self, stage: Stage) -> tracing::Span {
        let study = self
            .study_id
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_default();
        tracing::info_span!(
            "stage",
            run_id = %self.run_id,
            study_id = %study,
            stage = stage.as_str()
        )
    }
}
