//! Error types for Quake Cycles.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers deciding whether to retry
//! - Remediation suggestions for humans
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 31,
//!   "category": "modeling",
//!   "message": "insufficient sample: 14 parameters need 140 observations, have 0",
//!   "recoverable": true,
//!   "context": { "parameters": 14, "effective_n": 0 }
//! }
//! ```

use crate::results::{ConvergenceFailure, InsufficientSample, ModelFailure};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Quake Cycles operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Catalog row and batch errors.
    Ingestion,
    /// Feature table construction errors.
    Features,
    /// Regression fitting errors.
    Modeling,
    /// Permutation validation errors.
    Validation,
    /// File I/O and serialization errors.
    Io,
    /// Study configuration errors.
    Config,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Ingestion => write!(f, "ingestion"),
            ErrorCategory::Features => write!(f, "features"),
            ErrorCategory::Modeling => write!(f, "modeling"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Config => write!(f, "config"),
        }
    }
}

/// Unified error type for Quake Cycles.
#[derive(Error, Debug)]
pub enum Error {
    // Ingestion errors (10-19)
    #[error("data quality: {reason}")]
    DataQuality { row: Option<usize>, reason: String },

    #[error("batch ingestion failed: {rejected} of {total} rows rejected (threshold {threshold})")]
    BatchIngestion {
        rejected: usize,
        total: usize,
        threshold: f64,
    },

    // Feature errors (20-29)
    #[error("signal gap of {gap_days} days before {date} exceeds forward-fill limit of {max_days}")]
    SignalGap {
        date: String,
        gap_days: i64,
        max_days: i64,
    },

    #[error("invalid study window: {0}")]
    StudyWindow(String),

    #[error("feature encoding failed: {0}")]
    Features(String),

    // Modeling errors (30-39)
    #[error("regression did not converge: {}", .0.reason)]
    Convergence(ConvergenceFailure),

    #[error("insufficient sample: {0}")]
    InsufficientSample(InsufficientSample),

    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),

    // Validation errors (40-49)
    #[error("permutation validation failed: {0}")]
    Validation(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors (70-79)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration field {field}: {message}")]
    InvalidConfig { field: String, message: String },
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Ingestion errors
    /// - 20-29: Feature errors
    /// - 30-39: Modeling errors
    /// - 40-49: Validation errors
    /// - 60-69: I/O errors
    /// - 70-79: Config errors
    pub fn code(&self) -> u32 {
        match self {
            Error::DataQuality { .. } => 10,
            Error::BatchIngestion { .. } => 11,
            Error::SignalGap { .. } => 20,
            Error::StudyWindow(_) => 21,
            Error::Features(_) => 22,
            Error::Convergence(_) => 30,
            Error::InsufficientSample(_) => 31,
            Error::NumericalInstability(_) => 32,
            Error::Validation(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
            Error::Config(_) => 70,
            Error::InvalidConfig { .. } => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DataQuality { .. } | Error::BatchIngestion { .. } => ErrorCategory::Ingestion,
            Error::SignalGap { .. } | Error::StudyWindow(_) | Error::Features(_) => {
                ErrorCategory::Features
            }
            Error::Convergence(_)
            | Error::InsufficientSample(_)
            | Error::NumericalInstability(_) => ErrorCategory::Modeling,
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
            Error::Config(_) | Error::InvalidConfig { .. } => ErrorCategory::Config,
        }
    }

    /// True for malformed or out-of-range input data, at row or series level.
    pub fn is_data_quality(&self) -> bool {
        matches!(self, Error::DataQuality { .. } | Error::SignalGap { .. })
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// A batch ingestion failure is fatal for the run. Modeling failures are
    /// recoverable by the caller (for example by refitting a smaller model).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::DataQuality { .. } => true,
            Error::BatchIngestion { .. } => false,
            Error::SignalGap { .. } => true,
            Error::StudyWindow(_) => true,
            Error::Features(_) => true,
            Error::Convergence(_) => true,
            Error::InsufficientSample(_) => true,
            Error::NumericalInstability(_) => true,
            Error::Validation(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => true,
            Error::Config(_) => true,
            Error::InvalidConfig { .. } => true,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::DataQuality { .. } => {
                "The row was dropped. Check the catalog for out-of-range coordinates or magnitudes."
            }
            Error::BatchIngestion { .. } => {
                "Too many rows were rejected. Check the catalog format or raise ingest.max_reject_fraction."
            }
            Error::SignalGap { .. } => {
                "The celestial signal has a gap too long to forward-fill. Regenerate the signal for the full study window."
            }
            Error::StudyWindow(_) => "Ensure the study window end date is not before its start date.",
            Error::Features(_) => "Check that the signal and catalog cover the same study window.",
            Error::Convergence(_) => {
                "Refit with fewer features (for example without celestial terms) or a longer study window."
            }
            Error::InsufficientSample(_) => {
                "Lengthen the study window, lower the magnitude threshold, or drop feature groups."
            }
            Error::NumericalInstability(_) => {
                "Internal numerical issue. Check the feature table for extreme or constant columns."
            }
            Error::Validation(_) => "Check the Monte Carlo settings (iterations, workers, time budget).",
            Error::Io(_) => "Check that the input files exist and are readable.",
            Error::Json(_) => "Invalid JSON input. Check syntax with 'jq .' before retrying.",
            Error::Config(_) => "Check the study configuration file syntax.",
            Error::InvalidConfig { .. } => "Fix the named configuration field and rerun.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::DataQuality { .. } => "Data Quality Error",
            Error::BatchIngestion { .. } => "Batch Ingestion Failed",
            Error::SignalGap { .. } => "Signal Gap Too Long",
            Error::StudyWindow(_) => "Invalid Study Window",
            Error::Features(_) => "Feature Encoding Error",
            Error::Convergence(_) => "Regression Did Not Converge",
            Error::InsufficientSample(_) => "Insufficient Sample",
            Error::NumericalInstability(_) => "Numerical Instability",
            Error::Validation(_) => "Validation Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig { .. } => "Invalid Configuration",
        }
    }
}

impl From<ModelFailure> for Error {
    fn from(failure: ModelFailure) -> Self {
        match failure {
            ModelFailure::Convergence(c) => Error::Convergence(c),
            ModelFailure::InsufficientSample(s) => Error::InsufficientSample(s),
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., row index, parameter counts).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DataQuality { row: Some(row), .. } => {
                context.insert("row".to_string(), serde_json::json!(row));
            }
            Error::BatchIngestion {
                rejected,
                total,
                threshold,
            } => {
                context.insert("rejected".to_string(), serde_json::json!(rejected));
                context.insert("total".to_string(), serde_json::json!(total));
                context.insert("threshold".to_string(), serde_json::json!(threshold));
            }
            Error::SignalGap { date, gap_days, .. } => {
                context.insert("date".to_string(), serde_json::json!(date));
                context.insert("gap_days".to_string(), serde_json::json!(gap_days));
            }
            Error::Convergence(c) => {
                context.insert("model".to_string(), serde_json::json!(c.model));
                context.insert("iterations".to_string(), serde_json::json!(c.iterations));
            }
            Error::InsufficientSample(s) => {
                context.insert("parameters".to_string(), serde_json::json!(s.parameters));
                context.insert("effective_n".to_string(), serde_json::json!(s.effective_n));
            }
            Error::InvalidConfig { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error) -> String {
    format!(
        "✗ {}\n  Reason: {}\n  Fix: {}",
        err.headline(),
        err,
        err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insufficient() -> Error {
        Error::InsufficientSample(InsufficientSample {
            parameters: 14,
            effective_n: 0,
            days: 365,
            events: 0,
        })
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            Error::DataQuality {
                row: None,
                reason: "x".into()
            }
            .code(),
            10
        );
        assert_eq!(insufficient().code(), 31);
        assert_eq!(Error::Config("bad".into()).code(), 70);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(insufficient().category(), ErrorCategory::Modeling);
        assert_eq!(
            Error::SignalGap {
                date: "2020-01-05".into(),
                gap_days: 5,
                max_days: 3
            }
            .category(),
            ErrorCategory::Features
        );
    }

    #[test]
    fn batch_ingestion_is_fatal() {
        let err = Error::BatchIngestion {
            rejected: 30,
            total: 100,
            threshold: 0.2,
        };
        assert!(!err.is_recoverable());
        assert!(insufficient().is_recoverable());
    }

    #[test]
    fn signal_gap_counts_as_data_quality() {
        let gap = Error::SignalGap {
            date: "2020-01-05".into(),
            gap_days: 5,
            max_days: 3,
        };
        assert!(gap.is_data_quality());
        assert!(!insufficient().is_data_quality());
    }

    #[test]
    fn test_structured_error_from_error() {
        let structured = StructuredError::from(&insufficient());
        assert_eq!(structured.code, 31);
        assert_eq!(structured.category, ErrorCategory::Modeling);
        assert!(structured.recoverable);
        assert_eq!(structured.context.get("parameters"), Some(&serde_json::json!(14)));

        let json = structured.to_json();
        assert!(json.contains(r#""category":"modeling""#));
    }

    #[test]
    fn model_failure_converts_into_error() {
        let failure = ModelFailure::Convergence(ConvergenceFailure {
            model: "full".into(),
            reason: "separation".into(),
            iterations: 12,
            log: Vec::new(),
        });
        let err: Error = failure.into();
        assert_eq!(err.code(), 30);
        assert_eq!(err.to_string(), "regression did not converge: separation");
    }

    #[test]
    fn test_format_error_human() {
        let formatted = format_error_human(&insufficient());
        assert!(formatted.contains("Insufficient Sample"));
        assert!(formatted.contains("14 parameters need 140 observations"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Ingestion.to_string(), "ingestion");
        assert_eq!(ErrorCategory::Config.to_string(), "config");
    }
}
