//! Negative-binomial count regression of daily mainshock counts.

pub mod design;
pub mod engine;
pub mod negbin;

use qc_common::{ConvergenceFailure, InsufficientSample, ModelFailure};
use thiserror::Error;

pub use design::{build_design, code_column, DesignMatrix, BASELINE_COLUMNS};
pub use engine::{PreparedModel, RegressionEngine};
pub use negbin::{fit_negative_binomial, fit_poisson, FitFailure, FitSettings, GlmFit};

/// Why a regression stage produced no result.
#[derive(Debug, Clone, Error)]
pub enum RegressionError {
    #[error("{model} model did not converge: {}", .failure.reason)]
    Convergence { model: String, failure: FitFailure },

    #[error("insufficient sample: {0}")]
    InsufficientSample(InsufficientSample),

    /// The feature table cannot be turned into a design matrix.
    #[error("design: {0}")]
    Design(String),
}

impl RegressionError {
    pub(crate) fn convergence(model: &str, failure: FitFailure) -> Self {
        RegressionError::Convergence {
            model: model.to_string(),
            failure,
        }
    }

    pub(crate) fn numerical(model: &str, reason: impl Into<String>) -> Self {
        Self::convergence(
            model,
            FitFailure {
                reason: reason.into(),
                iterations: 0,
                log: Vec::new(),
            },
        )
    }

    /// The bundle-facing failure, when this is a modeling outcome rather
    /// than an input problem.
    pub fn model_failure(&self) -> Option<ModelFailure> {
        match self {
            RegressionError::Convergence { model, failure } => {
                Some(ModelFailure::Convergence(ConvergenceFailure {
                    model: model.clone(),
                    reason: failure.reason.clone(),
                    iterations: failure.iterations,
                    log: failure.log.clone(),
                }))
            }
            RegressionError::InsufficientSample(s) => Some(ModelFailure::InsufficientSample(s.clone())),
            RegressionError::Design(_) => None,
        }
    }
}

impl From<RegressionError> for qc_common::Error {
    fn from(err: RegressionError) -> Self {
        match err.model_failure() {
            Some(ModelFailure::Convergence(c)) => qc_common::Error::Convergence(c),
            Some(ModelFailure::InsufficientSample(s)) => qc_common::Error::InsufficientSample(s),
            None => qc_common::Error::Features(err.to_string()),
        }
    }
}
