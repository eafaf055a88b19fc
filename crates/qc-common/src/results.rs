//! Immutable result types produced by the modeling and testing stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One fitted coefficient with its Wald statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    /// `estimate / std_error`.
    pub z: f64,
    /// Two-sided normal p-value of `z`.
    pub p_value: f64,
}

/// A converged negative-binomial fit of the full model, compared with the
/// baseline (trend + seasonality) fit on the same rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Coefficients in design-column order (intercept first).
    pub coefficients: Vec<Coefficient>,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub converged: bool,
    pub baseline_log_likelihood: f64,
    pub baseline_aic: f64,
    /// `aic - baseline_aic`; negative favours the full model.
    pub delta_aic: f64,
    /// NB2 dispersion of the full model (`Var = mu + alpha * mu^2`).
    pub dispersion_alpha: f64,
    /// Likelihood-ratio statistic of the full NB fit against its Poisson limit.
    pub dispersion_lr_statistic: f64,
    /// Mixture chi-square p-value of the dispersion LR statistic.
    pub dispersion_lr_p_value: f64,
    /// Total IRLS iterations used by the full model.
    pub iterations: usize,
    pub n_observations: usize,
    /// Estimated parameters of the full model, including alpha.
    pub n_parameters: usize,
    /// Columns dropped because they were constant or linearly dependent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliased_features: Vec<String>,
}

impl RegressionResult {
    /// Look up a coefficient by feature name.
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// One step of the alternating alpha / IRLS optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub outer: usize,
    pub inner: usize,
    pub alpha: f64,
    pub log_likelihood: f64,
    pub max_abs_coefficient: f64,
}

/// The optimizer gave up; carries everything it saw on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceFailure {
    /// Which model failed (`full` or `baseline`).
    pub model: String,
    pub reason: String,
    pub iterations: usize,
    pub log: Vec<IterationRecord>,
}

/// Too many parameters for the available sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientSample {
    pub parameters: usize,
    /// Effective sample size `N` used in the `parameters <= N / 10` rule.
    pub effective_n: usize,
    pub days: usize,
    pub events: u64,
}

impl InsufficientSample {
    /// Observations needed for this parameter count.
    pub fn required(&self) -> usize {
        self.parameters * 10
    }
}

impl fmt::Display for InsufficientSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parameters need {} observations, have {}",
            self.parameters,
            self.required(),
            self.effective_n
        )
    }
}

/// Why a regression produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelFailure {
    Convergence(ConvergenceFailure),
    InsufficientSample(InsufficientSample),
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFailure::Convergence(c) => write!(
                f,
                "{} model did not converge after {} iterations: {}",
                c.model, c.iterations, c.reason
            ),
            ModelFailure::InsufficientSample(s) => s.fmt(f),
        }
    }
}

/// Tagged outcome of a regression run. Never holds a NaN-filled result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ModelOutcome {
    Converged(RegressionResult),
    Failed(ModelFailure),
}

impl ModelOutcome {
    pub fn result(&self) -> Option<&RegressionResult> {
        match self {
            ModelOutcome::Converged(r) => Some(r),
            ModelOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ModelFailure> {
        match self {
            ModelOutcome::Converged(_) => None,
            ModelOutcome::Failed(f) => Some(f),
        }
    }
}

/// Schuster test on the cyclic-code wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicityResult {
    /// Mean resultant length `R` in `[0, 1]`.
    pub resultant_vector_length: f64,
    pub p_value: f64,
    pub wheel_size: u32,
    pub event_count: u64,
    /// Mean phase in degrees, absent when the resultant vanishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_phase_degrees: Option<f64>,
    /// Events per wheel position, index 0 is code 1.
    pub position_counts: Vec<u64>,
}

/// Null distribution of delta-AIC from label-shuffled refits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationDistribution {
    pub observed_statistic: f64,
    /// Successful shuffled statistics, ordered by iteration index.
    pub null_samples: Vec<f64>,
    /// Fraction of null samples `<=` the observed statistic.
    pub empirical_p_value: f64,
    /// `(k + 1) / (n + 1)`, never exactly zero.
    pub corrected_p_value: f64,
    /// Lower tail quantile of the null samples (5% by default, the most
    /// negative tail). Absent when no null sample succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile_threshold_95: Option<f64>,
    pub iterations_requested: usize,
    /// Iterations that ran, successful or skipped.
    pub iterations_completed: usize,
    pub skipped: usize,
    pub skip_rate: f64,
    pub stopped_early: bool,
    pub inconclusive: bool,
    pub validated: bool,
    pub base_seed: u64,
}

/// Top-level outcome of a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    SignalDetected,
    NoSignal,
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::SignalDetected => write!(f, "SIGNAL_DETECTED"),
            Verdict::NoSignal => write!(f, "NO_SIGNAL"),
            Verdict::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&Verdict::SignalDetected).unwrap(),
            "\"SIGNAL_DETECTED\""
        );
        assert_eq!(Verdict::NoSignal.to_string(), "NO_SIGNAL");
    }

    #[test]
    fn model_outcome_is_tagged() {
        let outcome = ModelOutcome::Failed(ModelFailure::InsufficientSample(InsufficientSample {
            parameters: 12,
            effective_n: 0,
            days: 365,
            events: 0,
        }));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["detail"]["kind"], "insufficient_sample");
        assert!(outcome.result().is_none());
        assert!(outcome.failure().is_some());
    }

    #[test]
    fn failure_display_mentions_counts() {
        let f = ModelFailure::InsufficientSample(InsufficientSample {
            parameters: 3,
            effective_n: 20,
            days: 20,
            events: 40,
        });
        assert_eq!(f.to_string(), "3 parameters need 30 observations, have 20");
    }
}
