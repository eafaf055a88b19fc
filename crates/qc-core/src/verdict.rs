//! Final decision and the serialized verdict bundle.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use qc_common::{
    ModelOutcome, PeriodicityResult, PermutationDistribution, RegressionResult, Result, RunId,
    StudyId, Verdict, SCHEMA_VERSION,
};
use qc_config::{ConfigSnapshot, MonteCarloConfig, VerdictConfig};
use serde::{Deserialize, Serialize};

use crate::catalog::IngestReport;
use crate::decluster::DeclusterSummary;
use crate::diagnostics::Diagnostics;
use crate::regression::design::{INTERCEPT, SEASON_COS, SEASON_SIN, TREND};

/// Every threshold the verdict was judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub delta_aic: f64,
    pub permutation_alpha: f64,
    pub tail_quantile: f64,
    pub max_skip_rate: f64,
    pub coefficient_alpha: f64,
    /// `coefficient_alpha` over the number of tested coefficients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonferroni: Option<f64>,
}

impl Thresholds {
    pub fn new(verdict: &VerdictConfig, monte_carlo: &MonteCarloConfig) -> Self {
        Thresholds {
            delta_aic: verdict.delta_aic_threshold,
            permutation_alpha: verdict.alpha,
            tail_quantile: monte_carlo.tail_quantile,
            max_skip_rate: monte_carlo.max_skip_rate,
            coefficient_alpha: verdict.coefficient_alpha,
            bonferroni: None,
        }
    }
}

/// Family-wise screening of the non-baseline coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientScreen {
    pub threshold: f64,
    pub tested: usize,
    pub passing: Vec<String>,
}

fn is_baseline(name: &str) -> bool {
    [INTERCEPT, TREND, SEASON_SIN, SEASON_COS].contains(&name)
}

/// Bonferroni screen at `alpha / tested`. `None` when nothing is tested.
pub fn bonferroni_screen(result: &RegressionResult, alpha: f64) -> Option<CoefficientScreen> {
    let tested: Vec<_> = result
        .coefficients
        .iter()
        .filter(|c| !is_baseline(&c.name))
        .collect();
    if tested.is_empty() {
        return None;
    }
    let threshold = alpha / tested.len() as f64;
    Some(CoefficientScreen {
        threshold,
        tested: tested.len(),
        passing: tested
            .iter()
            .filter(|c| c.p_value <= threshold)
            .map(|c| c.name.clone())
            .collect(),
    })
}

/// Combine the regression outcome and the permutation run.
///
/// A failed regression, or a permutation run that is missing or
/// inconclusive, is `Inconclusive`. Otherwise the signal needs both the
/// delta-AIC threshold and permutation validation.
pub fn decide(
    regression: &ModelOutcome,
    permutation: Option<&PermutationDistribution>,
    config: &VerdictConfig,
) -> Verdict {
    let Some(result) = regression.result() else {
        return Verdict::Inconclusive;
    };
    let Some(perm) = permutation.filter(|p| !p.inconclusive) else {
        return Verdict::Inconclusive;
    };
    if result.delta_aic <= config.delta_aic_threshold && perm.validated {
        Verdict::SignalDetected
    } else {
        Verdict::NoSignal
    }
}

/// The study window the regression ran over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: usize,
    pub events: u64,
    pub events_outside_window: usize,
}

/// Everything a study produced. Carries numbers, not interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictBundle {
    pub schema_version: String,
    pub study_id: StudyId,
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub ingest: IngestReport,
    pub decluster: DeclusterSummary,
    pub window: WindowSummary,
    pub regression: ModelOutcome,
    pub periodicity: PeriodicityResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permutation: Option<PermutationDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coefficient_screen: Option<CoefficientScreen>,
    pub verdict: Verdict,
    pub thresholds: Thresholds,
    pub config: ConfigSnapshot,
}

impl VerdictBundle {
    pub fn current_schema() -> &'static str {
        SCHEMA_VERSION
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
