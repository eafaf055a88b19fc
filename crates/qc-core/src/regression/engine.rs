//! Full-versus-baseline model comparison.

use qc_common::{Coefficient, InsufficientSample, ModelOutcome, RegressionResult};
use qc_config::RegressionConfig;
use qc_math::{chi_square_sf, independent_columns, normal_two_sided_p, Matrix};
use tracing::{debug, info, warn};

use super::design::{build_design, code_column, BASELINE_COLUMNS};
use super::negbin::{covariance, fit_negative_binomial, fit_poisson, fitted_means, FitSettings, GlmFit};
use super::RegressionError;
use crate::features::FeatureTable;
use crate::logging::event_names;

/// A design with aliased columns removed and the sample-size rule checked.
///
/// Holding this fixed and swapping only the counts is how permutation
/// refits reuse one design.
#[derive(Debug, Clone)]
pub struct PreparedModel {
    full: Matrix,
    full_names: Vec<String>,
    baseline: Matrix,
    baseline_names: Vec<String>,
    offset: Vec<f64>,
    counts: Vec<u64>,
    aliased: Vec<String>,
    /// Full-design columns holding only 0/1 values.
    indicators: Vec<usize>,
    /// Rows on the reference cyclic code (no code indicator set).
    reference_rows: Vec<bool>,
}

impl PreparedModel {
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn days(&self) -> usize {
        self.counts.len()
    }

    pub fn full_names(&self) -> &[String] {
        &self.full_names
    }

    pub fn baseline_names(&self) -> &[String] {
        &self.baseline_names
    }

    /// Full-model columns that are not part of the baseline.
    pub fn tested_names(&self) -> &[String] {
        &self.full_names[self.baseline_names.len()..]
    }

    pub fn aliased(&self) -> &[String] {
        &self.aliased
    }

    /// Estimated parameters of the full model, alpha included.
    pub fn parameters(&self) -> usize {
        self.full_names.len() + 1
    }
}

fn aic(fit: &GlmFit, columns: usize) -> f64 {
    2.0 * (columns + 1) as f64 - 2.0 * fit.log_likelihood
}

#[derive(Debug, Clone)]
pub struct RegressionEngine {
    config: RegressionConfig,
    settings: FitSettings,
}

impl RegressionEngine {
    pub fn new(config: RegressionConfig) -> Self {
        let settings = FitSettings::from(&config);
        RegressionEngine { config, settings }
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Build the design, drop aliased columns and apply the
    /// observations-per-parameter rule with `N = min(days, events)`.
    pub fn prepare(&self, table: &FeatureTable) -> Result<PreparedModel, RegressionError> {
        let design = build_design(table)?;
        let keep = independent_columns(&design.x, self.config.alias_tolerance);
        let aliased: Vec<String> = design
            .names
            .iter()
            .enumerate()
            .filter(|(i, _)| !keep.contains(i))
            .map(|(_, n)| n.clone())
            .collect();
        if !aliased.is_empty() {
            debug!(target: event_names::REGRESS_ALIASED, columns = ?aliased, "dropped aliased columns");
        }

        let base_keep: Vec<usize> = keep.iter().copied().filter(|&c| c < BASELINE_COLUMNS).collect();
        let full = design.x.select_columns(&keep);
        let baseline = design.x.select_columns(&base_keep);
        let full_names: Vec<String> = keep.iter().map(|&c| design.names[c].clone()).collect();
        let baseline_names: Vec<String> = base_keep.iter().map(|&c| design.names[c].clone()).collect();

        let days = design.rows();
        let events: u64 = design.counts.iter().sum();
        let effective_n = days.min(events as usize);
        let parameters = full_names.len() + 1;
        if parameters * self.config.observations_per_parameter > effective_n {
            return Err(RegressionError::InsufficientSample(InsufficientSample {
                parameters,
                effective_n,
                days,
                events,
            }));
        }

        let design_indicators = design.indicator_columns();
        let indicators = keep
            .iter()
            .enumerate()
            .filter(|(_, c)| design_indicators.contains(c))
            .map(|(kept, _)| kept)
            .collect();
        let code_cols: Vec<usize> = (0..full.cols())
            .filter(|&c| full_names[c].starts_with("cyclic_code="))
            .collect();
        let reference_rows = (0..full.rows())
            .map(|r| code_cols.iter().all(|&c| full.get(r, c) == 0.0))
            .collect();

        Ok(PreparedModel {
            full,
            full_names,
            baseline,
            baseline_names,
            offset: design.offset,
            counts: design.counts,
            aliased,
            indicators,
            reference_rows,
        })
    }

    /// An indicator whose on-days or off-days carry no events has no finite
    /// maximum-likelihood estimate.
    fn check_support(&self, model: &PreparedModel, counts: &[u64]) -> Result<(), RegressionError> {
        for &c in &model.indicators {
            let (mut on_days, mut on, mut off) = (0usize, 0u64, 0u64);
            for (r, &k) in counts.iter().enumerate() {
                if model.full.get(r, c) == 1.0 {
                    on_days += 1;
                    on += k;
                } else {
                    off += k;
                }
            }
            if on_days == 0 || on_days == counts.len() {
                continue;
            }
            if on == 0 || off == 0 {
                let side = if on == 0 { "with" } else { "without" };
                return Err(RegressionError::numerical(
                    "full",
                    format!("separation: no events on days {side} {}", model.full_names[c]),
                ));
            }
        }
        let reference_days = model.reference_rows.iter().filter(|&&r| r).count();
        if reference_days > 0 && reference_days < counts.len() {
            let on_reference: u64 = counts
                .iter()
                .zip(&model.reference_rows)
                .filter(|(_, &r)| r)
                .map(|(&k, _)| k)
                .sum();
            if on_reference == 0 {
                return Err(RegressionError::numerical(
                    "full",
                    format!("separation: no events on days with {}", code_column(1)),
                ));
            }
        }
        Ok(())
    }

    fn fit_pair(&self, model: &PreparedModel, counts: &[u64]) -> Result<(GlmFit, GlmFit), RegressionError> {
        if counts.len() != model.days() {
            return Err(RegressionError::Design(format!(
                "{} counts for {} days",
                counts.len(),
                model.days()
            )));
        }
        self.check_support(model, counts)?;
        let full = fit_negative_binomial(&model.full, counts, &model.offset, &self.settings)
            .map_err(|f| RegressionError::convergence("full", f))?;
        let baseline = fit_negative_binomial(&model.baseline, counts, &model.offset, &self.settings)
            .map_err(|f| RegressionError::convergence("baseline", f))?;
        Ok((full, baseline))
    }

    /// `AIC(full) - AIC(baseline)` for `counts` on the prepared design.
    pub fn delta_aic(&self, model: &PreparedModel, counts: &[u64]) -> Result<f64, RegressionError> {
        let (full, baseline) = self.fit_pair(model, counts)?;
        Ok(aic(&full, model.full.cols()) - aic(&baseline, model.baseline.cols()))
    }

    /// Fit both models on the prepared counts and compute Wald statistics,
    /// the dispersion check and information criteria.
    pub fn fit_prepared(&self, model: &PreparedModel) -> Result<RegressionResult, RegressionError> {
        let counts = model.counts();
        let (full, baseline) = self.fit_pair(model, counts)?;
        for rec in &full.log {
            debug!(
                target: event_names::REGRESS_ITERATION,
                outer = rec.outer,
                inner = rec.inner,
                alpha = rec.alpha,
                log_likelihood = rec.log_likelihood,
                "full model alternation"
            );
        }

        let mu = fitted_means(&model.full, &full.beta, &model.offset)
            .map_err(|r| RegressionError::numerical("full", r))?;
        let cov = covariance(&model.full, &mu, full.alpha).map_err(|r| RegressionError::numerical("full", r))?;

        let mut coefficients = Vec::with_capacity(full.beta.len());
        for (i, (&estimate, name)) in full.beta.iter().zip(&model.full_names).enumerate() {
            let var = cov.get(i, i);
            if !(var.is_finite() && var > 0.0) {
                return Err(RegressionError::numerical(
                    "full",
                    format!("variance of {name} is {var}"),
                ));
            }
            let std_error = var.sqrt();
            let z = estimate / std_error;
            coefficients.push(Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                z,
                p_value: normal_two_sided_p(z),
            });
        }

        let poisson = fit_poisson(&model.full, counts, &model.offset, Some(&full.beta), &self.settings)
            .map_err(|f| RegressionError::convergence("poisson", f))?;
        let lr = (2.0 * (full.log_likelihood - poisson.log_likelihood)).max(0.0);
        // boundary of the parameter space: half chi-square(1) mixture
        let lr_p = if lr > 0.0 { 0.5 * chi_square_sf(lr, 1.0) } else { 1.0 };

        let n = model.days();
        let k = model.parameters();
        let full_aic = aic(&full, model.full.cols());
        let baseline_aic = aic(&baseline, model.baseline.cols());

        Ok(RegressionResult {
            coefficients,
            log_likelihood: full.log_likelihood,
            aic: full_aic,
            bic: k as f64 * (n as f64).ln() - 2.0 * full.log_likelihood,
            converged: true,
            baseline_log_likelihood: baseline.log_likelihood,
            baseline_aic,
            delta_aic: full_aic - baseline_aic,
            dispersion_alpha: full.alpha,
            dispersion_lr_statistic: lr,
            dispersion_lr_p_value: lr_p,
            iterations: full.iterations,
            n_observations: n,
            n_parameters: k,
            aliased_features: model.aliased.clone(),
        })
    }

    /// Prepare and fit. Modeling failures come back as
    /// [`ModelOutcome::Failed`]; only unusable input is an error.
    pub fn fit(&self, table: &FeatureTable) -> Result<(ModelOutcome, Option<PreparedModel>), RegressionError> {
        let prepared = match self.prepare(table) {
            Ok(p) => p,
            Err(e) => return Self::failed(e, None),
        };
        match self.fit_prepared(&prepared) {
            Ok(result) => {
                info!(
                    target: event_names::REGRESS_FINISHED,
                    delta_aic = result.delta_aic,
                    alpha = result.dispersion_alpha,
                    parameters = result.n_parameters,
                    aliased = result.aliased_features.len(),
                    "regression converged"
                );
                Ok((ModelOutcome::Converged(result), Some(prepared)))
            }
            Err(e) => Self::failed(e, Some(prepared)),
        }
    }

    fn failed(
        err: RegressionError,
        prepared: Option<PreparedModel>,
    ) -> Result<(ModelOutcome, Option<PreparedModel>), RegressionError> {
        match err.model_failure() {
            Some(failure) => {
                warn!(target: event_names::REGRESS_FAILED, reason = %failure, "regression failed");
                Ok((ModelOutcome::Failed(failure), prepared))
            }
            None => Err(err),
        }
    }
}
