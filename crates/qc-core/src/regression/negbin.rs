//! NB2 negative-binomial and Poisson fitting by IRLS.
//!
//! For a fixed dispersion `alpha` the coefficients are found by iteratively
//! reweighted least squares with weights `mu / (1 + alpha * mu)`. The
//! dispersion is profiled by a golden-section search on `ln(alpha)` with the
//! means held fixed, and the two steps alternate until the joint
//! log-likelihood stops moving. Every loop is bounded.

use qc_common::IterationRecord;
use qc_config::RegressionConfig;
use qc_math::{negbin_log_pmf, Cholesky, Matrix};

/// Dispersion search interval on the log scale: `[1e-6, 100]`.
pub const LN_ALPHA_MIN: f64 = -13.815_510_557_964_274;
pub const LN_ALPHA_MAX: f64 = 4.605_170_185_988_092;

const INV_GOLDEN: f64 = 0.618_033_988_749_894_9;
const ALPHA_SEARCH_WIDTH: f64 = 1e-5;

/// Iteration limits and thresholds for one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSettings {
    pub max_outer_iterations: usize,
    pub max_inner_iterations: usize,
    pub tolerance: f64,
    pub separation_threshold: f64,
}

impl From<&RegressionConfig> for FitSettings {
    fn from(cfg: &RegressionConfig) -> Self {
        FitSettings {
            max_outer_iterations: cfg.max_outer_iterations,
            max_inner_iterations: cfg.max_inner_iterations,
            tolerance: cfg.tolerance,
            separation_threshold: cfg.separation_threshold,
        }
    }
}

impl Default for FitSettings {
    fn default() -> Self {
        FitSettings::from(&RegressionConfig::default())
    }
}

/// A converged fit. `alpha` is zero for Poisson.
#[derive(Debug, Clone)]
pub struct GlmFit {
    pub beta: Vec<f64>,
    pub alpha: f64,
    pub log_likelihood: f64,
    /// IRLS steps over all alternations.
    pub iterations: usize,
    pub log: Vec<IterationRecord>,
}

/// A fit that gave up, with what it saw on the way.
#[derive(Debug, Clone)]
pub struct FitFailure {
    pub reason: String,
    pub iterations: usize,
    pub log: Vec<IterationRecord>,
}

impl FitFailure {
    fn new(reason: impl Into<String>, iterations: usize, log: Vec<IterationRecord>) -> Self {
        FitFailure {
            reason: reason.into(),
            iterations,
            log,
        }
    }
}

/// Fitted means `exp(X beta + offset)`.
///
/// Fails on overflow or underflow to zero, both symptoms of separation.
pub fn fitted_means(x: &Matrix, beta: &[f64], offset: &[f64]) -> Result<Vec<f64>, String> {
    let eta = x.mul_vec(beta).map_err(|e| e.to_string())?;
    eta.iter()
        .zip(offset)
        .map(|(e, o)| {
            let mu = (e + o).exp();
            if mu.is_finite() && mu > 0.0 {
                Ok(mu)
            } else {
                Err(format!("fitted mean {mu} out of range (separation)"))
            }
        })
        .collect()
}

/// Joint log-likelihood. `alpha == 0` is Poisson.
pub fn log_likelihood(y: &[u64], mu: &[f64], alpha: f64) -> f64 {
    y.iter().zip(mu).map(|(&k, &m)| negbin_log_pmf(k, m, alpha)).sum()
}

/// Maximize the log-likelihood over `alpha` with `mu` held fixed.
pub fn profile_alpha(y: &[u64], mu: &[f64]) -> f64 {
    let f = |ln_alpha: f64| log_likelihood(y, mu, ln_alpha.exp());
    let (mut a, mut b) = (LN_ALPHA_MIN, LN_ALPHA_MAX);
    let mut c = b - INV_GOLDEN * (b - a);
    let mut d = a + INV_GOLDEN * (b - a);
    let (mut fc, mut fd) = (f(c), f(d));
    while b - a > ALPHA_SEARCH_WIDTH {
        if fc >= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN * (b - a);
            fd = f(d);
        }
    }
    (0.5 * (a + b)).exp()
}

/// Starting point: intercept at the log mean rate, everything else zero.
/// Column 0 must be the intercept.
fn initial_beta(x: &Matrix, y: &[u64], offset: &[f64]) -> Result<Vec<f64>, String> {
    let total: f64 = y.iter().map(|&k| k as f64).sum();
    if total <= 0.0 {
        return Err("all counts are zero".to_string());
    }
    let exposure: f64 = offset.iter().map(|o| o.exp()).sum();
    let mut beta = vec![0.0; x.cols()];
    if let Some(b0) = beta.first_mut() {
        *b0 = (total / exposure).ln();
    }
    Ok(beta)
}

fn max_abs(beta: &[f64]) -> f64 {
    beta.iter().fold(0.0_f64, |m, b| m.max(b.abs()))
}

/// IRLS at fixed `alpha`. Returns the coefficients, step count and
/// log-likelihood.
fn irls(
    x: &Matrix,
    y: &[u64],
    offset: &[f64],
    alpha: f64,
    mut beta: Vec<f64>,
    settings: &FitSettings,
) -> Result<(Vec<f64>, usize, f64), String> {
    let mut mu = fitted_means(x, &beta, offset)?;
    let mut ll_old = log_likelihood(y, &mu, alpha);

    for step in 1..=settings.max_inner_iterations {
        let mut weights = Vec::with_capacity(mu.len());
        let mut z = Vec::with_capacity(mu.len());
        for ((&m, &k), &o) in mu.iter().zip(y).zip(offset) {
            let eta = m.ln();
            weights.push(m / (1.0 + alpha * m));
            z.push(eta - o + (k as f64 - m) / m);
        }
        let (xtwx, xtwz) = x
            .weighted_normal_equations(&weights, &z)
            .map_err(|e| e.to_string())?;
        let next = Cholesky::decompose(&xtwx)
            .and_then(|chol| chol.solve(&xtwz))
            .map_err(|e| format!("weighted normal equations: {e}"))?;

        if next.iter().any(|b| !b.is_finite()) {
            return Err("non-finite coefficient".to_string());
        }
        let biggest = max_abs(&next);
        if biggest > settings.separation_threshold {
            return Err(format!(
                "coefficient magnitude {biggest:.1} exceeds {} (separation)",
                settings.separation_threshold
            ));
        }

        mu = fitted_means(x, &next, offset)?;
        let ll = log_likelihood(y, &mu, alpha);
        if !ll.is_finite() {
            return Err("non-finite log-likelihood".to_string());
        }
        beta = next;
        if (ll - ll_old).abs() <= settings.tolerance * (ll.abs() + 1.0) {
            return Ok((beta, step, ll));
        }
        ll_old = ll;
    }
    Err(format!(
        "IRLS did not converge in {} steps",
        settings.max_inner_iterations
    ))
}

/// Poisson regression (the `alpha -> 0` limit), optionally warm-started.
pub fn fit_poisson(
    x: &Matrix,
    y: &[u64],
    offset: &[f64],
    start: Option<&[f64]>,
    settings: &FitSettings,
) -> Result<GlmFit, FitFailure> {
    let beta = match start {
        Some(b) if b.len() == x.cols() => b.to_vec(),
        _ => initial_beta(x, y, offset).map_err(|r| FitFailure::new(r, 0, Vec::new()))?,
    };
    let (beta, steps, ll) =
        irls(x, y, offset, 0.0, beta, settings).map_err(|r| FitFailure::new(r, 0, Vec::new()))?;
    let log = vec![IterationRecord {
        outer: 0,
        inner: steps,
        alpha: 0.0,
        log_likelihood: ll,
        max_abs_coefficient: max_abs(&beta),
    }];
    Ok(GlmFit {
        beta,
        alpha: 0.0,
        log_likelihood: ll,
        iterations: steps,
        log,
    })
}

/// NB2 regression with profiled dispersion.
pub fn fit_negative_binomial(
    x: &Matrix,
    y: &[u64],
    offset: &[f64],
    settings: &FitSettings,
) -> Result<GlmFit, FitFailure> {
    if y.len() != x.rows() || offset.len() != x.rows() {
        return Err(FitFailure::new(
            format!("{} rows but {} counts", x.rows(), y.len()),
            0,
            Vec::new(),
        ));
    }
    let mut log = Vec::new();
    let mut iterations = 0;
    let mut beta = initial_beta(x, y, offset).map_err(|r| FitFailure::new(r, 0, Vec::new()))?;
    let mut alpha = 1.0;
    let mut ll_prev = f64::NEG_INFINITY;

    for outer in 0..settings.max_outer_iterations {
        let (next, steps, _) = match irls(x, y, offset, alpha, beta, settings) {
            Ok(v) => v,
            Err(reason) => return Err(FitFailure::new(reason, iterations, log)),
        };
        beta = next;
        iterations += steps;

        let mu = fitted_means(x, &beta, offset).map_err(|r| FitFailure::new(r, iterations, log.clone()))?;
        alpha = profile_alpha(y, &mu);
        let ll = log_likelihood(y, &mu, alpha);
        log.push(IterationRecord {
            outer,
            inner: steps,
            alpha,
            log_likelihood: ll,
            max_abs_coefficient: max_abs(&beta),
        });
        if !ll.is_finite() {
            return Err(FitFailure::new("non-finite log-likelihood", iterations, log));
        }
        if (ll - ll_prev).abs() <= settings.tolerance * (ll.abs() + 1.0) {
            return Ok(GlmFit {
                beta,
                alpha,
                log_likelihood: ll,
                iterations,
                log,
            });
        }
        ll_prev = ll;
    }
    Err(FitFailure::new(
        format!(
            "dispersion search did not settle after {} alternations",
            settings.max_outer_iterations
        ),
        iterations,
        log,
    ))
}

/// Coefficient covariance `(X^T W X)^-1` at the fitted means.
pub fn covariance(x: &Matrix, mu: &[f64], alpha: f64) -> Result<Matrix, String> {
    let weights: Vec<f64> = mu.iter().map(|m| m / (1.0 + alpha * m)).collect();
    let zeros = vec![0.0; mu.len()];
    let (info, _) = x
        .weighted_normal_equations(&weights, &zeros)
        .map_err(|e| e.to_string())?;
    Cholesky::decompose(&info)
        .and_then(|c| c.inverse())
        .map_err(|e| format!("information matrix: {e}"))
}
