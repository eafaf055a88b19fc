//! Numerically stable primitives for count-model likelihoods.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // These are published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Counts above this use the Lanczos difference instead of the exact product.
const GAMMA_RATIO_DIRECT_LIMIT: u64 = 1_000;

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Uses a Lanczos approximation with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// log(n!) using the Gamma function.
pub fn log_factorial(n: u64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    log_gamma((n as f64) + 1.0)
}

/// log Gamma(r + k) - log Gamma(r) for a non-negative integer `k`.
///
/// For small `k` this is the exact sum `ln r + ln(r+1) + ... + ln(r+k-1)`,
/// which stays accurate when `r` is huge (the near-Poisson limit of the
/// negative binomial) where the plain difference of two Lanczos values
/// cancels catastrophically.
pub fn log_gamma_ratio(r: f64, k: u64) -> f64 {
    if r.is_nan() || r <= 0.0 {
        return f64::NAN;
    }
    if k == 0 {
        return 0.0;
    }
    if k <= GAMMA_RATIO_DIRECT_LIMIT {
        let mut acc = 0.0;
        for i in 0..k {
            acc += (r + i as f64).ln();
        }
        return acc;
    }
    log_gamma(r + k as f64) - log_gamma(r)
}

/// Poisson log-probability mass at `k` with mean `mu`.
pub fn poisson_log_pmf(k: u64, mu: f64) -> f64 {
    if mu.is_nan() || mu < 0.0 {
        return f64::NAN;
    }
    if mu == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    k as f64 * mu.ln() - mu - log_factorial(k)
}

/// NB2 negative-binomial log-probability mass at `k`.
///
/// Parameterized by mean `mu` and dispersion `alpha` so that
/// `Var = mu + alpha * mu^2`. Falls back to Poisson as `alpha -> 0`.
pub fn negbin_log_pmf(k: u64, mu: f64, alpha: f64) -> f64 {
    if mu.is_nan() || alpha.is_nan() || mu < 0.0 || alpha < 0.0 {
        return f64::NAN;
    }
    if alpha == 0.0 {
        return poisson_log_pmf(k, mu);
    }
    if mu == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    let r = 1.0 / alpha;
    let kf = k as f64;
    // r ln(r / (r + mu)) = -r ln(1 + mu / r)
    log_gamma_ratio(r, k) - log_factorial(k) - r * (mu / r).ln_1p() + kf * (mu.ln() - (r + mu).ln())
}
