//! Lagged cross-correlation between a daily predictor and daily counts.

use qc_math::pearson;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagCorrelation {
    /// Positive lags pair earlier predictor values with later counts.
    pub lag: i64,
    pub r: f64,
    pub pairs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagScan {
    pub feature: String,
    pub correlations: Vec<LagCorrelation>,
    /// Lag with the largest `|r|`; earliest such lag on ties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_lag: Option<i64>,
    pub best_r: f64,
}

/// Pearson correlation of `predictor[i - lag]` with `target[i]`.
pub fn lagged_correlation(predictor: &[f64], target: &[f64], lag: i64) -> LagCorrelation {
    let n = predictor.len().min(target.len()) as i64;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..n {
        let j = i - lag;
        if (0..n).contains(&j) {
            x.push(predictor[j as usize]);
            y.push(target[i as usize]);
        }
    }
    LagCorrelation {
        lag,
        r: pearson(&x, &y),
        pairs: x.len(),
    }
}

/// Scan lags `-max_lag..=max_lag`.
pub fn lag_scan(feature: &str, predictor: &[f64], target: &[f64], max_lag: i64) -> LagScan {
    let max_lag = max_lag.abs();
    let correlations: Vec<LagCorrelation> = (-max_lag..=max_lag)
        .map(|lag| lagged_correlation(predictor, target, lag))
        .collect();
    let best = correlations
        .iter()
        .filter(|c| c.r != 0.0)
        .fold(None::<&LagCorrelation>, |best, c| match best {
            Some(b) if b.r.abs() >= c.r.abs() => Some(b),
            _ => Some(c),
        });
    LagScan {
        feature: feature.to_string(),
        best_lag: best.map(|c| c.lag),
        best_r: best.map_or(0.0, |c| c.r),
        correlations,
    }
}
