//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::study::{StudyConfig, WindowRow};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 72,
            ValidationError::SemanticError(_) => 73,
            ValidationError::InvalidValue { .. } => 71,
            ValidationError::VersionMismatch { .. } => 74,
        }
    }
}

impl From<ValidationError> for qc_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                qc_common::Error::InvalidConfig { field, message }
            }
            ValidationError::IoError(msg) => qc_common::Error::Io(std::io::Error::other(msg)),
            other => qc_common::Error::Config(other.to_string()),
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn check_fraction(field: &str, value: f64, allow_zero: bool) -> ValidationResult<()> {
    let ok = value.is_finite() && value <= 1.0 && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok {
        Ok(())
    } else {
        let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        Err(invalid(field, format!("Must be in {range}, got {value}")))
    }
}

/// Validate a study configuration semantically.
pub fn validate_study(cfg: &StudyConfig) -> ValidationResult<()> {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    if major(&cfg.schema_version) != major(crate::CONFIG_SCHEMA_VERSION) {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: cfg.schema_version.clone(),
        });
    }

    // Ingest
    check_fraction("ingest.max_reject_fraction", cfg.ingest.max_reject_fraction, true)?;
    if let Some(m) = cfg.ingest.min_magnitude {
        if !(0.0..=10.0).contains(&m) {
            return Err(invalid("ingest.min_magnitude", format!("Must be in [0, 10], got {m}")));
        }
    }
    if !(cfg.ingest.duplicate_seconds >= 0.0) {
        return Err(invalid(
            "ingest.duplicate_seconds",
            format!("Must be non-negative, got {}", cfg.ingest.duplicate_seconds),
        ));
    }
    if !(cfg.ingest.duplicate_km >= 0.0) {
        return Err(invalid(
            "ingest.duplicate_km",
            format!("Must be non-negative, got {}", cfg.ingest.duplicate_km),
        ));
    }

    // Decluster
    validate_window_table(&cfg.decluster.table)?;
    check_fraction("decluster.foreshock_fraction", cfg.decluster.foreshock_fraction, true)?;

    // Encoder
    if let (Some(start), Some(end)) = (cfg.encoder.start, cfg.encoder.end) {
        if end < start {
            return Err(ValidationError::SemanticError(format!(
                "encoder.end ({end}) is before encoder.start ({start})"
            )));
        }
    }
    let any_celestial =
        cfg.encoder.include_angles || cfg.encoder.include_strength || cfg.encoder.include_retrograde;
    if any_celestial && cfg.encoder.bodies.is_empty() {
        return Err(ValidationError::SemanticError(
            "encoder.bodies is empty but celestial features are enabled".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for body in &cfg.encoder.bodies {
        if !seen.insert(*body) {
            return Err(invalid("encoder.bodies", format!("Duplicate body {body}")));
        }
    }
    if cfg.encoder.max_fill_gap_days < 0 {
        return Err(invalid(
            "encoder.max_fill_gap_days",
            format!("Must be non-negative, got {}", cfg.encoder.max_fill_gap_days),
        ));
    }

    // Regression
    let r = &cfg.regression;
    if r.max_outer_iterations == 0 || r.max_inner_iterations == 0 {
        return Err(invalid(
            "regression.max_*_iterations",
            "Iteration bounds must be at least 1".to_string(),
        ));
    }
    if !(r.tolerance > 0.0 && r.tolerance < 1.0) {
        return Err(invalid("regression.tolerance", format!("Must be in (0, 1), got {}", r.tolerance)));
    }
    if !(r.separation_threshold > 0.0) {
        return Err(invalid(
            "regression.separation_threshold",
            format!("Must be positive, got {}", r.separation_threshold),
        ));
    }
    if r.observations_per_parameter == 0 {
        return Err(invalid(
            "regression.observations_per_parameter",
            "Must be at least 1".to_string(),
        ));
    }
    if !(r.alias_tolerance > 0.0 && r.alias_tolerance < 1.0) {
        return Err(invalid(
            "regression.alias_tolerance",
            format!("Must be in (0, 1), got {}", r.alias_tolerance),
        ));
    }

    // Periodicity
    if cfg.periodicity.wheel_size < 2 {
        return Err(invalid(
            "periodicity.wheel_size",
            format!("Must be at least 2, got {}", cfg.periodicity.wheel_size),
        ));
    }

    // Monte Carlo
    let mc = &cfg.monte_carlo;
    if mc.enabled && mc.iterations == 0 {
        return Err(invalid("monte_carlo.iterations", "Must be at least 1 when enabled".to_string()));
    }
    check_fraction("monte_carlo.max_skip_rate", mc.max_skip_rate, true)?;
    check_fraction("monte_carlo.tail_quantile", mc.tail_quantile, false)?;
    if let Some(budget) = mc.time_budget_secs {
        if !(budget > 0.0) {
            return Err(invalid(
                "monte_carlo.time_budget_secs",
                format!("Must be positive, got {budget}"),
            ));
        }
    }

    // Verdict
    if !cfg.verdict.delta_aic_threshold.is_finite() || cfg.verdict.delta_aic_threshold > 0.0 {
        return Err(invalid(
            "verdict.delta_aic_threshold",
            format!("Must be finite and <= 0, got {}", cfg.verdict.delta_aic_threshold),
        ));
    }
    check_fraction("verdict.alpha", cfg.verdict.alpha, false)?;
    check_fraction("verdict.coefficient_alpha", cfg.verdict.coefficient_alpha, false)?;

    // Diagnostics
    let d = &cfg.diagnostics;
    if d.max_lag_days < 0 || d.sea_window_days < 0 {
        return Err(invalid(
            "diagnostics",
            "Lag and epoch windows must be non-negative".to_string(),
        ));
    }

    Ok(())
}

/// Window rows must be non-empty, strictly increasing in magnitude, and
/// non-decreasing in both distance and duration.
fn validate_window_table(rows: &[WindowRow]) -> ValidationResult<()> {
    if rows.is_empty() {
        return Err(invalid("decluster.table", "Must have at least one row".to_string()));
    }
    for (i, row) in rows.iter().enumerate() {
        if !(row.distance_km > 0.0 && row.days > 0.0 && row.magnitude.is_finite()) {
            return Err(invalid(
                &format!("decluster.table[{i}]"),
                format!(
                    "Distance and days must be positive (M={}, km={}, days={})",
                    row.magnitude, row.distance_km, row.days
                ),
            ));
        }
    }
    for (i, pair) in rows.windows(2).enumerate() {
        let (a, b) = (&pair[0], &pair[1]);
        if b.magnitude <= a.magnitude {
            return Err(ValidationError::SemanticError(format!(
                "decluster.table magnitudes must increase strictly (row {} has {} after {})",
                i + 1,
                b.magnitude,
                a.magnitude
            )));
        }
        if b.distance_km < a.distance_km || b.days < a.days {
            return Err(ValidationError::SemanticError(format!(
                "decluster.table windows must not shrink with magnitude (row {})",
                i + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_study(&StudyConfig::default()).unwrap();
    }

    #[test]
    fn rejects_reject_fraction_above_one() {
        let mut cfg = StudyConfig::default();
        cfg.ingest.max_reject_fraction = 1.5;
        let err = validate_study(&cfg).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "ingest.max_reject_fraction"));
        assert_eq!(err.code(), 71);
    }

    #[test]
    fn rejects_shrinking_window_table() {
        let mut cfg = StudyConfig::default();
        cfg.decluster.table[3].days = 1.0;
        assert!(matches!(
            validate_study(&cfg),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn rejects_empty_bodies_with_celestial_features() {
        let mut cfg = StudyConfig::default();
        cfg.encoder.bodies.clear();
        assert!(validate_study(&cfg).is_err());

        cfg.encoder.include_angles = false;
        cfg.encoder.include_strength = false;
        cfg.encoder.include_retrograde = false;
        validate_study(&cfg).unwrap();
    }

    #[test]
    fn rejects_positive_delta_aic_threshold() {
        let mut cfg = StudyConfig::default();
        cfg.verdict.delta_aic_threshold = 1.0;
        assert!(validate_study(&cfg).is_err());
    }

    #[test]
    fn rejects_major_version_mismatch() {
        let cfg = StudyConfig {
            schema_version: "2.0.0".to_string(),
            ..StudyConfig::default()
        };
        assert!(matches!(
            validate_study(&cfg),
            Err(ValidationError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn converts_into_unified_error() {
        let err: qc_common::Error = invalid("x", "bad".to_string()).into();
        assert_eq!(err.code(), 71);
    }
}
