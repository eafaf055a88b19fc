//! Study configuration types.
//!
//! Every section defaults independently, so a partial file only overrides
//! what it names.

use chrono::NaiveDate;
use qc_common::Body;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::{ValidationError, ValidationResult};

/// Complete study configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub schema_version: String,

    pub description: Option<String>,

    pub ingest: IngestConfig,
    pub decluster: DeclusterConfig,
    pub encoder: EncoderConfig,
    pub regression: RegressionConfig,
    pub periodicity: PeriodicityConfig,
    pub monte_carlo: MonteCarloConfig,
    pub verdict: VerdictConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            ingest: IngestConfig::default(),
            decluster: DeclusterConfig::default(),
            encoder: EncoderConfig::default(),
            regression: RegressionConfig::default(),
            periodicity: PeriodicityConfig::default(),
            monte_carlo: MonteCarloConfig::default(),
            verdict: VerdictConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl StudyConfig {
    /// Parse from JSON text.
    pub fn from_json_str(text: &str) -> ValidationResult<Self> {
        serde_json::from_str(text).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> ValidationResult<Self> {
        toml::from_str(text).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Load from a file; `.toml` files are parsed as TOML, everything else
    /// as JSON.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::parse_for_path(path, &text)
    }

    pub(crate) fn parse_for_path(path: &Path, text: &str) -> ValidationResult<Self> {
        let is_toml = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_str(text)
        } else {
            Self::from_json_str(text)
        }
    }
}

/// Catalog ingestion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Batch fails when more than this fraction of rows is rejected.
    pub max_reject_fraction: f64,
    /// Rows below this homogenized magnitude are filtered (not rejected).
    pub min_magnitude: Option<f64>,
    /// Duplicate detection: maximum origin-time difference.
    pub duplicate_seconds: f64,
    /// Duplicate detection: maximum epicentral distance.
    pub duplicate_km: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_reject_fraction: 0.20,
            min_magnitude: None,
            duplicate_seconds: 2.0,
            duplicate_km: 1.0,
        }
    }
}

/// Which magnitude-dependent space-time windows to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowModel {
    /// Step lookup in [`DeclusterConfig::table`].
    #[default]
    Table,
    /// Gardner and Knopoff (1974) analytic fit.
    GardnerKnopoff1974,
}

/// One row of the window lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRow {
    pub magnitude: f64,
    pub distance_km: f64,
    pub days: f64,
}

/// Aftershock declustering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclusterConfig {
    pub window: WindowModel,
    /// Rows sorted by magnitude; lookup takes the largest row `<= M`.
    pub table: Vec<WindowRow>,
    /// Fraction of T(M) also searched before the mainshock. Zero keeps the
    /// window strictly forward in time.
    pub foreshock_fraction: f64,
}

impl Default for DeclusterConfig {
    fn default() -> Self {
        let rows = [
            (2.5, 19.5, 6.0),
            (3.0, 22.5, 11.5),
            (3.5, 26.0, 22.0),
            (4.0, 30.0, 42.0),
            (4.5, 35.0, 83.0),
            (5.0, 40.0, 155.0),
            (5.5, 47.0, 290.0),
            (6.0, 54.0, 510.0),
            (6.5, 61.0, 790.0),
            (7.0, 70.0, 915.0),
            (7.5, 81.0, 960.0),
            (8.0, 94.0, 985.0),
        ];
        Self {
            window: WindowModel::Table,
            table: rows
                .iter()
                .map(|&(magnitude, distance_km, days)| WindowRow {
                    magnitude,
                    distance_km,
                    days,
                })
                .collect(),
            foreshock_fraction: 0.0,
        }
    }
}

/// How an event's origin time maps to a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayConvention {
    /// Calendar day in UTC.
    #[default]
    Utc,
    /// Calendar day in local mean solar time at the epicenter.
    LocalSolar,
    /// Day starting at local sunrise at the epicenter.
    LocalSunrise,
}

/// Node computation mode reported by the signal producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMode {
    #[default]
    Mean,
    True,
}

/// Settings the external signal must have been produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphemerisSettings {
    pub ayanamsa: String,
    pub node_mode: NodeMode,
}

impl Default for EphemerisSettings {
    fn default() -> Self {
        Self {
            ayanamsa: "lahiri".to_string(),
            node_mode: NodeMode::Mean,
        }
    }
}

/// Feature table construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub day_convention: DayConvention,
    /// First day of the study window. Defaults to the earliest event.
    pub start: Option<NaiveDate>,
    /// Last day of the study window (inclusive). Defaults to the latest event.
    pub end: Option<NaiveDate>,
    /// Bodies whose features enter the model.
    pub bodies: Vec<Body>,
    pub include_angles: bool,
    pub include_strength: bool,
    pub include_retrograde: bool,
    /// Longest signal gap that is forward-filled.
    pub max_fill_gap_days: i64,
    pub ephemeris: EphemerisSettings,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            day_convention: DayConvention::Utc,
            start: None,
            end: None,
            bodies: Body::ALL.to_vec(),
            include_angles: true,
            include_strength: true,
            include_retrograde: true,
            max_fill_gap_days: 3,
            ephemeris: EphemerisSettings::default(),
        }
    }
}

/// Negative-binomial fitting settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Alternations between the dispersion search and IRLS.
    pub max_outer_iterations: usize,
    /// IRLS steps per alternation.
    pub max_inner_iterations: usize,
    /// Relative change in deviance that ends IRLS.
    pub tolerance: f64,
    /// Any |coefficient| above this is treated as separation.
    pub separation_threshold: f64,
    /// Minimum observations per estimated parameter.
    pub observations_per_parameter: usize,
    /// Relative norm below which a column counts as aliased.
    pub alias_tolerance: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            max_outer_iterations: 25,
            max_inner_iterations: 50,
            tolerance: 1e-8,
            separation_threshold: 30.0,
            observations_per_parameter: 10,
            alias_tolerance: 1e-8,
        }
    }
}

/// Exponent scaling of the Schuster p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchusterScaling {
    /// `p = exp(-R^2 * count / N)` for an N-position wheel.
    #[default]
    Wheel,
    /// `p = exp(-R^2 * count)`, the continuous-phase form.
    Classical,
}

/// Phase clustering test settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicityConfig {
    pub wheel_size: u32,
    pub scaling: SchusterScaling,
}

impl Default for PeriodicityConfig {
    fn default() -> Self {
        Self {
            wheel_size: 9,
            scaling: SchusterScaling::Wheel,
        }
    }
}

/// Permutation validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub enabled: bool,
    pub iterations: usize,
    pub seed: u64,
    /// Worker threads; `0` uses the available parallelism.
    pub workers: usize,
    /// Wall-clock budget in seconds; unlimited when absent.
    pub time_budget_secs: Option<f64>,
    /// Runs with more skipped iterations than this are inconclusive.
    pub max_skip_rate: f64,
    /// Tail mass defining the validation threshold.
    pub tail_quantile: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 1000,
            seed: 42,
            workers: 0,
            time_budget_secs: None,
            max_skip_rate: 0.10,
            tail_quantile: 0.05,
        }
    }
}

/// Thresholds for the final verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Full model must beat the baseline by at least this (delta AIC <= value).
    pub delta_aic_threshold: f64,
    /// Significance level for the permutation p-value.
    pub alpha: f64,
    /// Family-wise level for coefficient screening (Bonferroni-corrected).
    pub coefficient_alpha: f64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            delta_aic_threshold: -2.0,
            alpha: 0.05,
            coefficient_alpha: 0.05,
        }
    }
}

/// Secondary diagnostics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Lagged correlation runs over `-max_lag_days..=max_lag_days`.
    pub max_lag_days: i64,
    /// Superposed epoch half-window.
    pub sea_window_days: i64,
    /// Number of largest mainshock days used as epochs.
    pub sea_top_events: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_lag_days: 30,
            sea_window_days: 10,
            sea_top_events: 100,
        }
    }
}
