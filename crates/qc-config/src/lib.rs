//! Quake Cycles study configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for a study configuration (study.json / study.toml)
//! - Config resolution (explicit path → env → XDG → defaults)
//! - Semantic validation with stable error codes
//! - Config snapshots recorded in every verdict bundle

pub mod resolve;
pub mod snapshot;
pub mod study;
pub mod validate;

pub use resolve::{load_study_config, resolve_config, ConfigPaths, ConfigSource, LoadedConfig};
pub use snapshot::ConfigSnapshot;
pub use study::{
    DayConvention, DeclusterConfig, DiagnosticsConfig, EncoderConfig, EphemerisSettings,
    IngestConfig, MonteCarloConfig, NodeMode, PeriodicityConfig, RegressionConfig,
    SchusterScaling, StudyConfig, VerdictConfig, WindowModel, WindowRow,
};
pub use validate::{validate_study, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
