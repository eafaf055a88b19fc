//! Configuration resolution and path discovery.
//!
//! Resolution order: explicit path → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

use crate::snapshot::ConfigSnapshot;
use crate::study::StudyConfig;
use crate::validate::{validate_study, ValidationError, ValidationResult};

/// Discovered configuration file path.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Path to the study file (or None if not found).
    pub study: Option<PathBuf>,

    /// Source of the study config (for diagnostics).
    pub source: ConfigSource,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit => write!(f, "explicit path"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_STUDY_PATH: &str = "QUAKE_CYCLES_CONFIG";
pub const ENV_CONFIG_DIR: &str = "QUAKE_CYCLES_CONFIG_DIR";

/// Standard config file names, in lookup order.
const STUDY_FILENAMES: [&str; 2] = ["study.json", "study.toml"];

/// Application name for XDG directories.
const APP_NAME: &str = "quake-cycles";

/// Resolve the study configuration path.
///
/// 1. Explicit path (if it exists)
/// 2. `QUAKE_CYCLES_CONFIG` (direct path)
/// 3. `QUAKE_CYCLES_CONFIG_DIR` + `study.json` / `study.toml`
/// 4. XDG config directory (`~/.config/quake-cycles/`)
/// 5. Built-in defaults (None)
pub fn resolve_config(explicit: Option<&Path>) -> ConfigPaths {
    if let Some(path) = explicit {
        if path.exists() {
            return found(path.to_path_buf(), ConfigSource::Explicit);
        }
    }

    if let Ok(env_path) = std::env::var(ENV_STUDY_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        if let Some(path) = first_existing(&PathBuf::from(config_dir)) {
            return found(path, ConfigSource::Environment);
        }
    }

    if let Some(dir) = xdg_config_dir() {
        if let Some(path) = first_existing(&dir) {
            return found(path, ConfigSource::XdgConfig);
        }
    }

    ConfigPaths::default()
}

fn found(path: PathBuf, source: ConfigSource) -> ConfigPaths {
    ConfigPaths {
        study: Some(path),
        source,
    }
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    STUDY_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Get the XDG config directory for quake-cycles.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// A resolved, parsed and validated study configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: StudyConfig,
    pub paths: ConfigPaths,
    pub snapshot: ConfigSnapshot,
}

/// Resolve, load and validate the study configuration.
///
/// An explicit path that does not exist is an error rather than a silent
/// fall-through to defaults.
pub fn load_study_config(explicit: Option<&Path>) -> ValidationResult<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ValidationError::IoError(format!(
                "{}: no such file",
                path.display()
            )));
        }
    }

    let paths = resolve_config(explicit);
    let (config, raw) = match &paths.study {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
            (StudyConfig::parse_for_path(path, &text)?, Some(text))
        }
        None => (StudyConfig::default(), None),
    };
    validate_study(&config)?;

    let snapshot = ConfigSnapshot::new(&config, &paths, raw.as_deref());
    Ok(LoadedConfig {
        config,
        paths,
        snapshot,
    })
}
