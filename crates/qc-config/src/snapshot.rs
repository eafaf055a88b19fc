//! Configuration snapshots for reproducibility.
//!
//! A snapshot captures the exact configuration a study ran with, so a
//! verdict bundle can be audited and reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::ConfigPaths;
use crate::study::StudyConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the study file was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// SHA-256 of the raw file content, when loaded from a file.
    #[serde(default)]
    pub file_hash: Option<String>,

    /// SHA-256 of the canonical JSON of the effective configuration.
    pub effective_hash: String,

    /// The effective configuration after defaults were applied.
    pub effective: StudyConfig,
}

impl ConfigSnapshot {
    /// Create a new snapshot from a loaded configuration.
    pub fn new(config: &StudyConfig, paths: &ConfigPaths, raw: Option<&str>) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            path: paths.study.as_ref().map(|p| p.display().to_string()),
            source: paths.source.to_string(),
            file_hash: raw.map(hash_content),
            effective_hash: effective_hash(config),
            effective: config.clone(),
        }
    }

    /// Snapshot of an in-memory configuration that was not read from disk.
    pub fn in_memory(config: &StudyConfig) -> Self {
        Self::new(config, &ConfigPaths::default(), None)
    }

    /// Check if this snapshot describes the same effective configuration.
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.effective_hash == other.effective_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.effective_hash[..12.min(self.effective_hash.len())]
    }
}

fn effective_hash(config: &StudyConfig) -> String {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    hash_content(&canonical)
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
