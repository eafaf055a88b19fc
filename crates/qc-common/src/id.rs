//! Event, cluster, study and run identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a seismic event, as supplied by the source catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

/// Cluster number assigned by the declusterer.
///
/// Clusters are numbered densely from 0 in the order their mainshocks are
/// selected (largest magnitude first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClusterId {
    fn from(id: u32) -> Self {
        ClusterId(id)
    }
}

/// Study ID labelling one verdict bundle.
///
/// Format: `qc-YYYYMMDD-HHMMSS-XXXX`
/// Example: `qc-20260115-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyId(pub String);

impl StudyId {
    /// Generate a new study ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        StudyId(format!(
            "qc-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            generate_base32_suffix()
        ))
    }

    /// Parse an existing study ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 23 {
            return None;
        }
        let bytes = s.as_bytes();
        if !s.starts_with("qc-") || bytes.get(11) != Some(&b'-') || bytes.get(18) != Some(&b'-') {
            return None;
        }
        let date = &s[3..11];
        let time = &s[12..18];
        let suffix = &s[19..23];
        if !date.chars().all(|c| c.is_ascii_digit()) || !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')) {
            return None;
        }
        Some(StudyId(s.to_string()))
    }
}

impl Default for StudyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-process run identifier attached to log events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// `run-` followed by the first 12 hex digits of a v4 UUID.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!("run-{}", &uuid[..12]))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn generate_base32_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut value = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
    value &= 0x000F_FFFF;
    let alphabet = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut out = String::with_capacity(4);
    for shift in [15_u32, 10, 5, 0] {
        let idx = ((value >> shift) & 0x1F) as usize;
        out.push(alphabet[idx] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn study_id_round_trips_through_parse() {
        let id = StudyId::new();
        assert!(id.0.starts_with("qc-"));
        assert_eq!(id.0.len(), 23);
        assert_eq!(StudyId::parse(&id.0), Some(id));
    }

    #[test]
    fn study_id_parse_rejects_garbage() {
        assert!(StudyId::parse("qc-2026011-143022-a7xq").is_none());
        assert!(StudyId::parse("pt-20260115-143022-a7xq").is_none());
        assert!(StudyId::parse("qc-20260115-143022-A7XQ").is_none());
    }

    #[test]
    fn run_id_shape() {
        let id = RunId::new();
        assert!(id.0.starts_with("run-"));
        assert_eq!(id.0.len(), 16);
    }

    #[test]
    fn cluster_id_display() {
        assert_eq!(ClusterId(7).to_string(), "c7");
        assert_eq!(EventId::from("us7000abcd").to_string(), "us7000abcd");
    }
}
