//! Canonical seismic events and declustering assignments.

use crate::id::{ClusterId, EventId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnitude scale family reported by the source catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeType {
    /// Moment magnitude and its variants (mw, mww, mwr, mwc, mwb). Canonical.
    Mw,
    /// Body-wave magnitude.
    Mb,
    /// Surface-wave magnitude.
    Ms,
    /// Local (Richter) magnitude.
    Ml,
    /// Duration magnitude.
    Md,
    /// Anything else, passed through unconverted.
    Unknown,
}

impl MagnitudeType {
    /// Classify a free-form catalog label such as `"mww"`, `"Mb"`, `"ml"`.
    pub fn classify(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase();
        match l.as_str() {
            "mw" | "mww" | "mwr" | "mwc" | "mwb" | "mwp" => MagnitudeType::Mw,
            "mb" | "mb_lg" | "mblg" => MagnitudeType::Mb,
            "ms" | "ms_20" | "ms20" => MagnitudeType::Ms,
            "ml" => MagnitudeType::Ml,
            "md" => MagnitudeType::Md,
            _ => MagnitudeType::Unknown,
        }
    }

    pub fn is_canonical(self) -> bool {
        self == MagnitudeType::Mw
    }
}

impl fmt::Display for MagnitudeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MagnitudeType::Mw => "mw",
            MagnitudeType::Mb => "mb",
            MagnitudeType::Ms => "ms",
            MagnitudeType::Ml => "ml",
            MagnitudeType::Md => "md",
            MagnitudeType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One earthquake after ingestion.
///
/// Created once and never mutated. `magnitude` is on the moment-magnitude
/// scale; the catalog's own value and label are kept alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier from the source catalog.
    #[serde(alias = "source_id")]
    pub event_id: EventId,

    /// Origin time, truncated to whole seconds.
    pub time: DateTime<Utc>,

    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: f64,

    /// Homogenized moment magnitude.
    pub magnitude: f64,

    /// Magnitude as reported by the catalog.
    pub magnitude_original: f64,

    /// Magnitude label as reported by the catalog, lowercased.
    pub magnitude_type_original: String,

    /// Scale family the original label was classified as.
    pub magnitude_type: MagnitudeType,
}

impl Event {
    /// Calendar day of the origin time in UTC.
    pub fn utc_date(&self) -> NaiveDate {
        self.time.date_naive()
    }
}

/// Declustering outcome for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub event_id: EventId,
    pub cluster_id: ClusterId,
    pub is_mainshock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_magnitude_labels() {
        assert_eq!(MagnitudeType::classify("mww"), MagnitudeType::Mw);
        assert_eq!(MagnitudeType::classify(" Mb "), MagnitudeType::Mb);
        assert_eq!(MagnitudeType::classify("MS"), MagnitudeType::Ms);
        assert_eq!(MagnitudeType::classify("ml"), MagnitudeType::Ml);
        assert_eq!(MagnitudeType::classify("mlg"), MagnitudeType::Unknown);
        assert!(MagnitudeType::Mw.is_canonical());
        assert!(!MagnitudeType::Md.is_canonical());
    }

    #[test]
    fn event_deserializes_source_id_alias() {
        let json = r#"{
            "source_id": "us1",
            "time": "2020-01-01T00:00:00Z",
            "latitude": 1.0, "longitude": 2.0, "depth_km": 10.0,
            "magnitude": 5.0, "magnitude_original": 5.0,
            "magnitude_type_original": "mw", "magnitude_type": "mw"
        }"#;
        let e: Event = serde_json::from_str(json).unwrap();
        assert_eq!(e.event_id, EventId::from("us1"));
        assert_eq!(e.utc_date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }
}
