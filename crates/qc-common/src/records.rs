//! Per-day feature records.

use crate::body::BodyMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Valid values of the cyclic numerology code.
pub const CYCLIC_CODES: RangeInclusive<u8> = 1..=9;

/// A trigonometric angle encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnglePair {
    pub sin: f64,
    pub cos: f64,
}

/// Celestial signal values for one day, complete over all nine bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialFeatures {
    /// Geocentric longitude encoded as (sin, cos).
    pub angles: BodyMap<AnglePair>,
    /// Strength score in `[0, 100]`.
    pub strength: BodyMap<f64>,
    pub retrograde: BodyMap<bool>,
}

/// One row of the regression table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFeatureRecord {
    pub date: NaiveDate,
    /// Reduced digit sum of the date, always in `1..=9`.
    pub cyclic_code: u8,
    /// 11, 22 or 33 when the reduction passes through a master number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_number: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celestial: Option<CelestialFeatures>,
    /// Mainshocks dated to this day.
    pub event_count: u32,
    /// Observation window length in days; enters the model as `ln(exposure)`.
    #[serde(default = "default_exposure")]
    pub exposure_days: f64,
}

fn default_exposure() -> f64 {
    1.0
}

impl DailyFeatureRecord {
    /// A record with no celestial features and unit exposure.
    pub fn new(date: NaiveDate, cyclic_code: u8, event_count: u32) -> Self {
        DailyFeatureRecord {
            date,
            cyclic_code,
            master_number: None,
            celestial: None,
            event_count,
            exposure_days: 1.0,
        }
    }
}
