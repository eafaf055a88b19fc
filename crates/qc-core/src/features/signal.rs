//! External celestial signal: loading, validation and daily re-indexing.
//!
//! The signal is produced elsewhere (an ephemeris service) and arrives as
//! date-indexed rows with a reading for each of the nine bodies:
//!
//! ```json
//! {"ayanamsa": "lahiri", "node_mode": "mean", "rows": [
//!   {"date": "2020-01-01", "bodies": {
//!     "sun": {"geocentric_longitude_degrees": 256.1, "strength_score_0_100": 48.0, "is_retrograde": false},
//!     ...
//!   }}
//! ]}
//! ```
//!
//! A bare array of rows (no settings header) is accepted too.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::NaiveDate;
use qc_common::{AnglePair, Body, BodyMap, CelestialFeatures, Error, Result};
use qc_config::{EphemerisSettings, NodeMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::event_names;

/// One body on one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyReading {
    #[serde(alias = "longitude")]
    pub geocentric_longitude_degrees: f64,
    #[serde(alias = "strength")]
    pub strength_score_0_100: f64,
    #[serde(default, alias = "retrograde")]
    pub is_retrograde: bool,
}

impl BodyReading {
    fn features(&self) -> (AnglePair, f64, bool) {
        let (sin, cos) = qc_math::encode_degrees(self.geocentric_longitude_degrees);
        (AnglePair { sin, cos }, self.strength_score_0_100, self.is_retrograde)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SignalRow {
    date: NaiveDate,
    bodies: HashMap<String, BodyReading>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignalDocument {
    WithSettings {
        #[serde(default)]
        ayanamsa: Option<String>,
        #[serde(default)]
        node_mode: Option<NodeMode>,
        rows: Vec<SignalRow>,
    },
    Rows(Vec<SignalRow>),
}

/// A validated per-date signal covering all nine bodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CelestialSignal {
    /// Ephemeris settings declared by the producer, when present.
    pub ayanamsa: Option<String>,
    pub node_mode: Option<NodeMode>,
    days: BTreeMap<NaiveDate, BodyMap<BodyReading>>,
}

impl CelestialSignal {
    /// Build from complete per-day readings.
    pub fn from_days(days: impl IntoIterator<Item = (NaiveDate, BodyMap<BodyReading>)>) -> Result<Self> {
        let mut signal = CelestialSignal::default();
        for (date, readings) in days {
            validate_readings(date, &readings)?;
            if signal.days.insert(date, readings).is_some() {
                return Err(Error::DataQuality {
                    row: None,
                    reason: format!("signal has two rows for {date}"),
                });
            }
        }
        Ok(signal)
    }

    /// Parse a signal document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: SignalDocument = serde_json::from_str(text)?;
        let (ayanamsa, node_mode, rows) = match doc {
            SignalDocument::WithSettings {
                ayanamsa,
                node_mode,
                rows,
            } => (ayanamsa, node_mode, rows),
            SignalDocument::Rows(rows) => (None, None, rows),
        };

        let mut days = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let mut slots: [Option<BodyReading>; Body::COUNT] = [None; Body::COUNT];
            for (name, reading) in row.bodies {
                let body = Body::parse(&name).ok_or_else(|| Error::DataQuality {
                    row: Some(index),
                    reason: format!("unknown body {name:?} on {}", row.date),
                })?;
                slots[body.index()] = Some(reading);
            }
            if let Some(missing) = Body::ALL.iter().find(|b| slots[b.index()].is_none()) {
                return Err(Error::DataQuality {
                    row: Some(index),
                    reason: format!("signal row {} has no reading for {missing}", row.date),
                });
            }
            let readings = BodyMap::from_fn(|b| {
                slots[b.index()].unwrap_or(BodyReading {
                    geocentric_longitude_degrees: 0.0,
                    strength_score_0_100: 0.0,
                    is_retrograde: false,
                })
            });
            days.push((row.date, readings));
        }

        let mut signal = Self::from_days(days)?;
        signal.ayanamsa = ayanamsa;
        signal.node_mode = node_mode;
        Ok(signal)
    }

    /// Read a signal file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&BodyMap<BodyReading>> {
        self.days.get(&date)
    }

    /// Fail when the producer declared settings that differ from the
    /// study's. Undeclared settings are accepted.
    pub fn check_settings(&self, expected: &EphemerisSettings) -> Result<()> {
        if let Some(a) = &self.ayanamsa {
            if !a.eq_ignore_ascii_case(&expected.ayanamsa) {
                return Err(Error::Features(format!(
                    "signal ayanamsa {a:?} does not match configured {:?}",
                    expected.ayanamsa
                )));
            }
        }
        if let Some(mode) = self.node_mode {
            if mode != expected.node_mode {
                return Err(Error::Features(format!(
                    "signal node mode {mode:?} does not match configured {:?}",
                    expected.node_mode
                )));
            }
        }
        Ok(())
    }

    /// One feature set per day from `start` to `end` inclusive.
    ///
    /// Missing days take the last seen value, which may predate `start`,
    /// when it is at most `max_gap_days` old. An older value, or none at or
    /// before `start`, is a [`Error::SignalGap`].
    pub fn reindex(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        max_gap_days: i64,
    ) -> Result<Vec<CelestialFeatures>> {
        let mut out = Vec::new();
        let mut last: Option<(NaiveDate, &BodyMap<BodyReading>)> =
            self.days.range(..=start).next_back().map(|(d, r)| (*d, r));
        let mut filled = 0usize;

        for date in start.iter_days().take_while(|d| *d <= end) {
            match self.days.get(&date) {
                Some(readings) => last = Some((date, readings)),
                None => {
                    let (seen, _) = last.ok_or_else(|| Error::SignalGap {
                        date: date.to_string(),
                        gap_days: self
                            .days
                            .range(date..)
                            .next()
                            .map(|(d, _)| (*d - date).num_days())
                            .unwrap_or_else(|| (end - date).num_days() + 1),
                        max_days: max_gap_days,
                    })?;
                    let gap = (date - seen).num_days();
                    if gap > max_gap_days {
                        return Err(Error::SignalGap {
                            date: date.to_string(),
                            gap_days: gap,
                            max_days: max_gap_days,
                        });
                    }
                    filled += 1;
                }
            }
            if let Some((_, readings)) = last {
                out.push(to_features(readings));
            }
        }
        if filled > 0 {
            debug!(target: event_names::ENCODE_SIGNAL_FILLED, days = filled, "signal gaps forward-filled");
        }
        Ok(out)
    }
}

fn to_features(readings: &BodyMap<BodyReading>) -> CelestialFeatures {
    let parts = readings.map(|_, r| r.features());
    CelestialFeatures {
        angles: parts.map(|_, p| p.0),
        strength: parts.map(|_, p| p.1),
        retrograde: parts.map(|_, p| p.2),
    }
}

fn validate_readings(date: NaiveDate, readings: &BodyMap<BodyReading>) -> Result<()> {
    for (body, r) in readings.iter() {
        if !r.geocentric_longitude_degrees.is_finite() {
            return Err(Error::DataQuality {
                row: None,
                reason: format!("{body} longitude on {date} is not finite"),
            });
        }
        if !(0.0..=100.0).contains(&r.strength_score_0_100) {
            return Err(Error::DataQuality {
                row: None,
                reason: format!(
                    "{body} strength {} on {date} outside [0, 100]",
                    r.strength_score_0_100
                ),
            });
        }
    }
    Ok(())
}
