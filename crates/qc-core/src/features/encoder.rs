//! Daily feature table construction.

use std::collections::HashMap;

use chrono::NaiveDate;
use qc_common::{Body, DailyFeatureRecord, Error, Event, Result};
use qc_config::{DayConvention, EncoderConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::calendar::event_day;
use super::numerology::{cyclic_code, master_number};
use super::signal::CelestialSignal;
use crate::logging::event_names;

/// Which celestial columns the regression should build from the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialColumns {
    pub bodies: Vec<Body>,
    pub angles: bool,
    pub strength: bool,
    pub retrograde: bool,
}

impl CelestialColumns {
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() || !(self.angles || self.strength || self.retrograde)
    }
}

/// One record per calendar day of the study window, zero-event days
/// included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub records: Vec<DailyFeatureRecord>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_convention: DayConvention,
    /// Present when every record carries celestial features.
    pub celestial: Option<CelestialColumns>,
    /// Mainshocks dated outside `start..=end`, not counted in any record.
    pub events_outside_window: usize,
}

impl FeatureTable {
    pub fn days(&self) -> usize {
        self.records.len()
    }

    /// True when `day` falls inside `start..=end`.
    pub fn covers(&self, day: NaiveDate) -> bool {
        (self.start..=self.end).contains(&day)
    }

    pub fn total_events(&self) -> u64 {
        self.records.iter().map(|r| r.event_count as u64).sum()
    }

    /// Copy with the event counts replaced, keeping every feature column.
    /// `counts` must have one value per record.
    pub fn with_counts(&self, counts: &[u32]) -> Result<FeatureTable> {
        if counts.len() != self.records.len() {
            return Err(Error::Features(format!(
                "expected {} counts, got {}",
                self.records.len(),
                counts.len()
            )));
        }
        let mut table = self.clone();
        for (rec, &c) in table.records.iter_mut().zip(counts) {
            rec.event_count = c;
        }
        Ok(table)
    }
}

/// Builds the feature table. Holds its configuration by value.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        FeatureEncoder { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Day of each mainshock under the configured convention.
    pub fn event_days(&self, mainshocks: &[&Event]) -> Vec<NaiveDate> {
        mainshocks
            .iter()
            .map(|e| event_day(e, self.config.day_convention))
            .collect()
    }

    /// Build the table from mainshocks and an optional celestial signal.
    ///
    /// The window defaults to the first and last event day. With no events
    /// and no explicit window the table is undefined and this fails with
    /// [`Error::StudyWindow`].
    pub fn encode(&self, mainshocks: &[&Event], signal: Option<&CelestialSignal>) -> Result<FeatureTable> {
        let days = self.event_days(mainshocks);
        let start = self
            .config
            .start
            .or_else(|| days.iter().min().copied())
            .ok_or_else(|| Error::StudyWindow("no events and no explicit start date".to_string()))?;
        let end = self
            .config
            .end
            .or_else(|| days.iter().max().copied())
            .ok_or_else(|| Error::StudyWindow("no events and no explicit end date".to_string()))?;
        if end < start {
            return Err(Error::StudyWindow(format!("end {end} is before start {start}")));
        }

        let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
        let mut outside = 0usize;
        for day in days {
            if day < start || day > end {
                outside += 1;
            } else {
                *counts.entry(day).or_insert(0) += 1;
            }
        }

        let columns = CelestialColumns {
            bodies: self.config.bodies.clone(),
            angles: self.config.include_angles,
            strength: self.config.include_strength,
            retrograde: self.config.include_retrograde,
        };
        let celestial = match signal {
            Some(sig) if !columns.is_empty() => {
                sig.check_settings(&self.config.ephemeris)?;
                Some(sig.reindex(start, end, self.config.max_fill_gap_days)?)
            }
            _ => None,
        };

        let mut records = Vec::new();
        let mut celestial_iter = celestial.map(|v| v.into_iter());
        for date in start.iter_days().take_while(|d| *d <= end) {
            let mut rec = DailyFeatureRecord::new(
                date,
                cyclic_code(date),
                counts.get(&date).copied().unwrap_or(0),
            );
            rec.master_number = master_number(date);
            rec.celestial = celestial_iter.as_mut().and_then(|it| it.next());
            records.push(rec);
        }

        let has_celestial = !records.is_empty() && records.iter().all(|r| r.celestial.is_some());
        let table = FeatureTable {
            records,
            start,
            end,
            day_convention: self.config.day_convention,
            celestial: has_celestial.then_some(columns),
            events_outside_window: outside,
        };
        info!(
            target: event_names::ENCODE_FINISHED,
            days = table.days(),
            events = table.total_events(),
            outside_window = outside,
            celestial = has_celestial,
            "feature table built"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::signal::BodyReading;
    use chrono::{TimeZone, Utc};
    use qc_common::{BodyMap, EventId, MagnitudeType, CYCLIC_CODES};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(id: &str, y: i32, m: u32, day: u32, hour: u32) -> Event {
        Event {
            event_id: EventId::from(id),
            time: Utc.with_ymd_and_hms(y, m, day, hour, 0, 0).unwrap(),
            latitude: 0.0,
            longitude: 150.0,
            depth_km: 10.0,
            magnitude: 5.0,
            magnitude_original: 5.0,
            magnitude_type_original: "mw".into(),
            magnitude_type: MagnitudeType::Mw,
        }
    }

    fn window(start: NaiveDate, end: NaiveDate) -> EncoderConfig {
        EncoderConfig {
            start: Some(start),
            end: Some(end),
            ..EncoderConfig::default()
        }
    }

    #[test]
    fn covers_every_day_including_empty_ones() {
        let e = [event("a", 2020, 1, 3, 12), event("b", 2020, 1, 3, 13)];
        let refs: Vec<&Event> = e.iter().collect();
        let table = FeatureEncoder::new(window(d(2020, 1, 1), d(2020, 1, 10)))
            .encode(&refs, None)
            .unwrap();
        assert_eq!(table.days(), 10);
        assert_eq!(table.records[2].event_count, 2);
        assert_eq!(table.total_events(), 2);
        assert!(table.records.iter().all(|r| CYCLIC_CODES.contains(&r.cyclic_code)));
        assert!(table.celestial.is_none());
    }

    #[test]
    fn window_defaults_to_event_span() {
        let e = [event("a", 2020, 1, 3, 0), event("b", 2020, 1, 7, 0)];
        let refs: Vec<&Event> = e.iter().collect();
        let table = FeatureEncoder::new(EncoderConfig::default()).encode(&refs, None).unwrap();
        assert_eq!(table.start, d(2020, 1, 3));
        assert_eq!(table.end, d(2020, 1, 7));
    }

    #[test]
    fn no_events_and_no_window_is_an_error() {
        let err = FeatureEncoder::new(EncoderConfig::default()).encode(&[], None).unwrap_err();
        assert!(matches!(err, Error::StudyWindow(_)));
    }

    #[test]
    fn day_convention_moves_late_events() {
        // 150E is UTC+10h: 20:00 UTC on Jan 3 is Jan 4 local
        let e = [event("a", 2020, 1, 3, 20)];
        let refs: Vec<&Event> = e.iter().collect();
        let mut cfg = window(d(2020, 1, 1), d(2020, 1, 5));
        cfg.day_convention = DayConvention::LocalSolar;
        let table = FeatureEncoder::new(cfg).encode(&refs, None).unwrap();
        assert_eq!(table.records[3].event_count, 1);
    }

    #[test]
    fn events_outside_window_are_counted() {
        let e = [event("a", 2019, 12, 31, 0), event("b", 2020, 1, 2, 0)];
        let refs: Vec<&Event> = e.iter().collect();
        let table = FeatureEncoder::new(window(d(2020, 1, 1), d(2020, 1, 3)))
            .encode(&refs, None)
            .unwrap();
        assert!(!table.covers(d(2019, 12, 31)));
        assert!(table.covers(d(2020, 1, 1)) && table.covers(d(2020, 1, 3)));
        assert!(!table.covers(d(2020, 1, 4)));
        assert_eq!(table.events_outside_window, 1);
        assert_eq!(table.total_events(), 1);
    }

    #[test]
    fn celestial_features_are_attached() {
        let readings = BodyMap::from_fn(|b| BodyReading {
            geocentric_longitude_degrees: 90.0,
            strength_score_0_100: 10.0 * b.index() as f64,
            is_retrograde: false,
        });
        let signal =
            CelestialSignal::from_days((1..=3).map(|day| (d(2020, 1, day), readings))).unwrap();
        let table = FeatureEncoder::new(window(d(2020, 1, 1), d(2020, 1, 3)))
            .encode(&[], Some(&signal))
            .unwrap();
        let cols = table.celestial.as_ref().unwrap();
        assert_eq!(cols.bodies.len(), 9);
        let c = table.records[1].celestial.as_ref().unwrap();
        assert!((c.angles[Body::Sun].sin - 1.0).abs() < 1e-12);
        assert_eq!(c.strength[Body::Saturn], 60.0);
    }

    #[test]
    fn with_counts_replaces_only_counts() {
        let table = FeatureEncoder::new(window(d(2020, 1, 1), d(2020, 1, 3)))
            .encode(&[], None)
            .unwrap();
        let shuffled = table.with_counts(&[3, 0, 1]).unwrap();
        assert_eq!(shuffled.total_events(), 4);
        assert_eq!(shuffled.records[0].cyclic_code, table.records[0].cyclic_code);
        assert!(table.with_counts(&[1]).is_err());
    }
}
