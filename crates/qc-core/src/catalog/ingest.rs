//! Row normalization, validity checks and duplicate removal.

use std::collections::BTreeMap;

use qc_common::{Error, Event, EventId, MagnitudeType, Result};
use qc_config::IngestConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::magnitude::{is_converted, to_moment_magnitude};
use super::raw::{RawEntry, RawRow};
use crate::geo::haversine_km;
use crate::logging::event_names;

/// A row the ingestor dropped, with its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

/// Counts of what happened to every input row.
///
/// `total_rows == accepted + rejected + duplicates + filtered`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub duplicates: usize,
    /// Valid rows below the configured minimum magnitude.
    pub filtered: usize,
    /// Accepted rows whose magnitude was converted to Mw.
    pub converted: usize,
    pub reject_fraction: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<RowRejection>,
}

/// Events that survived ingestion, in input order.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub events: Vec<Event>,
    pub report: IngestReport,
}

/// Normalizes raw rows into canonical events.
#[derive(Debug, Clone)]
pub struct CatalogIngestor {
    config: IngestConfig,
}

impl CatalogIngestor {
    pub fn new(config: IngestConfig) -> Self {
        CatalogIngestor { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Normalize one row.
    ///
    /// Fails with [`Error::DataQuality`] for a missing field, an unparseable
    /// time or an out-of-range value.
    pub fn normalize_row(&self, index: usize, row: &RawRow) -> Result<Event> {
        let bad = |reason: String| Error::DataQuality {
            row: Some(index),
            reason,
        };

        let time = row
            .time
            .as_ref()
            .ok_or_else(|| bad("missing time".to_string()))?
            .to_utc()
            .map_err(bad)?;
        let latitude = row.latitude.ok_or_else(|| bad("missing latitude".to_string()))?;
        let longitude = row.longitude.ok_or_else(|| bad("missing longitude".to_string()))?;
        let depth_km = row.depth.ok_or_else(|| bad("missing depth".to_string()))?;
        let raw_mag = row.magnitude.ok_or_else(|| bad("missing magnitude".to_string()))?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(bad(format!("latitude {latitude} outside [-90, 90]")));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(bad(format!("longitude {longitude} outside [-180, 180]")));
        }
        if !depth_km.is_finite() {
            return Err(bad(format!("non-finite depth {depth_km}")));
        }
        if !(0.0..=10.0).contains(&raw_mag) {
            return Err(bad(format!("magnitude {raw_mag} outside [0, 10]")));
        }

        let label = row
            .magnitude_type
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let kind = MagnitudeType::classify(&label);
        let magnitude = to_moment_magnitude(raw_mag, kind);
        if !(0.0..=10.0).contains(&magnitude) {
            return Err(bad(format!(
                "homogenized magnitude {magnitude:.2} ({label} {raw_mag}) outside [0, 10]"
            )));
        }

        let event_id = row
            .id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(EventId::from)
            .unwrap_or_else(|| EventId::new(format!("row-{index}")));

        Ok(Event {
            event_id,
            time,
            latitude,
            longitude,
            depth_km,
            magnitude,
            magnitude_original: raw_mag,
            magnitude_type_original: label,
            magnitude_type: kind,
        })
    }

    /// Ingest a batch.
    ///
    /// Bad rows are dropped and logged; the batch fails with
    /// [`Error::BatchIngestion`] only when the rejected fraction exceeds
    /// `max_reject_fraction`. Duplicates keep the first occurrence.
    pub fn ingest(&self, entries: impl IntoIterator<Item = RawEntry>) -> Result<IngestOutcome> {
        let mut report = IngestReport::default();
        let mut events: Vec<Event> = Vec::new();
        // accepted events bucketed by origin second, for the duplicate scan
        let mut by_second: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        let window_secs = self.config.duplicate_seconds;
        let reach = window_secs.ceil() as i64;

        for (index, entry) in entries.into_iter().enumerate() {
            report.total_rows += 1;

            let normalized = match entry {
                RawEntry::Row(row) => self.normalize_row(index, &row),
                RawEntry::Malformed(reason) => Err(Error::DataQuality {
                    row: Some(index),
                    reason: format!("malformed row: {reason}"),
                }),
            };
            let event = match normalized {
                Ok(e) => e,
                Err(err) => {
                    let reason = match err {
                        Error::DataQuality { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!(target: event_names::INGEST_ROW_DROPPED, row = index, reason = %reason, "row dropped");
                    report.rejected += 1;
                    report.rejections.push(RowRejection { row: index, reason });
                    continue;
                }
            };

            if let Some(min) = self.config.min_magnitude {
                if event.magnitude < min {
                    report.filtered += 1;
                    continue;
                }
            }

            let t = event.time.timestamp();
            let duplicate_of = by_second
                .range(t - reach..=t + reach)
                .flat_map(|(_, idxs)| idxs.iter().copied())
                .find(|&i| {
                    let other = &events[i];
                    let dt = (other.time.timestamp() - t).abs() as f64;
                    dt <= window_secs
                        && haversine_km(
                            event.latitude,
                            event.longitude,
                            other.latitude,
                            other.longitude,
                        ) <= self.config.duplicate_km
                });
            if let Some(first) = duplicate_of {
                debug!(
                    target: event_names::INGEST_DUPLICATE,
                    row = index,
                    kept = %events[first].event_id,
                    "duplicate row skipped"
                );
                report.duplicates += 1;
                continue;
            }

            if is_converted(event.magnitude_original, event.magnitude_type) {
                report.converted += 1;
            }
            by_second.entry(t).or_default().push(events.len());
            events.push(event);
        }

        report.accepted = events.len();
        report.reject_fraction = if report.total_rows == 0 {
            0.0
        } else {
            report.rejected as f64 / report.total_rows as f64
        };

        if report.reject_fraction > self.config.max_reject_fraction {
            return Err(Error::BatchIngestion {
                rejected: report.rejected,
                total: report.total_rows,
                threshold: self.config.max_reject_fraction,
            });
        }

        info!(
            target: event_names::INGEST_FINISHED,
            total = report.total_rows,
            accepted = report.accepted,
            rejected = report.rejected,
            duplicates = report.duplicates,
            filtered = report.filtered,
            "catalog ingested"
        );
        Ok(IngestOutcome { events, report })
    }
}
