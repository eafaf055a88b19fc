//! Superposed epoch analysis around the busiest mainshock days.

use std::collections::BTreeMap;

use qc_common::{Body, DailyFeatureRecord};
use serde::{Deserialize, Serialize};

/// Composite of daily features aligned on epoch days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperposedEpoch {
    /// Day offsets relative to the epoch, `-window..=window`.
    pub offsets: Vec<i64>,
    /// Days contributing at each offset.
    pub samples: Vec<usize>,
    pub mean_cyclic_code: Vec<Option<f64>>,
    /// Mean strength score per body, only for bodies with a signal.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mean_strength: BTreeMap<Body, Vec<Option<f64>>>,
    /// Indices into the records of the epoch days, busiest first.
    pub epochs: Vec<usize>,
}

/// Up to `top` days with the most events, ties broken by the earlier day.
pub fn epoch_days(records: &[DailyFeatureRecord], top: usize) -> Vec<usize> {
    let mut days: Vec<usize> = (0..records.len())
        .filter(|&i| records[i].event_count > 0)
        .collect();
    days.sort_by(|&a, &b| {
        records[b]
            .event_count
            .cmp(&records[a].event_count)
            .then(a.cmp(&b))
    });
    days.truncate(top);
    days
}

fn rows_at<'a>(
    records: &'a [DailyFeatureRecord],
    epochs: &'a [usize],
    offset: i64,
) -> impl Iterator<Item = &'a DailyFeatureRecord> + 'a {
    let len = records.len() as i64;
    epochs
        .iter()
        .map(move |&e| e as i64 + offset)
        .filter(move |i| (0..len).contains(i))
        .map(move |i| &records[i as usize])
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Composite over `top` epochs with half-window `window` days.
pub fn superposed_epoch(
    records: &[DailyFeatureRecord],
    bodies: &[Body],
    top: usize,
    window: i64,
) -> SuperposedEpoch {
    let window = window.abs();
    let epochs = epoch_days(records, top);
    let offsets: Vec<i64> = (-window..=window).collect();
    let samples = offsets.iter().map(|&o| rows_at(records, &epochs, o).count()).collect();
    let mean_cyclic_code = offsets
        .iter()
        .map(|&o| average(rows_at(records, &epochs, o).map(|r| r.cyclic_code as f64)))
        .collect();

    let mut mean_strength = BTreeMap::new();
    let has_signal = !records.is_empty() && records.iter().all(|r| r.celestial.is_some());
    if has_signal {
        for &body in bodies {
            let series = offsets
                .iter()
                .map(|&o| {
                    average(
                        rows_at(records, &epochs, o)
                            .filter_map(|r| r.celestial.as_ref())
                            .map(|c| c.strength[body]),
                    )
                })
                .collect();
            mean_strength.insert(body, series);
        }
    }

    SuperposedEpoch {
        offsets,
        samples,
        mean_cyclic_code,
        mean_strength,
        epochs,
    }
}
