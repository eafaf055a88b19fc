//! Synthetic catalogs and study configs shared by the integration tests.
#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use qc_config::{EncoderConfig, MonteCarloConfig, StudyConfig};
use qc_core::catalog::{RawEntry, RawRow, RawTime};
use qc_core::features::cyclic_code;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Grid position for the `i`th synthetic event. Neighbouring positions are
/// at least one degree apart, far outside any declustering window used at
/// the synthetic magnitude.
pub fn grid_position(i: usize) -> (f64, f64) {
    let lat = -60.0 + (i % 120) as f64;
    let lon = -179.0 + 2.0 * (i / 120) as f64;
    (lat, lon)
}

/// One Mw 4.0 event at noon UTC on each date, placed on distinct grid
/// positions so declustering keeps every event as a mainshock.
pub fn spaced_rows(dates: &[NaiveDate]) -> Vec<RawEntry> {
    dates
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let (lat, lon) = grid_position(i);
            RawEntry::Row(RawRow {
                id: Some(format!("syn{i:05}")),
                time: Some(RawTime::Text(format!("{day}T12:00:00Z"))),
                latitude: Some(lat),
                longitude: Some(lon),
                depth: Some(10.0),
                magnitude: Some(4.0),
                magnitude_type: Some("mw".to_string()),
            })
        })
        .collect()
}

/// Every day from `start` for `days` days.
pub fn every_day(start: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (0..days).map(|i| start + Duration::days(i)).collect()
}

/// `n` dates drawn uniformly from the window.
pub fn uniform_dates(start: NaiveDate, days: i64, n: usize, seed: u64) -> Vec<NaiveDate> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out: Vec<NaiveDate> = (0..n)
        .map(|_| start + Duration::days(rng.random_range(0..days)))
        .collect();
    out.sort();
    out
}

/// `n` dates of which about `fraction` fall on days with cyclic code
/// `code`; the rest are uniform over the whole window.
pub fn code_biased_dates(
    start: NaiveDate,
    days: i64,
    n: usize,
    code: u8,
    fraction: f64,
    seed: u64,
) -> Vec<NaiveDate> {
    let mut rng = StdRng::seed_from_u64(seed);
    let favoured: Vec<NaiveDate> = every_day(start, days)
        .into_iter()
        .filter(|d| cyclic_code(*d) == code)
        .collect();
    let mut out: Vec<NaiveDate> = (0..n)
        .map(|_| {
            if rng.random::<f64>() < fraction {
                favoured[rng.random_range(0..favoured.len())]
            } else {
                start + Duration::days(rng.random_range(0..days))
            }
        })
        .collect();
    out.sort();
    out
}

/// Config with an explicit window, no celestial features and a small,
/// two-worker permutation run.
pub fn study_config(start: NaiveDate, days: i64, iterations: usize) -> StudyConfig {
    StudyConfig {
        encoder: EncoderConfig {
            start: Some(start),
            end: Some(start + Duration::days(days - 1)),
            ..EncoderConfig::default()
        },
        monte_carlo: MonteCarloConfig {
            iterations,
            workers: 2,
            seed: 7,
            ..MonteCarloConfig::default()
        },
        ..StudyConfig::default()
    }
}
