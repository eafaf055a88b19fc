//! Molchan error diagrams.
//!
//! Sweeping an alarm threshold over a daily predictor traces the miss rate
//! `nu` against the alarm fraction `tau`. A predictor with no skill follows
//! the diagonal `nu = 1 - tau`, so an area under the trajectory below 0.5
//! indicates skill.

use std::cmp::Ordering;

use qc_math::trapezoid_area;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MolchanPoint {
    /// Alarm when the predictor is at least this value.
    pub threshold: f64,
    /// Fraction of days under alarm.
    pub tau: f64,
    /// Fraction of events on days without an alarm.
    pub nu: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolchanCurve {
    pub feature: String,
    /// Ordered by increasing `tau`, starting at the no-alarm corner.
    pub points: Vec<MolchanPoint>,
    pub area: f64,
    pub skill: bool,
}

/// Trajectory for `predictor` against daily `events`.
pub fn molchan_curve(feature: &str, predictor: &[f64], events: &[u32]) -> MolchanCurve {
    let days = predictor.len().min(events.len());
    let total: u64 = events[..days].iter().map(|&e| e as u64).sum();

    let mut thresholds: Vec<f64> = predictor[..days].iter().copied().filter(|v| v.is_finite()).collect();
    thresholds.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    thresholds.dedup();

    let mut points = vec![MolchanPoint {
        threshold: f64::INFINITY,
        tau: 0.0,
        nu: 1.0,
    }];
    for t in thresholds {
        let mut alarm_days = 0usize;
        let mut hits = 0u64;
        for (&p, &e) in predictor.iter().zip(events).take(days) {
            if p >= t {
                alarm_days += 1;
                hits += e as u64;
            }
        }
        let tau = if days == 0 { 0.0 } else { alarm_days as f64 / days as f64 };
        let nu = if total == 0 {
            1.0
        } else {
            (total - hits) as f64 / total as f64
        };
        points.push(MolchanPoint { threshold: t, tau, nu });
    }
    points.sort_by(|a, b| a.tau.partial_cmp(&b.tau).unwrap_or(Ordering::Equal));

    let area = trapezoid_area(&points.iter().map(|p| (p.tau, p.nu)).collect::<Vec<_>>());
    MolchanCurve {
        feature: feature.to_string(),
        points,
        area,
        skill: area < 0.5,
    }
}
