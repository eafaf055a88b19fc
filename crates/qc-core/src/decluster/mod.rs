//! Window-based aftershock declustering.
//!
//! Candidates are visited from the largest magnitude down (ties: earlier
//! origin time, then event id). Each candidate not already claimed opens a
//! new cluster and claims every unclaimed event inside its space-time
//! window. Every input event receives exactly one assignment.

pub mod windows;

use std::cmp::Ordering;

use qc_common::{ClusterAssignment, ClusterId, Event};
use qc_config::DeclusterConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::geo::haversine_km;
use crate::logging::event_names;
pub use windows::{gardner_knopoff_1974, Window, WindowLookup};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Aggregate counts for the bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclusterSummary {
    pub input_events: usize,
    pub mainshocks: usize,
    pub dependent: usize,
    pub clusters: usize,
    /// Members of the largest cluster, mainshock included.
    pub largest_cluster: usize,
}

/// Assignments in input order plus their summary.
#[derive(Debug, Clone)]
pub struct Declustered {
    pub assignments: Vec<ClusterAssignment>,
    pub summary: DeclusterSummary,
}

impl Declustered {
    /// The mainshocks among `events`, which must be the same slice that was
    /// declustered. Input order is kept.
    pub fn mainshocks<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events
            .iter()
            .zip(&self.assignments)
            .filter(|(_, a)| a.is_mainshock)
            .map(|(e, _)| e)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Declusterer {
    windows: WindowLookup,
    foreshock_fraction: f64,
}

impl Declusterer {
    pub fn new(config: &DeclusterConfig) -> Self {
        Declusterer {
            windows: WindowLookup::from_config(config),
            foreshock_fraction: config.foreshock_fraction,
        }
    }

    pub fn decluster(&self, events: &[Event]) -> Declustered {
        let n = events.len();

        // time-sorted index for the window scan
        let mut by_time: Vec<usize> = (0..n).collect();
        by_time.sort_by_key(|&i| events[i].time);
        let times: Vec<i64> = by_time.iter().map(|&i| events[i].time.timestamp()).collect();

        let mut candidates: Vec<usize> = (0..n).collect();
        candidates.sort_by(|&a, &b| candidate_order(&events[a], &events[b]));

        let mut cluster_of: Vec<Option<(ClusterId, bool)>> = vec![None; n];
        let mut sizes: Vec<usize> = Vec::new();

        for &c in &candidates {
            if cluster_of[c].is_some() {
                continue;
            }
            let id = ClusterId(sizes.len() as u32);
            cluster_of[c] = Some((id, true));
            let mut size = 1;

            let main = &events[c];
            let w = self.windows.window(main.magnitude);
            let t0 = main.time.timestamp();
            let after = (w.days * SECONDS_PER_DAY).floor() as i64;
            let before = (w.days * self.foreshock_fraction * SECONDS_PER_DAY).floor() as i64;

            let lo = times.partition_point(|&t| t < t0 - before);
            let hi = times.partition_point(|&t| t <= t0 + after);
            for &j in &by_time[lo..hi] {
                if cluster_of[j].is_some() {
                    continue;
                }
                let other = &events[j];
                let d = haversine_km(main.latitude, main.longitude, other.latitude, other.longitude);
                if d <= w.distance_km {
                    cluster_of[j] = Some((id, false));
                    size += 1;
                }
            }
            sizes.push(size);
        }

        let assignments: Vec<ClusterAssignment> = events
            .iter()
            .zip(cluster_of)
            .map(|(e, slot)| {
                // every index was visited as a candidate, so slot is set
                let (cluster_id, is_mainshock) = slot.unwrap_or((ClusterId(u32::MAX), false));
                ClusterAssignment {
                    event_id: e.event_id.clone(),
                    cluster_id,
                    is_mainshock,
                }
            })
            .collect();

        let summary = DeclusterSummary {
            input_events: n,
            mainshocks: sizes.len(),
            dependent: n - sizes.len(),
            clusters: sizes.len(),
            largest_cluster: sizes.iter().copied().max().unwrap_or(0),
        };
        info!(
            target: event_names::DECLUSTER_FINISHED,
            input = summary.input_events,
            mainshocks = summary.mainshocks,
            dependent = summary.dependent,
            largest_cluster = summary.largest_cluster,
            "declustering finished"
        );
        Declustered {
            assignments,
            summary,
        }
    }
}

/// Larger magnitude first, then earlier time, then event id.
fn candidate_order(a: &Event, b: &Event) -> Ordering {
    b.magnitude
        .total_cmp(&a.magnitude)
        .then_with(|| a.time.cmp(&b.time))
        .then_with(|| a.event_id.cmp(&b.event_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use qc_common::{EventId, MagnitudeType};

    fn event(id: &str, hours: i64, lat: f64, lon: f64, mag: f64) -> Event {
        Event {
            event_id: EventId::from(id),
            time: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hours),
            latitude: lat,
            longitude: lon,
            depth_km: 10.0,
            magnitude: mag,
            magnitude_original: mag,
            magnitude_type_original: "mw".to_string(),
            magnitude_type: MagnitudeType::Mw,
        }
    }

    fn declusterer() -> Declusterer {
        Declusterer::new(&DeclusterConfig::default())
    }

    #[test]
    fn aftershock_joins_larger_mainshock() {
        // 0.045 degrees of latitude is about 5 km
        let events = vec![
            event("small", 2, 35.045, 139.0, 4.0),
            event("big", 0, 35.0, 139.0, 6.0),
        ];
        let out = declusterer().decluster(&events);
        let small = &out.assignments[0];
        let big = &out.assignments[1];
        assert!(big.is_mainshock);
        assert!(!small.is_mainshock);
        assert_eq!(small.cluster_id, big.cluster_id);
        assert_eq!(out.summary.mainshocks, 1);
        assert_eq!(out.summary.largest_cluster, 2);
    }

    #[test]
    fn earlier_event_outside_forward_window_stays_separate() {
        let events = vec![
            event("fore", 0, 35.0, 139.0, 4.0),
            event("main", 2, 35.0, 139.0, 6.0),
        ];
        let out = declusterer().decluster(&events);
        assert!(out.assignments.iter().all(|a| a.is_mainshock));

        let cfg = DeclusterConfig {
            foreshock_fraction: 0.1,
            ..DeclusterConfig::default()
        };
        let out = Declusterer::new(&cfg).decluster(&events);
        assert!(!out.assignments[0].is_mainshock);
        assert!(out.assignments[1].is_mainshock);
    }

    #[test]
    fn distant_events_are_singletons() {
        let events = vec![
            event("a", 0, 0.0, 0.0, 5.0),
            event("b", 1, 10.0, 10.0, 5.0),
            event("c", 2, -20.0, 40.0, 5.0),
        ];
        let out = declusterer().decluster(&events);
        assert_eq!(out.summary.clusters, 3);
        assert_eq!(out.summary.dependent, 0);
    }

    #[test]
    fn equal_magnitude_tie_goes_to_earlier_event() {
        let events = vec![
            event("later", 5, 0.0, 0.0, 5.0),
            event("earlier", 1, 0.0, 0.0, 5.0),
        ];
        let out = declusterer().decluster(&events);
        assert!(out.assignments[1].is_mainshock);
        assert!(!out.assignments[0].is_mainshock);
    }

    #[test]
    fn mainshocks_helper_keeps_input_order() {
        let events = vec![
            event("x", 3, 50.0, 50.0, 3.0),
            event("y", 0, 0.0, 0.0, 6.0),
            event("z", 1, 0.0, 0.01, 3.0),
        ];
        let out = declusterer().decluster(&events);
        let ids: Vec<_> = out
            .mainshocks(&events)
            .iter()
            .map(|e| e.event_id.as_str())
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn empty_catalog() {
        let out = declusterer().decluster(&[]);
        assert!(out.assignments.is_empty());
        assert_eq!(out.summary, DeclusterSummary::default());
    }
}
