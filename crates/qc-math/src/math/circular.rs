//! Circular (angular) statistics.
//!
//! Raw degrees are not metrically continuous at 0/360, so every angle that
//! enters a model is carried as a `(sin, cos)` pair and only converted back
//! to degrees for display.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Encode an angle in degrees as `(sin θ, cos θ)`.
pub fn encode_degrees(degrees: f64) -> (f64, f64) {
    let rad = degrees.to_radians();
    (rad.sin(), rad.cos())
}

/// Decode `(sin θ, cos θ)` back to degrees in `[0, 360)`.
pub fn decode_degrees(sin: f64, cos: f64) -> f64 {
    let deg = sin.atan2(cos).to_degrees().rem_euclid(360.0);
    // rem_euclid can round a tiny negative angle up to exactly 360
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Shortest angular distance between two angles in degrees, in `[0, 180]`.
pub fn angular_distance_degrees(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Phase of position `index` (0-based) on an `n`-slot wheel, in radians.
pub fn wheel_phase(index: usize, n: usize) -> f64 {
    TAU * index as f64 / n as f64
}

/// Vector sum of unit phasors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resultant {
    pub sum_cos: f64,
    pub sum_sin: f64,
    pub count: usize,
}

impl Resultant {
    /// Accumulate phases given in radians.
    pub fn from_phases<I: IntoIterator<Item = f64>>(phases: I) -> Self {
        let mut r = Resultant::default();
        for theta in phases {
            r.push(theta, 1);
        }
        r
    }

    /// Add `weight` copies of `theta` (radians).
    pub fn push(&mut self, theta: f64, weight: usize) {
        if weight == 0 {
            return;
        }
        self.sum_cos += theta.cos() * weight as f64;
        self.sum_sin += theta.sin() * weight as f64;
        self.count += weight;
    }

    /// `|Σ e^{iθ}|`.
    pub fn length(&self) -> f64 {
        self.sum_cos.hypot(self.sum_sin)
    }

    /// `|Σ e^{iθ}| / n`, in `[0, 1]`; zero for an empty sample.
    pub fn mean_length(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.length() / self.count as f64).min(1.0)
    }

    /// Mean direction in radians `[0, 2π)`, undefined (None) when the
    /// resultant vanishes.
    pub fn mean_direction(&self) -> Option<f64> {
        if self.count == 0 || self.length() < 1e-12 {
            return None;
        }
        Some(self.sum_sin.atan2(self.sum_cos).rem_euclid(TAU))
    }
}
