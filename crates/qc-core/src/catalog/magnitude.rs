//! Magnitude homogenization to moment magnitude.
//!
//! Empirical conversions (Scordilis 2006 style regressions):
//!
//! | source | range            | Mw                 |
//! |--------|------------------|--------------------|
//! | mb     | `mb <= 6.0`      | `mb`               |
//! | mb     | `mb > 6.0`       | `0.85 mb + 1.03`   |
//! | Ms     | `Ms < 3.0`       | `Ms`               |
//! | Ms     | `3.0..=6.1`      | `0.67 Ms + 2.07`   |
//! | Ms     | `Ms > 6.1`       | `0.99 Ms + 0.08`   |
//!
//! The Ms rule is kept piecewise as published. It is discontinuous at
//! `Ms = 3.0`, where Mw steps from 3.0 up to 4.08; values just below and at
//! the boundary land about one unit apart.
//!
//! ML, Md and unrecognized labels pass through unchanged. That is an
//! assumption, not a calibration: regional ML-Mw relations vary too much to
//! pick one globally.

use qc_common::MagnitudeType;

/// Convert a catalog magnitude to Mw.
pub fn to_moment_magnitude(value: f64, kind: MagnitudeType) -> f64 {
    match kind {
        MagnitudeType::Mw => value,
        MagnitudeType::Mb => {
            if value > 6.0 {
                0.85 * value + 1.03
            } else {
                value
            }
        }
        MagnitudeType::Ms => {
            if value > 6.1 {
                0.99 * value + 0.08
            } else if value >= 3.0 {
                0.67 * value + 2.07
            } else {
                value
            }
        }
        MagnitudeType::Ml | MagnitudeType::Md | MagnitudeType::Unknown => value,
    }
}

/// True when [`to_moment_magnitude`] changes the value for this type and
/// magnitude.
pub fn is_converted(value: f64, kind: MagnitudeType) -> bool {
    to_moment_magnitude(value, kind) != value
}
