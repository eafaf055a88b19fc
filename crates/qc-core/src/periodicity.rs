//! Schuster test for phase clustering on the cyclic-code wheel.
//!
//! Each mainshock is a unit phasor at angle `2π (code - 1) / N`. The mean
//! resultant length `R` is near zero for codes spread evenly and near one
//! when events pile onto a single code.

use qc_common::{Event, PeriodicityResult};
use qc_config::{DayConvention, PeriodicityConfig, SchusterScaling};
use qc_math::{wheel_phase, Resultant};
use tracing::info;

use crate::features::{cyclic_code, event_day};
use crate::logging::event_names;

#[derive(Debug, Clone)]
pub struct PeriodicityTester {
    config: PeriodicityConfig,
    day_convention: DayConvention,
}

impl PeriodicityTester {
    pub fn new(config: PeriodicityConfig, day_convention: DayConvention) -> Self {
        PeriodicityTester {
            config,
            day_convention,
        }
    }

    /// Test the mainshocks, dating each by the configured day convention.
    pub fn test(&self, mainshocks: &[&Event]) -> PeriodicityResult {
        let codes = mainshocks
            .iter()
            .map(|e| cyclic_code(event_day(e, self.day_convention)));
        let result = self.test_codes(codes);
        info!(
            target: event_names::PERIODICITY_FINISHED,
            events = result.event_count,
            r = result.resultant_vector_length,
            p = result.p_value,
            "schuster test done"
        );
        result
    }

    /// Test a sequence of codes directly.
    pub fn test_codes(&self, codes: impl IntoIterator<Item = u8>) -> PeriodicityResult {
        let n = self.config.wheel_size.max(1) as usize;
        let mut position_counts = vec![0u64; n];
        for code in codes {
            let pos = (code.max(1) as usize - 1) % n;
            position_counts[pos] += 1;
        }

        let mut resultant = Resultant::default();
        for (pos, &count) in position_counts.iter().enumerate() {
            resultant.push(wheel_phase(pos, n), count as usize);
        }
        let count = resultant.count as u64;
        let r = resultant.mean_length();
        let p_value = if count == 0 {
            1.0
        } else {
            let exponent = match self.config.scaling {
                SchusterScaling::Wheel => r * r * count as f64 / n as f64,
                SchusterScaling::Classical => r * r * count as f64,
            };
            (-exponent).exp().min(1.0)
        };

        PeriodicityResult {
            resultant_vector_length: r,
            p_value,
            wheel_size: n as u32,
            event_count: count,
            mean_phase_degrees: resultant.mean_direction().map(f64::to_degrees),
            position_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> PeriodicityTester {
        PeriodicityTester::new(PeriodicityConfig::default(), DayConvention::Utc)
    }

    #[test]
    fn no_events_gives_p_of_exactly_one() {
        let r = tester().test(&[]);
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.resultant_vector_length, 0.0);
        assert_eq!(r.event_count, 0);
        assert!(r.mean_phase_degrees.is_none());
    }

    #[test]
    fn balanced_wheel_has_no_resultant() {
        let r = tester().test_codes((1..=9).cycle().take(90));
        assert!(r.resultant_vector_length < 1e-12);
        assert!((r.p_value - 1.0).abs() < 1e-12);
        assert!(r.position_counts.iter().all(|&c| c == 10));
    }

    #[test]
    fn concentrated_codes_are_significant() {
        let codes = std::iter::repeat(5).take(80).chain((1..=9).cycle().take(18));
        let r = tester().test_codes(codes);
        assert!(r.p_value < 0.01, "p = {}", r.p_value);
        let phase = r.mean_phase_degrees.unwrap();
        assert!((phase - 160.0).abs() < 1.0, "phase {phase}");
    }

    #[test]
    fn classical_scaling_is_stricter_on_the_exponent() {
        let codes: Vec<u8> = std::iter::repeat(3).take(10).chain(1..=9).collect();
        let wheel = tester().test_codes(codes.clone());
        let classical = PeriodicityTester::new(
            PeriodicityConfig {
                scaling: SchusterScaling::Classical,
                ..PeriodicityConfig::default()
            },
            DayConvention::Utc,
        )
        .test_codes(codes);
        assert!(classical.p_value < wheel.p_value);
    }
}
