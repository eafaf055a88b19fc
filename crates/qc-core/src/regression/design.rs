//! Design matrix construction from the daily feature table.
//!
//! Column order is fixed: intercept, the three baseline terms, the eight
//! cyclic-code indicators (code 1 is the reference level), then celestial
//! columns per body. Aliasing is resolved left to right, so the intercept
//! and baseline terms are never the ones dropped.

use std::f64::consts::TAU;

use chrono::Datelike;
use qc_common::AnglePair;
use qc_math::Matrix;

use super::RegressionError;
use crate::features::FeatureTable;

pub const INTERCEPT: &str = "intercept";
pub const TREND: &str = "trend_years";
pub const SEASON_SIN: &str = "season_sin";
pub const SEASON_COS: &str = "season_cos";

/// Intercept plus the three baseline terms.
pub const BASELINE_COLUMNS: usize = 4;

const DAYS_PER_YEAR: f64 = 365.25;

/// Name of the indicator column for a cyclic code.
pub fn code_column(code: u8) -> String {
    format!("cyclic_code={code}")
}

/// Dense design for one feature table, before alias removal.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Matrix,
    pub names: Vec<String>,
    /// `ln(exposure_days)` per row.
    pub offset: Vec<f64>,
    pub counts: Vec<u64>,
}

impl DesignMatrix {
    pub fn rows(&self) -> usize {
        self.x.rows()
    }

    /// Columns holding only 0/1 values.
    pub fn indicator_columns(&self) -> Vec<usize> {
        (0..self.x.cols())
            .filter(|&c| {
                (0..self.x.rows()).all(|r| {
                    let v = self.x.get(r, c);
                    v == 0.0 || v == 1.0
                })
            })
            .collect()
    }
}

/// Build the full design for `table`.
pub fn build_design(table: &FeatureTable) -> Result<DesignMatrix, RegressionError> {
    let mut names: Vec<String> = vec![
        INTERCEPT.to_string(),
        TREND.to_string(),
        SEASON_SIN.to_string(),
        SEASON_COS.to_string(),
    ];
    names.extend((2..=9).map(code_column));
    if let Some(cols) = &table.celestial {
        for body in &cols.bodies {
            if cols.angles {
                names.push(format!("{body}_sin"));
                names.push(format!("{body}_cos"));
            }
            if cols.strength {
                names.push(format!("{body}_strength"));
            }
            if cols.retrograde {
                names.push(format!("{body}_retrograde"));
            }
        }
    }

    let p = names.len();
    let n = table.records.len();
    let mut data = Vec::with_capacity(n * p);
    let mut offset = Vec::with_capacity(n);
    let mut counts = Vec::with_capacity(n);

    for rec in &table.records {
        if !(rec.exposure_days.is_finite() && rec.exposure_days > 0.0) {
            return Err(RegressionError::Design(format!(
                "exposure on {} must be positive, got {}",
                rec.date, rec.exposure_days
            )));
        }
        let years = (rec.date - table.start).num_days() as f64 / DAYS_PER_YEAR;
        let season = TAU * rec.date.ordinal() as f64 / DAYS_PER_YEAR;
        data.extend([1.0, years, season.sin(), season.cos()]);
        data.extend((2..=9u8).map(|k| if rec.cyclic_code == k { 1.0 } else { 0.0 }));

        if let Some(cols) = &table.celestial {
            let features = rec.celestial.as_ref().ok_or_else(|| {
                RegressionError::Design(format!("no celestial features on {}", rec.date))
            })?;
            for &body in &cols.bodies {
                if cols.angles {
                    let AnglePair { sin, cos } = features.angles[body];
                    data.extend([sin, cos]);
                }
                if cols.strength {
                    data.push(features.strength[body] / 100.0);
                }
                if cols.retrograde {
                    data.push(if features.retrograde[body] { 1.0 } else { 0.0 });
                }
            }
        }

        offset.push(rec.exposure_days.ln());
        counts.push(rec.event_count as u64);
    }

    let x = Matrix::from_rows(n, p, data).map_err(|e| RegressionError::Design(e.to_string()))?;
    Ok(DesignMatrix {
        x,
        names,
        offset,
        counts,
    })
}
