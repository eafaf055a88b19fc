//! Secondary diagnostics of the strength signal against daily counts.
//!
//! These run only when the feature table carries celestial features. They
//! are descriptive and never feed the verdict.

pub mod lag;
pub mod molchan;
pub mod sea;

use qc_config::DiagnosticsConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::FeatureTable;
pub use lag::{lag_scan, lagged_correlation, LagCorrelation, LagScan};
pub use molchan::{molchan_curve, MolchanCurve, MolchanPoint};
pub use sea::{epoch_days, superposed_epoch, SuperposedEpoch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub molchan: Vec<MolchanCurve>,
    pub lag: Vec<LagScan>,
    pub superposed_epoch: SuperposedEpoch,
}

#[derive(Debug, Clone)]
pub struct DiagnosticsRunner {
    config: DiagnosticsConfig,
}

impl DiagnosticsRunner {
    pub fn new(config: DiagnosticsConfig) -> Self {
        DiagnosticsRunner { config }
    }

    /// One Molchan curve and one lag scan per body strength column, plus
    /// the superposed epoch composite. `None` when disabled or when the
    /// table has no strength features.
    pub fn run(&self, table: &FeatureTable) -> Option<Diagnostics> {
        if !self.config.enabled {
            return None;
        }
        let columns = table.celestial.as_ref().filter(|c| c.strength)?;
        let counts: Vec<u32> = table.records.iter().map(|r| r.event_count).collect();
        let counts_f: Vec<f64> = counts.iter().map(|&c| c as f64).collect();

        let mut molchan = Vec::with_capacity(columns.bodies.len());
        let mut lag = Vec::with_capacity(columns.bodies.len());
        for &body in &columns.bodies {
            let strength: Vec<f64> = table
                .records
                .iter()
                .map(|r| r.celestial.as_ref().map_or(f64::NAN, |c| c.strength[body]))
                .collect();
            let feature = format!("{body}_strength");
            molchan.push(molchan_curve(&feature, &strength, &counts));
            lag.push(lag_scan(&feature, &strength, &counts_f, self.config.max_lag_days));
        }
        let superposed_epoch = superposed_epoch(
            &table.records,
            &columns.bodies,
            self.config.sea_top_events,
            self.config.sea_window_days,
        );
        debug!(
            curves = molchan.len(),
            epochs = superposed_epoch.epochs.len(),
            "diagnostics computed"
        );
        Some(Diagnostics {
            molchan,
            lag,
            superposed_epoch,
        })
    }
}
