//! Permutation validation of the observed delta-AIC.
//!
//! Each iteration shuffles the daily counts with its own seed
//! (`base_seed + i`), refits both models on the fixed design and records
//! the delta-AIC. Iterations are pure, so the distribution depends only on
//! the base seed and not on the worker count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use qc_common::PermutationDistribution;
use qc_config::MonteCarloConfig;
use qc_math::quantile;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::logging::event_names;
use crate::regression::{PreparedModel, RegressionEngine, RegressionError};

/// Bookkeeping of one permutation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCounts {
    pub requested: usize,
    /// Iterations that ran, successful or skipped.
    pub completed: usize,
    pub skipped: usize,
    pub stopped_early: bool,
    pub base_seed: u64,
}

/// Reduce null samples to a [`PermutationDistribution`].
///
/// The observed statistic is validated when it lies at or below the lower
/// `tail_quantile` of the null and its empirical p-value is at most
/// `alpha`. Too many skipped refits, or none that succeeded, make the run
/// inconclusive.
pub fn summarize(
    observed: f64,
    null_samples: Vec<f64>,
    run: RunCounts,
    config: &MonteCarloConfig,
    alpha: f64,
) -> PermutationDistribution {
    let n = null_samples.len();
    let at_most = null_samples.iter().filter(|&&s| s <= observed).count();
    let (empirical, corrected) = if n == 0 {
        (1.0, 1.0)
    } else {
        (
            at_most as f64 / n as f64,
            (at_most + 1) as f64 / (n + 1) as f64,
        )
    };
    let threshold = (n > 0).then(|| quantile(&null_samples, config.tail_quantile));
    let skip_rate = if run.completed == 0 {
        0.0
    } else {
        run.skipped as f64 / run.completed as f64
    };
    let inconclusive = n == 0 || skip_rate > config.max_skip_rate;
    let validated = !inconclusive && threshold.is_some_and(|t| observed <= t) && empirical <= alpha;

    PermutationDistribution {
        observed_statistic: observed,
        null_samples,
        empirical_p_value: empirical,
        corrected_p_value: corrected,
        percentile_threshold_95: threshold,
        iterations_requested: run.requested,
        iterations_completed: run.completed,
        skipped: run.skipped,
        skip_rate,
        stopped_early: run.stopped_early,
        inconclusive,
        validated,
        base_seed: run.base_seed,
    }
}

#[derive(Debug, Clone)]
pub struct MonteCarloValidator {
    config: MonteCarloConfig,
    alpha: f64,
}

impl MonteCarloValidator {
    /// `alpha` is the significance level for the empirical p-value.
    pub fn new(config: MonteCarloConfig, alpha: f64) -> Self {
        MonteCarloValidator { config, alpha }
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    fn worker_count(&self) -> usize {
        let n = if self.config.workers == 0 {
            thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.config.workers
        };
        n.clamp(1, self.config.iterations.max(1))
    }

    /// Delta-AIC of iteration `i` on shuffled counts.
    pub fn permuted_statistic(
        &self,
        engine: &RegressionEngine,
        model: &PreparedModel,
        i: usize,
    ) -> Result<f64, RegressionError> {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
        let mut counts = model.counts().to_vec();
        counts.shuffle(&mut rng);
        engine.delta_aic(model, &counts)
    }

    /// Build the null distribution for `observed` on a prepared design.
    pub fn validate(
        &self,
        engine: &RegressionEngine,
        model: &PreparedModel,
        observed: f64,
    ) -> PermutationDistribution {
        let requested = self.config.iterations;
        let workers = self.worker_count();
        let deadline = self
            .config
            .time_budget_secs
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .map(|d| Instant::now() + d);
        let out_of_time = AtomicBool::new(false);

        info!(
            target: event_names::VALIDATE_STARTED,
            iterations = requested,
            workers,
            seed = self.config.seed,
            "permutation run started"
        );

        let mut outcomes: Vec<(usize, Option<f64>)> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let out_of_time = &out_of_time;
                    s.spawn(move || {
                        let mut local = Vec::new();
                        for i in (w..requested).step_by(workers) {
                            if deadline.is_some_and(|d| Instant::now() >= d) {
                                out_of_time.store(true, Ordering::Relaxed);
                                break;
                            }
                            let stat = match self.permuted_statistic(engine, model, i) {
                                Ok(v) => Some(v),
                                Err(e) => {
                                    debug!(
                                        target: event_names::VALIDATE_SKIPPED_FIT,
                                        iteration = i,
                                        reason = %e,
                                        "shuffled refit skipped"
                                    );
                                    None
                                }
                            };
                            local.push((i, stat));
                        }
                        local
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| {
                    h.join().unwrap_or_else(|_| {
                        error!("permutation worker panicked");
                        Vec::new()
                    })
                })
                .collect()
        });
        outcomes.sort_by_key(|(i, _)| *i);

        let stopped_early = out_of_time.load(Ordering::Relaxed);
        let completed = outcomes.len();
        let skipped = outcomes.iter().filter(|(_, s)| s.is_none()).count();
        if stopped_early {
            warn!(
                target: event_names::VALIDATE_BUDGET_EXHAUSTED,
                completed,
                requested,
                "time budget exhausted"
            );
        }
        let null_samples: Vec<f64> = outcomes.into_iter().filter_map(|(_, s)| s).collect();
        let dist = summarize(
            observed,
            null_samples,
            RunCounts {
                requested,
                completed,
                skipped,
                stopped_early,
                base_seed: self.config.seed,
            },
            &self.config,
            self.alpha,
        );
        info!(
            target: event_names::VALIDATE_FINISHED,
            completed,
            skipped,
            p = dist.empirical_p_value,
            validated = dist.validated,
            inconclusive = dist.inconclusive,
            "permutation run finished"
        );
        dist
    }
}
