//! Batch experiments: many independent runs swept over message length or
//! loss probability, reduced to `(x, mean rounds)` series.
//!
//! Runs share nothing, so trials of one sweep point are spread over scoped
//! threads. With a seed, every trial gets its own generator derived from
//! `(seed, point, trial)`, so results do not depend on the worker count.

use crate::engine::simulate;
use crate::random::RngSource;
use serde::Serialize;
use snw_lab_abstract::{LengthSweep, LossSection, LossSweep, Probability, ResolvedPlan, SimError};

pub use snw_lab_abstract::probability_range;
use std::num::NonZeroUsize;
use std::thread;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSeries {
    pub name: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<SeriesPoint>,
}

pub fn mean_rounds(rounds: &[u64]) -> f64 {
    if rounds.is_empty() {
        return 0.0;
    }
    rounds.iter().sum::<u64>() as f64 / rounds.len() as f64
}

// splitmix64 finalizer; spreads consecutive indices across the seed space.
fn derive_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

// Seed stream and axis label of each loss sweep.
fn loss_series(section: LossSection) -> (u64, &'static str, &'static str) {
    match section {
        LossSection::FrameLoss => (2, "frame_loss", "P1"),
        LossSection::MatchedLoss => (3, "matched_loss", "P"),
    }
}

pub struct SweepRunner {
    seed: Option<u64>,
    workers: usize,
}

impl SweepRunner {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            workers: default_workers(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    fn stream_seed(&self, experiment: u64, point: usize) -> Option<u64> {
        self.seed
            .map(|base| derive_seed(derive_seed(base, experiment), point as u64))
    }

    /// Run `trials` independent simulations and return their round counts in
    /// trial order.
    pub fn run_trials<T: Clone + PartialEq + Sync>(
        &self,
        data: &[T],
        frame_loss: Probability,
        ack_loss: Probability,
        trials: usize,
        seed: Option<u64>,
    ) -> Result<Vec<u64>, SimError> {
        if trials == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.clamp(1, trials);
        let chunk = trials.div_ceil(workers);

        let run_one = |trial: usize| -> Result<u64, SimError> {
            let mut rng = RngSource::from_seed_option(seed.map(|s| derive_seed(s, trial as u64)));
            simulate(data, frame_loss, ack_loss, &mut rng).map(|outcome| outcome.rounds)
        };

        let batches: Vec<Result<Vec<u64>, SimError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..trials)
                .step_by(chunk)
                .map(|first| {
                    let last = (first + chunk).min(trials);
                    let run_one = &run_one;
                    scope.spawn(move || {
                        (first..last)
                            .map(run_one)
                            .collect::<Result<Vec<u64>, SimError>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        let mut rounds = Vec::with_capacity(trials);
        for batch in batches {
            rounds.extend(batch?);
        }
        Ok(rounds)
    }

    /// Rounds needed per message length, one run per length.
    pub fn message_length(&self, sweep: &LengthSweep) -> Result<ExperimentSeries, SimError> {
        sweep.validate()?;
        let frame_loss = Probability::new("length_sweep.frame_loss", sweep.frame_loss)?;
        let ack_loss = Probability::new("length_sweep.ack_loss", sweep.ack_loss)?;

        let mut points = Vec::new();
        for (idx, len) in sweep.lengths().enumerate() {
            let data: Vec<u64> = (0..len as u64).collect();
            let rounds =
                self.run_trials(&data, frame_loss, ack_loss, 1, self.stream_seed(1, idx))?;
            points.push(SeriesPoint {
                x: len as f64,
                y: mean_rounds(&rounds),
            });
        }
        info!("Message length sweep done ({} points)", points.len());

        Ok(ExperimentSeries {
            name: "message_length".into(),
            x_label: "Message length".into(),
            y_label: "Iterations".into(),
            points,
        })
    }

    /// Mean rounds per loss probability. The ACK loss follows the swept value
    /// unless the sweep fixes it. The whole range is checked before any
    /// trial runs.
    pub fn loss(
        &self,
        section: LossSection,
        sweep: &LossSweep,
    ) -> Result<ExperimentSeries, SimError> {
        sweep.validate(section)?;
        let (experiment, name, x_label) = loss_series(section);
        let data: Vec<u64> = (0..sweep.message_len as u64).collect();

        let mut points = Vec::new();
        for (idx, p) in sweep.points().into_iter().enumerate() {
            info!("{name}: p = {p:.2}");
            let frame_loss = Probability::new("frame_loss", p)?;
            let ack_loss = Probability::new("ack_loss", sweep.fixed_ack_loss.unwrap_or(p))?;
            let rounds = self.run_trials(
                &data,
                frame_loss,
                ack_loss,
                sweep.trials,
                self.stream_seed(experiment, idx),
            )?;
            points.push(SeriesPoint {
                x: p,
                y: mean_rounds(&rounds),
            });
        }
        info!("{name} sweep done ({} points)", points.len());

        Ok(ExperimentSeries {
            name: name.to_string(),
            x_label: x_label.into(),
            y_label: format!("Iterations (average of {})", sweep.trials),
            points,
        })
    }

    pub fn run_plan(&self, plan: &ResolvedPlan) -> Result<Vec<ExperimentSeries>, SimError> {
        plan.validate()?;
        let mut series = Vec::new();
        if let Some(sweep) = &plan.length_sweep {
            series.push(self.message_length(sweep)?);
        }
        if let Some(sweep) = &plan.frame_loss_sweep {
            series.push(self.loss(LossSection::FrameLoss, sweep)?);
        }
        if let Some(sweep) = &plan.matched_loss_sweep {
            series.push(self.loss(LossSection::MatchedLoss, sweep)?);
        }
        Ok(series)
    }
}
