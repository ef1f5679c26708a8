use crate::config::Probability;
use crate::error::SimError;
use serde::Deserialize;

/// Batch experiment plan, usually loaded from TOML.
///
/// Every section is optional; a missing section runs with its defaults and
/// `enabled = false` skips it entirely.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExperimentPlan {
    pub seed: Option<u64>,
    pub length_sweep: Option<LengthSweepOverride>,
    pub frame_loss_sweep: Option<LossSweepOverride>,
    pub matched_loss_sweep: Option<LossSweepOverride>,
}

/// Message length vs. rounds at fixed loss probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthSweep {
    pub min_len: usize,
    pub max_len: usize,
    pub step: usize,
    pub frame_loss: f64,
    pub ack_loss: f64,
}

impl Default for LengthSweep {
    fn default() -> Self {
        Self {
            min_len: 0,
            max_len: 1000,
            step: 20,
            frame_loss: 0.0,
            ack_loss: 0.0,
        }
    }
}

impl LengthSweep {
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        (self.min_len..=self.max_len).step_by(self.step.max(1))
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.step == 0 {
            return Err(SimError::InvalidPlan("length_sweep.step must be > 0".into()));
        }
        if self.min_len > self.max_len {
            return Err(SimError::InvalidPlan(format!(
                "length_sweep.min_len ({}) exceeds max_len ({})",
                self.min_len, self.max_len
            )));
        }
        certain_loss_free("length_sweep.frame_loss", self.frame_loss)?;
        certain_loss_free("length_sweep.ack_loss", self.ack_loss)?;
        Ok(())
    }
}

/// Loss probability vs. mean rounds over a half-open probability range.
#[derive(Debug, Clone, PartialEq)]
pub struct LossSweep {
    pub message_len: usize,
    pub trials: usize,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    /// Fixed acknowledgment loss. `None` couples it to the swept frame loss.
    pub fixed_ack_loss: Option<f64>,
}

impl LossSweep {
    pub fn frame_loss_default() -> Self {
        Self {
            message_len: 200,
            trials: 500,
            start: 0.0,
            stop: 1.0,
            step: 0.05,
            fixed_ack_loss: Some(0.0),
        }
    }

    pub fn matched_loss_default() -> Self {
        Self {
            message_len: 100,
            trials: 100,
            start: 0.0,
            stop: 1.0,
            step: 0.05,
            fixed_ack_loss: None,
        }
    }

    /// The swept probabilities, in order.
    pub fn points(&self) -> Vec<f64> {
        probability_range(self.start, self.stop, self.step)
    }

    pub fn validate(&self, section: LossSection) -> Result<(), SimError> {
        let name = section.name();
        if self.trials == 0 {
            return Err(SimError::InvalidPlan(format!("{name}.trials must be > 0")));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(SimError::InvalidPlan(format!(
                "{name}.step must be a positive number, got {}",
                self.step
            )));
        }
        if !(self.start.is_finite() && self.stop.is_finite()) || self.start > self.stop {
            return Err(SimError::InvalidPlan(format!(
                "{name} range [{}, {}) is empty or not finite",
                self.start, self.stop
            )));
        }
        let count = point_count(self.start, self.stop, self.step);
        if count > MAX_SWEEP_POINTS {
            return Err(SimError::InvalidPlan(format!(
                "{name} would produce {count} points (step {}); at most {MAX_SWEEP_POINTS} are allowed",
                self.step
            )));
        }

        if let Some(ack) = self.fixed_ack_loss {
            certain_loss_free(section.ack_loss_field(), ack)?;
        }
        if count == 0 {
            return Ok(());
        }
        certain_loss_free(section.start_field(), self.start)?;
        // Points only grow, so the last one bounds them all.
        let last = self.start + (count - 1) as f64 * self.step;
        if last >= 1.0 {
            return Err(SimError::CertainLoss {
                name: section.stop_field(),
            });
        }
        Ok(())
    }
}

/// Upper bound on the points a single loss sweep may generate.
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// Which loss sweep of the plan a [`LossSweep`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossSection {
    /// Frame loss swept, ACK loss fixed.
    FrameLoss,
    /// Frame and ACK loss swept together.
    MatchedLoss,
}

impl LossSection {
    pub fn name(self) -> &'static str {
        match self {
            LossSection::FrameLoss => "frame_loss_sweep",
            LossSection::MatchedLoss => "matched_loss_sweep",
        }
    }

    fn start_field(self) -> &'static str {
        match self {
            LossSection::FrameLoss => "frame_loss_sweep.start",
            LossSection::MatchedLoss => "matched_loss_sweep.start",
        }
    }

    fn stop_field(self) -> &'static str {
        match self {
            LossSection::FrameLoss => "frame_loss_sweep.stop",
            LossSection::MatchedLoss => "matched_loss_sweep.stop",
        }
    }

    fn ack_loss_field(self) -> &'static str {
        match self {
            LossSection::FrameLoss => "frame_loss_sweep.ack_loss",
            LossSection::MatchedLoss => "matched_loss_sweep.ack_loss",
        }
    }
}

fn point_count(start: f64, stop: f64, step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 {
        return 0;
    }
    // Saturating cast: an empty or NaN span yields zero points.
    ((stop - start) / step) as usize
}

/// Half-open float range `start + i * step` for `i` in
/// `0..floor((stop - start) / step)`. `stop` itself is never produced.
pub fn probability_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = point_count(start, stop, step).min(MAX_SWEEP_POINTS);
    (0..count).map(|i| start + i as f64 * step).collect()
}

fn certain_loss_free(name: &'static str, value: f64) -> Result<Probability, SimError> {
    let p = Probability::new(name, value)?;
    if p.is_certain() {
        return Err(SimError::CertainLoss { name });
    }
    Ok(p)
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LengthSweepOverride {
    pub enabled: Option<bool>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub step: Option<usize>,
    pub frame_loss: Option<f64>,
    pub ack_loss: Option<f64>,
}

impl LengthSweepOverride {
    pub fn apply_to(&self, sweep: &mut LengthSweep) {
        if let Some(v) = self.min_len {
            sweep.min_len = v;
        }
        if let Some(v) = self.max_len {
            sweep.max_len = v;
        }
        if let Some(v) = self.step {
            sweep.step = v;
        }
        if let Some(v) = self.frame_loss {
            sweep.frame_loss = v;
        }
        if let Some(v) = self.ack_loss {
            sweep.ack_loss = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LossSweepOverride {
    pub enabled: Option<bool>,
    pub message_len: Option<usize>,
    pub trials: Option<usize>,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
    pub ack_loss: Option<f64>,
}

impl LossSweepOverride {
    pub fn apply_to(&self, sweep: &mut LossSweep) {
        if let Some(v) = self.message_len {
            sweep.message_len = v;
        }
        if let Some(v) = self.trials {
            sweep.trials = v;
        }
        if let Some(v) = self.start {
            sweep.start = v;
        }
        if let Some(v) = self.stop {
            sweep.stop = v;
        }
        if let Some(v) = self.step {
            sweep.step = v;
        }
        if let Some(v) = self.ack_loss {
            sweep.fixed_ack_loss = Some(v);
        }
    }
}

/// Plan with defaults filled in and every section validated.
/// A `None` section was disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub seed: Option<u64>,
    pub length_sweep: Option<LengthSweep>,
    pub frame_loss_sweep: Option<LossSweep>,
    pub matched_loss_sweep: Option<LossSweep>,
}

impl Default for ResolvedPlan {
    fn default() -> Self {
        Self {
            seed: None,
            length_sweep: Some(LengthSweep::default()),
            frame_loss_sweep: Some(LossSweep::frame_loss_default()),
            matched_loss_sweep: Some(LossSweep::matched_loss_default()),
        }
    }
}

impl ResolvedPlan {
    /// Check every section, so a bad sweep is reported before any sweep runs.
    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(sweep) = &self.length_sweep {
            sweep.validate()?;
        }
        if let Some(sweep) = &self.frame_loss_sweep {
            sweep.validate(LossSection::FrameLoss)?;
        }
        if let Some(sweep) = &self.matched_loss_sweep {
            sweep.validate(LossSection::MatchedLoss)?;
        }
        Ok(())
    }
}

fn enabled<T>(section: &Option<T>, flag: impl Fn(&T) -> Option<bool>) -> bool {
    section.as_ref().and_then(flag).unwrap_or(true)
}

impl ExperimentPlan {
    pub fn resolve(&self) -> Result<ResolvedPlan, SimError> {
        let length_sweep = if enabled(&self.length_sweep, |o| o.enabled) {
            let mut sweep = LengthSweep::default();
            if let Some(o) = &self.length_sweep {
                o.apply_to(&mut sweep);
            }
            sweep.validate()?;
            Some(sweep)
        } else {
            None
        };

        let frame_loss_sweep = if enabled(&self.frame_loss_sweep, |o| o.enabled) {
            let mut sweep = LossSweep::frame_loss_default();
            if let Some(o) = &self.frame_loss_sweep {
                o.apply_to(&mut sweep);
            }
            sweep.validate(LossSection::FrameLoss)?;
            Some(sweep)
        } else {
            None
        };

        let matched_loss_sweep = if enabled(&self.matched_loss_sweep, |o| o.enabled) {
            let mut sweep = LossSweep::matched_loss_default();
            if let Some(o) = &self.matched_loss_sweep {
                o.apply_to(&mut sweep);
            }
            sweep.validate(LossSection::MatchedLoss)?;
            Some(sweep)
        } else {
            None
        };

        Ok(ResolvedPlan {
            seed: self.seed,
            length_sweep,
            frame_loss_sweep,
            matched_loss_sweep,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_resolves_to_defaults() {
        let resolved = ExperimentPlan::default().resolve().unwrap();
        assert_eq!(resolved, ResolvedPlan::default());
        let lengths: Vec<usize> = LengthSweep::default().lengths().collect();
        assert_eq!(lengths.len(), 51);
        assert_eq!(lengths.first(), Some(&0));
        assert_eq!(lengths.last(), Some(&1000));
    }

    #[test]
    fn toml_overrides_apply_over_defaults() {
        let plan: ExperimentPlan = toml::from_str(
            r#"
            seed = 42

            [length_sweep]
            enabled = false

            [frame_loss_sweep]
            trials = 10
            step = 0.25

            [matched_loss_sweep]
            message_len = 5
            stop = 0.5
            "#,
        )
        .unwrap();

        let resolved = plan.resolve().unwrap();
        assert_eq!(resolved.seed, Some(42));
        assert!(resolved.length_sweep.is_none());

        let frame = resolved.frame_loss_sweep.unwrap();
        assert_eq!(frame.trials, 10);
        assert_eq!(frame.step, 0.25);
        assert_eq!(frame.message_len, 200);
        assert_eq!(frame.fixed_ack_loss, Some(0.0));

        let matched = resolved.matched_loss_sweep.unwrap();
        assert_eq!(matched.message_len, 5);
        assert_eq!(matched.stop, 0.5);
        assert_eq!(matched.fixed_ack_loss, None);
    }

    #[test]
    fn rejects_degenerate_sections() {
        let plan: ExperimentPlan = toml::from_str("[frame_loss_sweep]\nstep = 0.0\n").unwrap();
        assert!(matches!(plan.resolve(), Err(SimError::InvalidPlan(_))));

        let plan: ExperimentPlan = toml::from_str("[matched_loss_sweep]\ntrials = 0\n").unwrap();
        assert!(matches!(plan.resolve(), Err(SimError::InvalidPlan(_))));

        let plan: ExperimentPlan = toml::from_str("[length_sweep]\nframe_loss = 1.2\n").unwrap();
        assert!(matches!(
            plan.resolve(),
            Err(SimError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn sweep_reaching_certain_loss_is_rejected_up_front() {
        let plan: ExperimentPlan = toml::from_str("[frame_loss_sweep]\nstop = 1.05\n").unwrap();
        assert_eq!(
            plan.resolve(),
            Err(SimError::CertainLoss {
                name: "frame_loss_sweep.stop"
            })
        );

        let plan: ExperimentPlan =
            toml::from_str("[matched_loss_sweep]\nstart = 0.5\nstop = 1.3\nstep = 0.25\n").unwrap();
        assert_eq!(
            plan.resolve(),
            Err(SimError::CertainLoss {
                name: "matched_loss_sweep.stop"
            })
        );

        let plan: ExperimentPlan = toml::from_str("[length_sweep]\nack_loss = 1.0\n").unwrap();
        assert_eq!(
            plan.resolve(),
            Err(SimError::CertainLoss {
                name: "length_sweep.ack_loss"
            })
        );
    }

    #[test]
    fn fixed_ack_loss_of_one_is_rejected() {
        let plan: ExperimentPlan = toml::from_str("[frame_loss_sweep]\nack_loss = 1.0\n").unwrap();
        assert_eq!(
            plan.resolve(),
            Err(SimError::CertainLoss {
                name: "frame_loss_sweep.ack_loss"
            })
        );
    }

    #[test]
    fn errors_name_the_offending_section() {
        let plan: ExperimentPlan = toml::from_str("[matched_loss_sweep]\nstart = -0.5\n").unwrap();
        assert!(matches!(
            plan.resolve(),
            Err(SimError::InvalidProbability {
                name: "matched_loss_sweep.start",
                ..
            })
        ));

        let plan: ExperimentPlan = toml::from_str("[frame_loss_sweep]\nack_loss = 2.0\n").unwrap();
        assert!(matches!(
            plan.resolve(),
            Err(SimError::InvalidProbability {
                name: "frame_loss_sweep.ack_loss",
                ..
            })
        ));
    }

    #[test]
    fn tiny_step_is_bounded() {
        let plan: ExperimentPlan = toml::from_str("[frame_loss_sweep]\nstep = 1e-12\n").unwrap();
        match plan.resolve() {
            Err(SimError::InvalidPlan(msg)) => assert!(msg.contains("frame_loss_sweep")),
            other => panic!("expected InvalidPlan, got {other:?}"),
        }
    }

    #[test]
    fn hand_built_plan_is_validated() {
        let mut plan = ResolvedPlan::default();
        assert!(plan.validate().is_ok());
        if let Some(sweep) = plan.matched_loss_sweep.as_mut() {
            sweep.stop = 2.0;
        }
        assert!(matches!(plan.validate(), Err(SimError::CertainLoss { .. })));
    }

    #[test]
    fn range_excludes_stop() {
        let range = probability_range(0.0, 1.0, 0.05);
        assert_eq!(range.len(), 20);
        assert!((range[19] - 0.95).abs() < 1e-9);
        assert!(probability_range(0.0, 1.0, 0.0).is_empty());
    }
}
