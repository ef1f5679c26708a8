use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A probability known to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Probability(f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);

    /// Validate `value`, naming the offending parameter on failure.
    /// NaN is rejected along with anything outside `[0, 1]`.
    pub fn new(name: &'static str, value: f64) -> Result<Self, SimError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SimError::InvalidProbability { name, value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// True when every draw falls below this probability.
    pub fn is_certain(self) -> bool {
        self.0 >= 1.0
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = SimError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Probability::new("probability", value)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Probability that a data frame is corrupted in transit.
    pub frame_loss: f64,
    /// Probability that an acknowledgment is corrupted in transit.
    pub ack_loss: f64,
    /// Seed for the channel's random source. `None` draws from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frame_loss: 0.0,
            ack_loss: 0.0,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn new(frame_loss: f64, ack_loss: f64) -> Self {
        Self {
            frame_loss,
            ack_loss,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns `(frame_loss, ack_loss)` as validated probabilities.
    pub fn loss_probabilities(&self) -> Result<(Probability, Probability), SimError> {
        Ok((
            Probability::new("frame_loss", self.frame_loss)?,
            Probability::new("ack_loss", self.ack_loss)?,
        ))
    }
}
