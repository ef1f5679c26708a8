pub mod config;
pub mod error;
pub mod plan;
pub mod seq;

pub use config::{Probability, SimConfig};
pub use error::SimError;
pub use seq::SeqBit;

pub use plan::{
    ExperimentPlan, LengthSweep, LengthSweepOverride, LossSection, LossSweep, LossSweepOverride,
    MAX_SWEEP_POINTS, ResolvedPlan, probability_range,
};
