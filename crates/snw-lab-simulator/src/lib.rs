pub mod engine;
pub mod experiment;
pub mod message;
pub mod random;
pub mod receiver;
pub mod sender;
pub mod trace;

pub use engine::{LinkStats, SimulationOutcome, Simulator, simulate, simulate_with_config};
pub use experiment::{ExperimentSeries, SeriesPoint, SweepRunner};
pub use message::{Ack, AckMessage, DataFrame, Frame, Message};
pub use random::{RandomSource, RngSource, ScriptedSource};
pub use receiver::Receiver;
pub use sender::{Sender, SenderState};
pub use trace::SimulationReport;
