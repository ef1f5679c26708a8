use serde::Serialize;
use snw_lab_abstract::SimConfig;

use crate::engine::{LinkStats, SimulationOutcome};

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub config: SimConfig,
    pub units: usize,
    pub rounds: u64,
    pub retransmissions: u64,
    pub link: LinkStats,
}

impl SimulationReport {
    pub fn new<T>(config: &SimConfig, outcome: &SimulationOutcome<T>) -> Self {
        let units = outcome.delivered.len();
        Self {
            config: config.clone(),
            units,
            rounds: outcome.rounds,
            retransmissions: outcome.link.retransmissions(units),
            link: outcome.link,
        }
    }
}
