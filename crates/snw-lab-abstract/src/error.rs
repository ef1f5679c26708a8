use thiserror::Error;

/// Structural misuse of the simulator API.
///
/// Lost or corrupted messages are never reported here: they are protocol
/// events and are recovered from by retransmission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    /// A sweep point would lose every transmission, so the run could never finish.
    #[error("{name} is 1.0; every transmission would be lost and the run would never terminate")]
    CertainLoss { name: &'static str },

    /// The receiver's output differs from what the sender was given.
    /// This is a defect in the state machines, not a channel condition.
    #[error(
        "delivery mismatch: sent {expected} units, delivered {delivered}, first divergence at index {first_divergence}"
    )]
    DeliveryMismatch {
        expected: usize,
        delivered: usize,
        first_divergence: usize,
    },

    #[error("invalid experiment plan: {0}")]
    InvalidPlan(String),
}
