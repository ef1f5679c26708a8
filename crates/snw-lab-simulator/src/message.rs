use crate::random::RandomSource;
use snw_lab_abstract::{Probability, SeqBit};

/// Data frame body: a payload tagged with the sender's current sequence bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame<T> {
    pub seq: SeqBit,
    pub payload: T,
}

/// Acknowledgment body. Echoes the bit of the frame it acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub seq: SeqBit,
}

/// A body in transit, together with the channel's verdict on it.
///
/// The corruption state is settled by [`Message::apply_corruption`] while the
/// driver holds the message, before it is handed to the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<B> {
    body: B,
    corruption_probability: Probability,
    corrupted: bool,
}

pub type Frame<T> = Message<DataFrame<T>>;
pub type AckMessage = Message<Ack>;

impl<B> Message<B> {
    pub fn new(corruption_probability: Probability, body: B) -> Self {
        Self {
            body,
            corruption_probability,
            corrupted: false,
        }
    }

    /// Consumes exactly one draw from `rng`, whether or not the message is
    /// already corrupted, so replay under a seeded source stays aligned.
    pub fn apply_corruption(&mut self, rng: &mut dyn RandomSource) {
        let draw = rng.next_uniform();
        if draw < self.corruption_probability.value() {
            self.corrupted = true;
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn corruption_probability(&self) -> Probability {
        self.corruption_probability
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn into_body(self) -> B {
        self.body
    }
}

impl<T> Message<DataFrame<T>> {
    pub fn data(corruption_probability: Probability, seq: SeqBit, payload: T) -> Self {
        Self::new(corruption_probability, DataFrame { seq, payload })
    }

    pub fn seq(&self) -> SeqBit {
        self.body.seq
    }
}

impl Message<Ack> {
    pub fn ack(corruption_probability: Probability, seq: SeqBit) -> Self {
        Self::new(corruption_probability, Ack { seq })
    }

    pub fn seq(&self) -> SeqBit {
        self.body.seq
    }
}
