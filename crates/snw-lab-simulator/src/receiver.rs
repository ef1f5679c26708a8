use crate::message::{AckMessage, DataFrame, Frame};
use snw_lab_abstract::{Probability, SeqBit};
use tracing::debug;

/// Stop-and-Wait receiver.
///
/// Accepts a frame only when its bit matches the expected one. Every intact
/// frame is acknowledged with the frame's own bit, so a duplicate of the
/// previous unit is re-acknowledged without being delivered again.
#[derive(Debug, Clone)]
pub struct Receiver<T> {
    delivered: Vec<T>,
    expected_seq: SeqBit,
    ack_loss: Probability,
}

impl<T> Receiver<T> {
    pub fn new(ack_loss: Probability) -> Self {
        Self {
            delivered: Vec::new(),
            expected_seq: SeqBit::Zero,
            ack_loss,
        }
    }

    pub fn handle(&mut self, incoming: Option<Frame<T>>) -> Option<AckMessage> {
        let frame = incoming?;
        if frame.is_corrupted() {
            debug!("frame seq {} corrupted, dropped", frame.seq());
            return None;
        }

        let DataFrame { seq, payload } = frame.into_body();
        if seq == self.expected_seq {
            self.delivered.push(payload);
            self.expected_seq = self.expected_seq.flip();
            debug!(
                "frame seq {} accepted, {} units delivered",
                seq,
                self.delivered.len()
            );
        } else {
            debug!("duplicate frame seq {}, re-acknowledging", seq);
        }

        Some(AckMessage::ack(self.ack_loss, seq))
    }

    pub fn expected_seq(&self) -> SeqBit {
        self.expected_seq
    }

    pub fn delivered(&self) -> &[T] {
        &self.delivered
    }

    pub fn into_delivered(self) -> Vec<T> {
        self.delivered
    }
}
