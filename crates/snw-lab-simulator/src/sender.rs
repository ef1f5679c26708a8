use crate::message::{AckMessage, Frame};
use snw_lab_abstract::{Probability, SeqBit};
use tracing::debug;

/// Observable state of a [`Sender`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// A frame is outstanding and no valid ACK for it has arrived yet.
    AwaitingAck { cursor: usize, seq: SeqBit },
    Done,
}

/// Stop-and-Wait sender.
///
/// Owns the outbound data and hands out one frame per call to
/// [`Sender::handle`]. `retransmit` stands in for an expired timer: it starts
/// set so the first call emits the first frame, is cleared when a valid ACK
/// arrives and is set again as soon as the next frame goes out. It is
/// therefore always set when an ACK is missing, corrupted or stale, and the
/// current frame is resent every round until it is acknowledged.
#[derive(Debug, Clone)]
pub struct Sender<T> {
    data: Vec<T>,
    cursor: usize,
    expected_ack: SeqBit,
    retransmit: bool,
    frame_loss: Probability,
}

impl<T: Clone> Sender<T> {
    pub fn new(data: Vec<T>, frame_loss: Probability) -> Self {
        Self {
            data,
            cursor: 0,
            expected_ack: SeqBit::Zero,
            retransmit: true,
            frame_loss,
        }
    }

    pub fn done(&self) -> bool {
        self.cursor == self.data.len()
    }

    pub fn state(&self) -> SenderState {
        if self.done() {
            SenderState::Done
        } else {
            SenderState::AwaitingAck {
                cursor: self.cursor,
                seq: self.expected_ack,
            }
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn expected_ack(&self) -> SeqBit {
        self.expected_ack
    }

    pub fn retransmit_pending(&self) -> bool {
        self.retransmit
    }

    /// Consume the ACK received since the last call (`None` to start the run)
    /// and return the frame to put on the channel, if any.
    pub fn handle(&mut self, incoming: Option<AckMessage>) -> Option<Frame<T>> {
        if self.done() {
            return None;
        }

        match incoming {
            Some(ack) if !ack.is_corrupted() && ack.seq() == self.expected_ack => {
                self.retransmit = false;
                self.cursor += 1;
                self.expected_ack = self.expected_ack.flip();
                debug!(
                    "ACK {} accepted, {}/{} units acknowledged",
                    ack.seq(),
                    self.cursor,
                    self.data.len()
                );

                if self.done() {
                    return None;
                }
                self.retransmit = true;
                self.current_frame()
            }
            other => {
                if let Some(ack) = other {
                    debug!(
                        "ACK {} ignored (corrupted={}, expecting {})",
                        ack.seq(),
                        ack.is_corrupted(),
                        self.expected_ack
                    );
                }
                if self.retransmit {
                    debug!("sending unit {} with seq {}", self.cursor, self.expected_ack);
                    self.current_frame()
                } else {
                    None
                }
            }
        }
    }

    fn current_frame(&self) -> Option<Frame<T>> {
        self.data
            .get(self.cursor)
            .map(|unit| Frame::data(self.frame_loss, self.expected_ack, unit.clone()))
    }
}
