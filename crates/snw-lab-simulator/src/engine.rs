use crate::message::Frame;
use crate::random::{RandomSource, RngSource};
use crate::receiver::Receiver;
use crate::sender::Sender;
use serde::Serialize;
use snw_lab_abstract::{Probability, SimConfig, SimError};
use tracing::{debug, info, trace};

/// What the channel did during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Frames handed to the channel, retransmissions included.
    pub frames_sent: u64,
    pub frames_corrupted: u64,
    pub acks_sent: u64,
    pub acks_corrupted: u64,
}

impl LinkStats {
    /// Frames sent beyond the first copy of each unit.
    pub fn retransmissions(&self, units: usize) -> u64 {
        self.frames_sent.saturating_sub(units as u64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome<T> {
    pub rounds: u64,
    pub delivered: Vec<T>,
    pub link: LinkStats,
}

/// Lock-steps one sender and one receiver through a corrupting channel.
///
/// A round is: corrupt the in-flight frame, hand it to the receiver, corrupt
/// the ACK it returns, hand that to the sender, which produces the next
/// in-flight frame.
pub struct Simulator<'r, T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    rng: &'r mut dyn RandomSource,
    in_flight: Option<Frame<T>>,
    started: bool,
    rounds: u64,
    link: LinkStats,
}

impl<'r, T: Clone + PartialEq> Simulator<'r, T> {
    pub fn new(
        data: Vec<T>,
        frame_loss: Probability,
        ack_loss: Probability,
        rng: &'r mut dyn RandomSource,
    ) -> Self {
        Self {
            sender: Sender::new(data, frame_loss),
            receiver: Receiver::new(ack_loss),
            rng,
            in_flight: None,
            started: false,
            rounds: 0,
            link: LinkStats::default(),
        }
    }

    /// Prime the channel with the sender's first frame.
    pub fn init(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.in_flight = self.sender.handle(None);
    }

    pub fn is_finished(&self) -> bool {
        self.sender.done()
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn link_stats(&self) -> LinkStats {
        self.link
    }

    pub fn sender(&self) -> &Sender<T> {
        &self.sender
    }

    pub fn receiver(&self) -> &Receiver<T> {
        &self.receiver
    }

    /// Run one round. Returns false once the sender has nothing left to send.
    pub fn step(&mut self) -> bool {
        self.init();
        if self.sender.done() {
            return false;
        }

        let mut frame = self.in_flight.take();
        if let Some(f) = frame.as_mut() {
            f.apply_corruption(self.rng);
            self.link.frames_sent += 1;
            if f.is_corrupted() {
                self.link.frames_corrupted += 1;
            }
        }
        let frame_trace = frame.as_ref().map(|f| (f.seq(), f.is_corrupted()));

        let mut ack = self.receiver.handle(frame);
        if let Some(a) = ack.as_mut() {
            a.apply_corruption(self.rng);
            self.link.acks_sent += 1;
            if a.is_corrupted() {
                self.link.acks_corrupted += 1;
            }
        }
        let ack_trace = ack.as_ref().map(|a| (a.seq(), a.is_corrupted()));

        self.in_flight = self.sender.handle(ack);
        self.rounds += 1;

        trace!(
            round = self.rounds,
            frame = ?frame_trace,
            ack = ?ack_trace,
            cursor = self.sender.cursor(),
            "round complete"
        );
        true
    }

    pub fn run_until_complete(&mut self) {
        self.init();
        while self.step() {}
    }

    /// Check that the receiver delivered exactly what the sender was given
    /// and hand back the result.
    pub fn finish(self) -> Result<SimulationOutcome<T>, SimError> {
        let expected = self.sender.data();
        let delivered = self.receiver.delivered();
        if expected != delivered {
            let first_divergence = expected
                .iter()
                .zip(delivered)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| expected.len().min(delivered.len()));
            return Err(SimError::DeliveryMismatch {
                expected: expected.len(),
                delivered: delivered.len(),
                first_divergence,
            });
        }

        Ok(SimulationOutcome {
            rounds: self.rounds,
            delivered: self.receiver.into_delivered(),
            link: self.link,
        })
    }
}

/// Deliver `data` over a channel that corrupts frames with `frame_loss` and
/// ACKs with `ack_loss`, returning the rounds consumed and the delivered units.
///
/// A loss probability of exactly 1 never terminates; callers sweeping
/// probabilities must exclude it.
pub fn simulate<T: Clone + PartialEq>(
    data: &[T],
    frame_loss: Probability,
    ack_loss: Probability,
    rng: &mut dyn RandomSource,
) -> Result<SimulationOutcome<T>, SimError> {
    let mut sim = Simulator::new(data.to_vec(), frame_loss, ack_loss, rng);
    sim.run_until_complete();
    debug!(
        "simulation finished: {} units in {} rounds",
        data.len(),
        sim.rounds()
    );
    sim.finish()
}

/// [`simulate`] driven by a [`SimConfig`], seeding the channel from the
/// config when a seed is present.
pub fn simulate_with_config<T: Clone + PartialEq>(
    data: &[T],
    config: &SimConfig,
) -> Result<SimulationOutcome<T>, SimError> {
    let (frame_loss, ack_loss) = config.loss_probabilities()?;
    let mut rng = RngSource::from_seed_option(config.seed);
    info!(
        "Simulating {} units (frame_loss={}, ack_loss={}, seed={:?})",
        data.len(),
        frame_loss,
        ack_loss,
        config.seed
    );
    simulate(data, frame_loss, ack_loss, &mut rng)
}
