//! End-to-end properties of a Stop-and-Wait run.

use proptest::prelude::*;
use snw_lab_abstract::{Probability, SeqBit, SimError};
use snw_lab_simulator::experiment::mean_rounds;
use snw_lab_simulator::{
    Frame, Receiver, RngSource, ScriptedSource, Simulator, SweepRunner, simulate,
};

fn p(value: f64) -> Probability {
    Probability::new("p", value).expect("valid probability")
}

#[test]
fn lossless_channel_needs_one_round_per_unit() {
    let mut rng = RngSource::seeded(0);
    let outcome = simulate(&[10, 20, 30], p(0.0), p(0.0), &mut rng).unwrap();
    assert_eq!(outcome.rounds, 3);
    assert_eq!(outcome.delivered, vec![10, 20, 30]);
}

#[test]
fn forced_first_frame_corruption_adds_one_round() {
    let mut rng = ScriptedSource::new([0.0]);
    let outcome = simulate(&[10, 20, 30], p(0.5), p(0.5), &mut rng).unwrap();
    assert_eq!(outcome.rounds, 4);
    assert_eq!(outcome.delivered, vec![10, 20, 30]);
}

#[test]
fn empty_input_costs_nothing() {
    let mut rng = ScriptedSource::constant(0.0);
    let outcome = simulate::<i64>(&[], p(0.5), p(0.5), &mut rng).unwrap();
    assert_eq!(outcome.rounds, 0);
    assert!(outcome.delivered.is_empty());
    assert_eq!(rng.draws_taken(), 0);
}

#[test]
fn receiver_suppresses_duplicate_frames() {
    let mut receiver = Receiver::new(p(0.0));
    let first = receiver.handle(Some(Frame::data(p(0.0), SeqBit::Zero, 42)));
    let again = receiver.handle(Some(Frame::data(p(0.0), SeqBit::Zero, 42)));

    assert_eq!(first.map(|a| a.seq()), Some(SeqBit::Zero));
    assert_eq!(again.map(|a| a.seq()), Some(SeqBit::Zero));
    assert_eq!(receiver.delivered(), &[42]);
}

#[test]
fn every_ack_lost_once_still_delivers_in_order() {
    // Draw pattern per unit: frame ok, ack lost, frame ok (duplicate), ack ok.
    let pattern = [0.9, 0.0, 0.9, 0.9];
    let draws: Vec<f64> = pattern.iter().copied().cycle().take(4 * 5).collect();
    let mut rng = ScriptedSource::new(draws);
    let data = ["a", "b", "c", "d", "e"];

    let mut sim = Simulator::new(data.to_vec(), p(0.5), p(0.5), &mut rng);
    sim.run_until_complete();
    assert_eq!(sim.rounds(), 10);
    assert_eq!(sim.link_stats().acks_corrupted, 5);
    let outcome = sim.finish().unwrap();
    assert_eq!(outcome.delivered, data);
}

#[test]
fn mean_cost_grows_with_frame_loss() {
    let data: Vec<u32> = (0..50).collect();
    let runner = SweepRunner::new(Some(2024));
    let means: Vec<f64> = [0.0, 0.2, 0.4, 0.6]
        .iter()
        .map(|&loss| {
            let rounds = runner
                .run_trials(&data, p(loss), p(0.0), 200, Some(17))
                .unwrap();
            mean_rounds(&rounds)
        })
        .collect();

    assert_eq!(means[0], 50.0);
    for pair in means.windows(2) {
        assert!(pair[0] <= pair[1], "mean rounds decreased: {means:?}");
    }
}

#[test]
fn out_of_range_probability_is_rejected_up_front() {
    assert!(matches!(
        Probability::new("frame_loss", 1.01),
        Err(SimError::InvalidProbability { name: "frame_loss", .. })
    ));
}

proptest! {
    #[test]
    fn prop_delivers_exactly_what_was_sent(
        data in prop::collection::vec(any::<i32>(), 0..40),
        frame_loss in 0.0f64..0.8,
        ack_loss in 0.0f64..0.8,
        seed in any::<u64>(),
    ) {
        let mut rng = RngSource::seeded(seed);
        let outcome = simulate(&data, p(frame_loss), p(ack_loss), &mut rng).unwrap();
        prop_assert_eq!(&outcome.delivered, &data);
        prop_assert!(outcome.rounds >= data.len() as u64);
        prop_assert!(outcome.link.frames_sent >= data.len() as u64);
    }

    #[test]
    fn prop_same_seed_same_rounds(
        len in 0usize..60,
        loss in 0.0f64..0.7,
        seed in any::<u64>(),
    ) {
        let data: Vec<usize> = (0..len).collect();
        let a = simulate(&data, p(loss), p(loss), &mut RngSource::seeded(seed)).unwrap();
        let b = simulate(&data, p(loss), p(loss), &mut RngSource::seeded(seed)).unwrap();
        prop_assert_eq!(a, b);
    }
}
