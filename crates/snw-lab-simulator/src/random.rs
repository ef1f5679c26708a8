use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Source of channel randomness.
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`.
    fn next_uniform(&mut self) -> f64;
}

/// Adapts any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Seeded when `seed` is given, OS-backed otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_os(),
        }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats `fallback` forever.
///
/// Used to force corruption of specific messages in tests. The default
/// fallback of `0.999_999` only corrupts messages whose probability is
/// effectively 1.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: VecDeque<f64>,
    fallback: f64,
    taken: u64,
}

impl ScriptedSource {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: draws.into_iter().collect(),
            fallback: 0.999_999,
            taken: 0,
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(Vec::new()).then_repeat(value)
    }

    pub fn then_repeat(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn draws_taken(&self) -> u64 {
        self.taken
    }
}

impl RandomSource for ScriptedSource {
    fn next_uniform(&mut self) -> f64 {
        self.taken += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
