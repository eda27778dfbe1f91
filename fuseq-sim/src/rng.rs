//! Measurement randomness
//!
//! Measurement outcomes are the only nondeterminism in the simulator,
//! and the seed is the only contract: a fixed seed fixes the outcome
//! sequence. The engine itself is not part of the contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seedable uniform sampler for measurement outcomes
#[derive(Debug, Clone)]
pub struct MeasureRng {
    rng: StdRng,
}

impl MeasureRng {
    /// Seed from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seed deterministically
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Re-seed in place
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Draw a uniform sample from [0, 1)
    #[inline]
    pub fn sample(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
