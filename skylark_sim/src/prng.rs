// skylark_sim/src/prng.rs

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A newtype wrapper around `ChaCha8Rng`.
/// This is the single deterministic pseudo-random number generator of a run.
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    /// Seeded runs are reproducible; `None` draws a seed from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(ChaCha8Rng::seed_from_u64(seed)),
            None => Self(ChaCha8Rng::from_entropy()),
        }
    }
}
