//! Deterministic RNG hierarchy for resampling trials.
//!
//! A master seed generates one sub-seed per `(stream, trial)` pair. Sub-seeds
//! are derived via BLAKE3 hashing, independently of thread scheduling order,
//! so results are identical regardless of thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for trial `trial` of the named stream (e.g. `"monte_carlo"`).
    ///
    /// Calling order never matters: each pair hashes to the same value.
    pub fn sub_seed(&self, stream: &str, trial: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&trial.to_le_bytes());
        let hash = hasher.finalize();
        let mut first = [0u8; 8];
        first.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(first)
    }

    pub fn rng_for(&self, stream: &str, trial: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, trial))
    }
}
