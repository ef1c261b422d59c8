//! Instance sampling.
//!
//! The evaluator asks a sampler for one index per check. Production uses a
//! seeded PRNG owned by the sampler; tests inject a deterministic one.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks one index in `0..len`.
pub trait InstanceSampler: Send + Sync {
    /// `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform sampler backed by its own generator.
#[derive(Debug)]
pub struct RandomSampler {
    rng: Mutex<StdRng>,
}

impl RandomSampler {
    /// Seed once from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl InstanceSampler for RandomSampler {
    fn pick(&self, len: usize) -> usize {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}

/// Always picks the same position, clamped to the set size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSampler(pub usize);

impl InstanceSampler for FixedSampler {
    fn pick(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_samplers_agree() {
        let a = RandomSampler::seeded(7);
        let b = RandomSampler::seeded(7);
        let picks_a: Vec<_> = (0..32).map(|_| a.pick(5)).collect();
        let picks_b: Vec<_> = (0..32).map(|_| b.pick(5)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|&i| i < 5));
    }

    #[test]
    fn random_sampler_covers_every_index() {
        let sampler = RandomSampler::seeded(42);
        let mut seen = [false; 4];
        for _ in 0..400 {
            seen[sampler.pick(4)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn single_instance_is_always_picked() {
        assert_eq!(RandomSampler::from_entropy().pick(1), 0);
        assert_eq!(FixedSampler(3).pick(1), 0);
        assert_eq!(FixedSampler(1).pick(3), 1);
    }

    #[test]
    fn fixed_sampler_tolerates_empty_set() {
        assert_eq!(FixedSampler(2).pick(0), 0);
        assert_eq!(FixedSampler::default().pick(0), 0);
    }
}
