//! Injectable randomness for baseline confidence scores.

use std::fmt;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ConfidenceRange;

/// Source of baseline confidence values.
///
/// Implementations must return a value inside `range`.
pub trait ConfidenceSource: Send + Sync + fmt::Debug {
    /// Draws one confidence value.
    fn sample(&self, range: ConfidenceRange) -> f64;
}

/// Uniform draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngConfidence;

impl ConfidenceSource for ThreadRngConfidence {
    fn sample(&self, range: ConfidenceRange) -> f64 {
        rand::thread_rng().gen_range(range.low..=range.high)
    }
}

/// Reproducible uniform draws from a seeded RNG.
pub struct SeededConfidence {
    rng: Mutex<StdRng>,
}

impl SeededConfidence {
    /// Creates a source seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl fmt::Debug for SeededConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededConfidence").finish_non_exhaustive()
    }
}

impl ConfidenceSource for SeededConfidence {
    /// # Panics
    ///
    /// Panics if the internal RNG lock has been poisoned.
    fn sample(&self, range: ConfidenceRange) -> f64 {
        let mut rng = self.rng.lock().expect("confidence rng poisoned");
        rng.gen_range(range.low..=range.high)
    }
}

/// Always returns the same value, clamped into the requested range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedConfidence(pub f64);

impl ConfidenceSource for FixedConfidence {
    fn sample(&self, range: ConfidenceRange) -> f64 {
        range.clamp(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_rng_stays_in_range() {
        let range = ConfidenceRange::default();
        for _ in 0..500 {
            assert!(range.contains(ThreadRngConfidence.sample(range)));
        }
    }

    #[test]
    fn seeded_sources_repeat() {
        let range = ConfidenceRange::default();
        let a = SeededConfidence::new(7);
        let b = SeededConfidence::new(7);

        let first: Vec<f64> = (0..5).map(|_| a.sample(range)).collect();
        let second: Vec<f64> = (0..5).map(|_| b.sample(range)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn fixed_source_is_clamped() {
        let range = ConfidenceRange::default();
        assert_eq!(FixedConfidence(0.8).sample(range), 0.8);
        assert_eq!(FixedConfidence(0.1).sample(range), 0.75);
        assert_eq!(FixedConfidence(1.0).sample(range), 0.95);
    }
}
