//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` struct wraps a seedable `StdRng` and exposes
//! the three draws the optimizer needs: uniform samples inside a bound,
//! Gaussian samples around a kernel mean, and rank-weighted index selection.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(7);
//! let x = rng.uniform(-1.0, 1.0);
//! assert!((-1.0..=1.0).contains(&x));
//! ```

use rand::distributions::{Distribution, WeightedIndex};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;

use crate::error::{AcorError, Result};

/// A wrapper around the `rand` crate's `StdRng`.
///
/// Every run owns exactly one generator; it is only ever touched from the
/// optimizer's own thread, never from evaluation workers.
#[derive(Clone, Debug)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is useful for reproducible tests and benchmarks.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform sample in `[low, high)`.
    ///
    /// A zero-width interval returns `low`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }

    /// Draws a Gaussian sample with the given mean and standard deviation.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Runtime` if `std_dev` is negative or not finite.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> Result<f64> {
        let dist = Normal::new(mean, std_dev).map_err(|e| {
            AcorError::Runtime(format!(
                "Invalid Gaussian kernel (mean {}, std {}): {}",
                mean, std_dev, e
            ))
        })?;
        Ok(dist.sample(&mut self.rng))
    }

    /// Picks an index according to a prepared weighted distribution.
    pub fn weighted_index(&mut self, weights: &WeightedIndex<f64>) -> usize {
        weights.sample(&mut self.rng)
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}
