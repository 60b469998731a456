//! # Challenge
//!
//! The `Challenge` trait is the objective the optimizer minimizes. It is the
//! only thing evaluation workers ever see: a pure, thread-safe function from a
//! parameter vector to a non-negative cost, with `f64::INFINITY` standing in
//! for infeasible or failed evaluations.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::challenge::Challenge;
//!
//! struct Sphere;
//!
//! impl Challenge for Sphere {
//!     fn score(&self, params: &[f64]) -> f64 {
//!         params.iter().map(|x| x * x).sum()
//!     }
//! }
//!
//! assert_eq!(Sphere.score(&[1.0, 2.0]), 5.0);
//! ```

use crate::error::Result;

/// Objective function minimized by the optimizer.
///
/// Implementations must be `Send + Sync`: the same instance is shared by
/// every evaluation worker of a run, so `score` must not rely on shared
/// mutable state.
pub trait Challenge: Send + Sync {
    /// Returns the cost of `params`. Lower is better.
    ///
    /// Failures are reported as `f64::INFINITY`, never as a panic or error.
    fn score(&self, params: &[f64]) -> f64;

    /// Checks that the challenge is ready to be optimized.
    ///
    /// Called once before a run starts; the default accepts everything.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl<C: Challenge + ?Sized> Challenge for &C {
    fn score(&self, params: &[f64]) -> f64 {
        (**self).score(params)
    }

    fn validate(&self) -> Result<()> {
        (**self).validate()
    }
}

impl<C: Challenge + ?Sized> Challenge for Box<C> {
    fn score(&self, params: &[f64]) -> f64 {
        (**self).score(params)
    }

    fn validate(&self) -> Result<()> {
        (**self).validate()
    }
}

impl<C: Challenge + ?Sized> Challenge for std::sync::Arc<C> {
    fn score(&self, params: &[f64]) -> f64 {
        (**self).score(params)
    }

    fn validate(&self) -> Result<()> {
        (**self).validate()
    }
}
