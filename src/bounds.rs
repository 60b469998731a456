//! # Bounds
//!
//! Box constraints of the search space: one `(low, high)` pair per parameter
//! component. Every candidate the optimizer produces is clipped back into
//! these bounds before it is evaluated.

use crate::error::{AcorError, Result};
use crate::expr::parse_numeric;
use crate::rng::RandomNumberGenerator;

/// Per-component `(low, high)` limits of a parameter vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    limits: Vec<(f64, f64)>,
}

impl Bounds {
    /// Creates bounds from `(low, high)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` if the list is empty, a limit is not
    /// finite, or `high < low` for any component. Zero-width bounds are allowed.
    pub fn new(limits: Vec<(f64, f64)>) -> Result<Self> {
        let bounds = Self { limits };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Wraps limits that are valid by construction.
    pub(crate) fn from_trusted(limits: Vec<(f64, f64)>) -> Self {
        debug_assert!(limits.iter().all(|&(low, high)| low <= high));
        Self { limits }
    }

    /// Builds bounds from pairs of numeric expressions such as `("-2*pi", "2*pi")`.
    pub fn from_expressions<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self> {
        let limits = pairs
            .iter()
            .map(|(low, high)| Ok((parse_numeric(low.as_ref())?, parse_numeric(high.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(limits)
    }

    /// Re-checks the invariants; used when bounds arrive through deserialization.
    pub fn validate(&self) -> Result<()> {
        if self.limits.is_empty() {
            return Err(AcorError::Configuration(
                "Bounds must contain at least one component".to_string(),
            ));
        }
        for (i, &(low, high)) in self.limits.iter().enumerate() {
            if !low.is_finite() || !high.is_finite() {
                return Err(AcorError::Configuration(format!(
                    "Bound {} is not finite: ({}, {})",
                    i, low, high
                )));
            }
            if high < low {
                return Err(AcorError::Configuration(format!(
                    "Bound {} has high < low: ({}, {})",
                    i, low, high
                )));
            }
            if !(high - low).is_finite() {
                return Err(AcorError::Configuration(format!(
                    "Bound {} is too wide to sample: ({}, {})",
                    i, low, high
                )));
            }
        }
        Ok(())
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.limits.len()
    }

    pub fn low(&self, i: usize) -> f64 {
        self.limits[i].0
    }

    pub fn high(&self, i: usize) -> f64 {
        self.limits[i].1
    }

    /// Width `high - low` of component `i`.
    pub fn range(&self, i: usize) -> f64 {
        self.limits[i].1 - self.limits[i].0
    }

    /// Midpoint of every component.
    pub fn midpoint(&self) -> Vec<f64> {
        self.limits.iter().map(|&(l, h)| 0.5 * (l + h)).collect()
    }

    /// Returns the `(low, high)` pairs.
    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.limits
    }

    /// Clips every component of `params` into its bound, in place.
    ///
    /// NaN components are replaced by the lower bound.
    pub fn clip(&self, params: &mut [f64]) {
        for (x, &(low, high)) in params.iter_mut().zip(&self.limits) {
            *x = if x.is_nan() { low } else { x.clamp(low, high) };
        }
    }

    /// Returns `true` if every component lies within its bound.
    pub fn contains(&self, params: &[f64]) -> bool {
        params.len() == self.limits.len()
            && params
                .iter()
                .zip(&self.limits)
                .all(|(&x, &(low, high))| x >= low && x <= high)
    }

    /// Reflection `low + high - x` used by opposition-based learning.
    pub fn opposite(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(&self.limits)
            .map(|(&x, &(low, high))| low + high - x)
            .collect()
    }

    /// Draws a vector uniformly from the box.
    pub fn sample_uniform(&self, rng: &mut RandomNumberGenerator) -> Vec<f64> {
        self.limits
            .iter()
            .map(|&(low, high)| rng.uniform(low, high))
            .collect()
    }

    /// Relative position of each component inside its bound, in `[0, 1]`.
    ///
    /// Zero-width components map to `0.5` instead of dividing by zero.
    pub fn normalized(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(&self.limits)
            .map(|(&x, &(low, high))| {
                let width = high - low;
                if width.abs() < 1e-12 {
                    0.5
                } else {
                    (x - low) / width
                }
            })
            .collect()
    }
}
