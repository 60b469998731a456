//! Harmonic rate parameterization and the flat parameter-vector layout.
//!
//! Each epidemiological rate is `exp(baseline + Σ aᵢ·cos(ωᵢ·t + φᵢ))`. The
//! parameter vector stores, per rate, the baseline followed by one
//! `(amplitude, frequency, phase)` triple per harmonic term, then a final
//! scalar `k`:
//!
//! ```text
//! [beta0, b1, w1, p1, ..., gamma0, g1, w.., p.., ..., sigma0, s1, w.., p.., ..., k]
//! ```

use std::f64::consts::PI;

use crate::bounds::Bounds;
use crate::error::{AcorError, Result};

/// Highest harmonic order supported per rate.
pub const MAX_HARMONICS: u8 = 2;

/// Number of harmonic terms per rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HarmonicConfig {
    pub beta: u8,
    pub gamma: u8,
    pub sigma: u8,
}

impl HarmonicConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` if any order exceeds [`MAX_HARMONICS`].
    pub fn new(beta: u8, gamma: u8, sigma: u8) -> Result<Self> {
        let config = Self { beta, gamma, sigma };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, order) in [("beta", self.beta), ("gamma", self.gamma), ("sigma", self.sigma)] {
            if order > MAX_HARMONICS {
                return Err(AcorError::Configuration(format!(
                    "Harmonic order for {} must be between 0 and {}, got {}",
                    name, MAX_HARMONICS, order
                )));
            }
        }
        Ok(())
    }

    /// Dimension `3·(h_beta + h_gamma + h_sigma) + 4` of the parameter vector.
    pub fn dimension(&self) -> usize {
        3 * (self.beta as usize + self.gamma as usize + self.sigma as usize) + 4
    }
}

impl Default for HarmonicConfig {
    fn default() -> Self {
        Self {
            beta: 2,
            gamma: 2,
            sigma: 2,
        }
    }
}

/// One of the three time-varying rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    /// Transmission.
    Beta,
    /// Recovery.
    Gamma,
    /// Incubation (exposed to infectious).
    Sigma,
}

/// Position of one rate inside the parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSlot {
    offset: usize,
    terms: usize,
}

impl RateSlot {
    /// Index of the log-baseline.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn terms(&self) -> usize {
        self.terms
    }

    /// Number of components this rate occupies.
    pub fn width(&self) -> usize {
        1 + 3 * self.terms
    }

    /// Log of the rate at time `t`.
    #[inline]
    pub fn log_value(&self, params: &[f64], t: f64) -> f64 {
        let mut log_rate = params[self.offset];
        for term in 0..self.terms {
            let base = self.offset + 1 + 3 * term;
            log_rate += params[base] * (params[base + 1] * t + params[base + 2]).cos();
        }
        log_rate
    }

    /// Rate at time `t`.
    #[inline]
    pub fn value(&self, params: &[f64], t: f64) -> f64 {
        self.log_value(params, t).exp()
    }
}

/// The three rates evaluated at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub beta: f64,
    pub gamma: f64,
    pub sigma: f64,
}

/// Decoded layout of the parameter vector, computed once per harmonic configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLayout {
    config: HarmonicConfig,
    beta: RateSlot,
    gamma: RateSlot,
    sigma: RateSlot,
    k_index: usize,
}

impl ParameterLayout {
    pub fn new(config: HarmonicConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::decode(config))
    }

    fn decode(config: HarmonicConfig) -> Self {
        let beta = RateSlot {
            offset: 0,
            terms: config.beta as usize,
        };
        let gamma = RateSlot {
            offset: beta.offset + beta.width(),
            terms: config.gamma as usize,
        };
        let sigma = RateSlot {
            offset: gamma.offset + gamma.width(),
            terms: config.sigma as usize,
        };
        let k_index = sigma.offset + sigma.width();

        Self {
            config,
            beta,
            gamma,
            sigma,
            k_index,
        }
    }

    pub fn config(&self) -> HarmonicConfig {
        self.config
    }

    pub fn dim(&self) -> usize {
        self.k_index + 1
    }

    pub fn slot(&self, rate: Rate) -> RateSlot {
        match rate {
            Rate::Beta => self.beta,
            Rate::Gamma => self.gamma,
            Rate::Sigma => self.sigma,
        }
    }

    /// Index of the exposed-to-infected ratio `k` (always last).
    pub fn k_index(&self) -> usize {
        self.k_index
    }

    #[inline]
    pub fn rates_at(&self, params: &[f64], t: f64) -> Rates {
        Rates {
            beta: self.beta.value(params, t),
            gamma: self.gamma.value(params, t),
            sigma: self.sigma.value(params, t),
        }
    }

    /// Component names, e.g. `beta0, b1, w1, p1, ..., k`.
    ///
    /// Frequency and phase indices run continuously across the three rates.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.dim());
        let mut w_idx = 1;
        for (name, amplitude, slot) in [
            ("beta0", "b", self.beta),
            ("gamma0", "g", self.gamma),
            ("sigma0", "s", self.sigma),
        ] {
            labels.push(name.to_string());
            for term in 1..=slot.terms {
                labels.push(format!("{}{}", amplitude, term));
                labels.push(format!("w{}", w_idx));
                labels.push(format!("p{}", w_idx));
                w_idx += 1;
            }
        }
        labels.push("k".to_string());
        labels
    }

    /// Default search box for this layout.
    pub fn default_bounds(&self) -> Bounds {
        let mut limits = Vec::with_capacity(self.dim());
        for (baseline, slot) in [
            ((-1.5, 1.5), self.beta),
            ((-1.0, 1.0), self.gamma),
            ((-1.0, 1.0), self.sigma),
        ] {
            limits.push(baseline);
            for _ in 0..slot.terms {
                limits.push((-1.5, 1.5));
                limits.push((-1.5, 1.5));
                limits.push((-2.0 * PI, 2.0 * PI));
            }
        }
        limits.push((0.5, 1.5));
        Bounds::from_trusted(limits)
    }
}

impl Default for ParameterLayout {
    fn default() -> Self {
        Self::decode(HarmonicConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_dimension() {
        let layout = ParameterLayout::default();
        assert_eq!(layout, ParameterLayout::new(HarmonicConfig::default()).unwrap());
        assert_eq!(layout.dim(), 22);
        assert_eq!(layout.labels().len(), 22);
        assert_eq!(layout.default_bounds().dim(), 22);
        assert_eq!(layout.k_index(), 21);
    }

    #[test]
    fn test_labels_continue_frequency_index() {
        let layout = ParameterLayout::new(HarmonicConfig::new(1, 0, 1).unwrap()).unwrap();
        assert_eq!(
            layout.labels(),
            vec!["beta0", "b1", "w1", "p1", "gamma0", "sigma0", "s1", "w2", "p2", "k"]
        );
    }

    #[test]
    fn test_rejects_order_above_two() {
        assert!(HarmonicConfig::new(3, 0, 0).is_err());
        assert!(ParameterLayout::new(HarmonicConfig {
            beta: 0,
            gamma: 0,
            sigma: 5
        })
        .is_err());
    }

    #[test]
    fn test_zero_harmonics_is_constant_rate() {
        let layout = ParameterLayout::new(HarmonicConfig::new(0, 0, 0).unwrap()).unwrap();
        assert_eq!(layout.dim(), 4);
        let params = [0.3, -0.2, 0.1, 1.0];
        for t in [0.0, 3.5, 14.0] {
            let rates = layout.rates_at(&params, t);
            assert!((rates.beta - 0.3f64.exp()).abs() < 1e-15);
            assert!((rates.gamma - (-0.2f64).exp()).abs() < 1e-15);
            assert!((rates.sigma - 0.1f64.exp()).abs() < 1e-15);
        }
    }

    #[test]
    fn test_harmonic_term_modulates_rate() {
        let layout = ParameterLayout::new(HarmonicConfig::new(1, 0, 0).unwrap()).unwrap();
        // beta0, b1, w1, p1, gamma0, sigma0, k
        let params = [0.0, 0.5, 1.0, 0.0, 0.0, 0.0, 1.0];
        let beta = layout.slot(Rate::Beta);
        assert!((beta.value(&params, 0.0) - 0.5f64.exp()).abs() < 1e-12);
        assert!((beta.value(&params, PI) - (-0.5f64).exp()).abs() < 1e-12);
        assert_eq!(layout.slot(Rate::Gamma).offset(), 4);
        assert_eq!(layout.slot(Rate::Sigma).offset(), 5);
    }
}
