//! Residual reductions between observed and predicted infected counts.

use std::fmt;
use std::str::FromStr;

use crate::error::{AcorError, Result};

/// Loss used to score a prediction against observations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LossKind {
    /// Mean squared error.
    #[default]
    Mse,
    /// Mean absolute error.
    Mae,
    /// Huber loss: quadratic below `delta`, linear above.
    Huber { delta: f64 },
}

impl LossKind {
    pub fn validate(&self) -> Result<()> {
        if let LossKind::Huber { delta } = self {
            if !delta.is_finite() || *delta <= 0.0 {
                return Err(AcorError::Configuration(format!(
                    "Huber delta must be positive and finite, got {}",
                    delta
                )));
            }
        }
        Ok(())
    }

    /// Mean loss over paired observations and predictions.
    ///
    /// Empty input yields `f64::INFINITY`.
    pub fn evaluate(&self, observed: &[f64], predicted: &[f64]) -> f64 {
        let n = observed.len().min(predicted.len());
        if n == 0 {
            return f64::INFINITY;
        }
        let residuals = observed.iter().zip(predicted).map(|(o, p)| o - p);
        let total: f64 = match *self {
            LossKind::Mse => residuals.map(|r| r * r).sum(),
            LossKind::Mae => residuals.map(f64::abs).sum(),
            LossKind::Huber { delta } => residuals
                .map(|r| {
                    let a = r.abs();
                    if a <= delta {
                        0.5 * r * r
                    } else {
                        delta * (a - 0.5 * delta)
                    }
                })
                .sum(),
        };
        total / n as f64
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossKind::Mse => write!(f, "MSE"),
            LossKind::Mae => write!(f, "MAE"),
            LossKind::Huber { delta } => write!(f, "Huber(delta={})", delta),
        }
    }
}

impl FromStr for LossKind {
    type Err = AcorError;

    /// Parses `MSE`, `MAE` or `Huber` (delta 1.0); case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mse" => Ok(LossKind::Mse),
            "mae" => Ok(LossKind::Mae),
            "huber" => Ok(LossKind::Huber { delta: 1.0 }),
            other => Err(AcorError::Configuration(format!(
                "Unknown loss kind '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVED: [f64; 3] = [1.0, 2.0, 4.0];
    const PREDICTED: [f64; 3] = [1.0, 3.0, 1.0];

    #[test]
    fn test_mse() {
        // residuals 0, -1, 3
        assert!((LossKind::Mse.evaluate(&OBSERVED, &PREDICTED) - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mae() {
        assert!((LossKind::Mae.evaluate(&OBSERVED, &PREDICTED) - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_huber_switches_to_linear() {
        let loss = LossKind::Huber { delta: 1.0 };
        // 0, 0.5 (|r| = 1 <= delta), 1 * (3 - 0.5) = 2.5
        assert!((loss.evaluate(&OBSERVED, &PREDICTED) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input_is_infinite() {
        assert_eq!(LossKind::Mse.evaluate(&[], &[]), f64::INFINITY);
    }

    #[test]
    fn test_parse_and_validate() {
        assert_eq!("mse".parse::<LossKind>().unwrap(), LossKind::Mse);
        assert_eq!(" MAE ".parse::<LossKind>().unwrap(), LossKind::Mae);
        assert_eq!(
            "Huber".parse::<LossKind>().unwrap(),
            LossKind::Huber { delta: 1.0 }
        );
        assert!("rmse".parse::<LossKind>().is_err());
        assert!(LossKind::Huber { delta: 0.0 }.validate().is_err());
    }
}
