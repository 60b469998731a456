//! # ODE integration
//!
//! Adaptive integrators for small, fixed-size systems such as the four
//! SEIR compartments. Two steppers share one adaptive driver:
//!
//! - [`dopri::DormandPrince`], an explicit 5(4) Runge–Kutta pair, cheap on
//!   smooth trajectories;
//! - [`rosenbrock::Rosenbrock23`], a linearly-implicit 2(3) method that stays
//!   stable when fast and slow rates mix.
//!
//! [`Integrator::Auto`] starts explicit and switches to the implicit method
//! only when the explicit one exhausts [`AUTO_EXPLICIT_MAX_STEPS`] in an
//! output interval or its step size collapses, which is how stiff corners of
//! the parameter space show up.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::ode::{Integrator, IntegratorOptions, OdeSystem};
//!
//! struct Decay;
//!
//! impl OdeSystem<1> for Decay {
//!     fn rhs(&self, _t: f64, y: &[f64; 1]) -> [f64; 1] {
//!         [-y[0]]
//!     }
//! }
//!
//! let out = Integrator::Auto
//!     .solve(&Decay, [1.0], &[0.0, 1.0], &IntegratorOptions::default())
//!     .unwrap();
//! assert!((out[1][0] - (-1.0f64).exp()).abs() < 1e-6);
//! ```

pub mod dopri;
pub mod rosenbrock;

use thiserror::Error;
use tracing::trace;

pub use dopri::DormandPrince;
pub use rosenbrock::Rosenbrock23;

/// Right-hand side `dy/dt = f(t, y)` of an `N`-dimensional system.
pub trait OdeSystem<const N: usize> {
    fn rhs(&self, t: f64, y: &[f64; N]) -> [f64; N];
}

/// Reasons an integration can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    /// More than `max_steps` steps were needed between two output times.
    #[error("step ceiling of {steps} exceeded at t = {t}")]
    MaxStepsExceeded { t: f64, steps: usize },

    /// The adaptive step shrank below what floating point can resolve.
    #[error("step size underflow (h = {h:e}) at t = {t}")]
    StepSizeUnderflow { t: f64, h: f64 },

    /// An accepted state contained NaN or infinity.
    #[error("non-finite state at t = {t}")]
    NonFinite { t: f64 },

    /// The implicit stage matrix could not be factorized.
    #[error("singular iteration matrix at t = {t}")]
    SingularMatrix { t: f64 },

    /// Output times were empty, non-finite or not strictly increasing.
    #[error("invalid output time grid: {0}")]
    InvalidTimeGrid(String),
}

/// Tolerances and the per-interval step ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntegratorOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Maximum number of attempted steps between two consecutive output times.
    pub max_steps: usize,
}

impl Default for IntegratorOptions {
    fn default() -> Self {
        Self {
            rtol: 1.49012e-8,
            atol: 1.49012e-8,
            max_steps: 200_000,
        }
    }
}

/// Step ceiling of the explicit attempt of [`Integrator::Auto`]. A smooth
/// SEIR interval needs a few dozen steps; a stiff one exhausts this quickly.
pub const AUTO_EXPLICIT_MAX_STEPS: usize = 1_000;

/// Integration method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Integrator {
    DormandPrince,
    Rosenbrock,
    /// Dormand–Prince with a Rosenbrock fallback on stiffness.
    #[default]
    Auto,
}

impl Integrator {
    /// Integrates `system` from `y0` at `times[0]` and returns the state at every entry of `times`.
    ///
    /// The first returned state is `y0` itself.
    pub fn solve<const N: usize, F: OdeSystem<N>>(
        &self,
        system: &F,
        y0: [f64; N],
        times: &[f64],
        options: &IntegratorOptions,
    ) -> Result<Vec<[f64; N]>, IntegrationError> {
        match self {
            Integrator::DormandPrince => integrate(&DormandPrince, system, y0, times, options),
            Integrator::Rosenbrock => integrate(&Rosenbrock23, system, y0, times, options),
            Integrator::Auto => {
                let explicit = IntegratorOptions {
                    max_steps: options.max_steps.min(AUTO_EXPLICIT_MAX_STEPS),
                    ..*options
                };
                match integrate(&DormandPrince, system, y0, times, &explicit) {
                    Err(
                        err @ (IntegrationError::MaxStepsExceeded { .. }
                        | IntegrationError::StepSizeUnderflow { .. }),
                    ) => {
                        trace!(error = %err, "explicit integration stalled, switching to Rosenbrock");
                        integrate(&Rosenbrock23, system, y0, times, options)
                    }
                    other => other,
                }
            }
        }
    }
}

/// A single adaptive step of an embedded method.
pub trait Stepper<const N: usize> {
    /// Order of the propagated solution's error estimate, used for step control.
    const ORDER: i32;

    /// Attempts one step of size `h` and returns the new state and the error vector.
    fn attempt<F: OdeSystem<N>>(
        &self,
        system: &F,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> Result<([f64; N], [f64; N]), IntegrationError>;
}

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Adaptive driver shared by every stepper.
pub fn integrate<const N: usize, S: Stepper<N>, F: OdeSystem<N>>(
    stepper: &S,
    system: &F,
    y0: [f64; N],
    times: &[f64],
    options: &IntegratorOptions,
) -> Result<Vec<[f64; N]>, IntegrationError> {
    check_time_grid(times)?;
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(IntegrationError::NonFinite { t: times[0] });
    }

    let mut out = Vec::with_capacity(times.len());
    out.push(y0);

    let mut t = times[0];
    let mut y = y0;
    let span = times[times.len() - 1] - t;
    if span <= 0.0 {
        return Ok(out);
    }
    let mut h = initial_step(system, t, &y, span, options);
    let exponent = -1.0 / (S::ORDER as f64 + 1.0);

    for &t_next in &times[1..] {
        let mut steps = 0usize;
        while t < t_next {
            if steps >= options.max_steps {
                return Err(IntegrationError::MaxStepsExceeded { t, steps });
            }
            let remaining = t_next - t;
            let landing = h >= remaining;
            let h_try = if landing { remaining } else { h };
            let min_step = 16.0 * f64::EPSILON * t.abs().max(1.0);
            if h_try < min_step && !landing {
                return Err(IntegrationError::StepSizeUnderflow { t, h: h_try });
            }

            let (y_new, err_vec) = stepper.attempt(system, t, &y, h_try)?;
            steps += 1;
            let err = error_norm(&y, &y_new, &err_vec, options);

            if err.is_finite() && err <= 1.0 {
                if y_new.iter().any(|v| !v.is_finite()) {
                    return Err(IntegrationError::NonFinite { t: t + h_try });
                }
                t = if landing { t_next } else { t + h_try };
                y = y_new;
                let factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                h = if landing { h.max(h_try * factor) } else { h_try * factor };
            } else {
                let factor = if err.is_finite() {
                    (SAFETY * err.powf(exponent)).clamp(MIN_FACTOR, 1.0)
                } else {
                    MIN_FACTOR
                };
                h = h_try * factor;
                if h < min_step {
                    return Err(IntegrationError::StepSizeUnderflow { t, h });
                }
            }
        }
        out.push(y);
    }

    Ok(out)
}

fn check_time_grid(times: &[f64]) -> Result<(), IntegrationError> {
    if times.is_empty() {
        return Err(IntegrationError::InvalidTimeGrid("no output times".to_string()));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(IntegrationError::InvalidTimeGrid(
            "output times must be finite".to_string(),
        ));
    }
    if times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(IntegrationError::InvalidTimeGrid(
            "output times must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

/// Weighted RMS norm of the local error estimate.
fn error_norm<const N: usize>(
    y: &[f64; N],
    y_new: &[f64; N],
    err: &[f64; N],
    options: &IntegratorOptions,
) -> f64 {
    let sum: f64 = (0..N)
        .map(|i| {
            let scale = options.atol + options.rtol * y[i].abs().max(y_new[i].abs());
            (err[i] / scale).powi(2)
        })
        .sum();
    (sum / N as f64).sqrt()
}

fn initial_step<const N: usize, F: OdeSystem<N>>(
    system: &F,
    t: f64,
    y: &[f64; N],
    span: f64,
    options: &IntegratorOptions,
) -> f64 {
    let f0 = system.rhs(t, y);
    let (mut d0, mut d1) = (0.0, 0.0);
    for i in 0..N {
        let scale = options.atol + options.rtol * y[i].abs();
        d0 += (y[i] / scale).powi(2);
        d1 += (f0[i] / scale).powi(2);
    }
    let d0 = (d0 / N as f64).sqrt();
    let d1 = (d1 / N as f64).sqrt();
    let h0 = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
        1e-6
    } else {
        0.01 * d0 / d1
    };
    h0.min(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay {
        rate: f64,
    }

    impl OdeSystem<1> for Decay {
        fn rhs(&self, _t: f64, y: &[f64; 1]) -> [f64; 1] {
            [-self.rate * y[0]]
        }
    }

    /// Harmonic oscillator, y = (cos t, -sin t).
    struct Oscillator;

    impl OdeSystem<2> for Oscillator {
        fn rhs(&self, _t: f64, y: &[f64; 2]) -> [f64; 2] {
            [y[1], -y[0]]
        }
    }

    /// Robertson-like stiff pair: fast relaxation onto a slowly moving manifold.
    struct StiffPair;

    impl OdeSystem<2> for StiffPair {
        fn rhs(&self, t: f64, y: &[f64; 2]) -> [f64; 2] {
            [-1.0e4 * (y[0] - t.cos()), -y[1]]
        }
    }

    #[test]
    fn test_exponential_decay_all_methods() {
        let times: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let options = IntegratorOptions::default();
        for method in [Integrator::DormandPrince, Integrator::Rosenbrock, Integrator::Auto] {
            let out = method.solve(&Decay { rate: 0.7 }, [2.0], &times, &options).unwrap();
            assert_eq!(out.len(), times.len());
            for (state, &t) in out.iter().zip(&times) {
                let exact = 2.0 * (-0.7 * t).exp();
                assert!(
                    (state[0] - exact).abs() < 1e-5,
                    "{:?} at t={} gave {} vs {}",
                    method,
                    t,
                    state[0],
                    exact
                );
            }
        }
    }

    #[test]
    fn test_oscillator_dopri_accuracy() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let out = Integrator::DormandPrince
            .solve(&Oscillator, [1.0, 0.0], &times, &IntegratorOptions::default())
            .unwrap();
        for (state, &t) in out.iter().zip(&times) {
            assert!((state[0] - t.cos()).abs() < 1e-6);
            assert!((state[1] + t.sin()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_auto_falls_back_on_step_ceiling() {
        let options = IntegratorOptions {
            rtol: 1e-6,
            atol: 1e-6,
            max_steps: 500,
        };
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let explicit = Integrator::DormandPrince.solve(&StiffPair, [1.0, 1.0], &times, &options);
        assert!(matches!(
            explicit,
            Err(IntegrationError::MaxStepsExceeded { .. })
        ));

        let out = Integrator::Auto
            .solve(&StiffPair, [1.0, 1.0], &times, &options)
            .unwrap();
        assert!((out[5][0] - 5.0f64.cos()).abs() < 1e-3);
        assert!((out[5][1] - (-5.0f64).exp()).abs() < 1e-4);
    }

    /// Counts right-hand side evaluations.
    struct Counted<'a> {
        inner: StiffPair,
        calls: &'a std::cell::Cell<usize>,
    }

    impl OdeSystem<2> for Counted<'_> {
        fn rhs(&self, t: f64, y: &[f64; 2]) -> [f64; 2] {
            self.calls.set(self.calls.get() + 1);
            self.inner.rhs(t, y)
        }
    }

    #[test]
    fn test_auto_gives_up_on_explicit_early() {
        let options = IntegratorOptions::default();
        let times = [0.0, 1.0, 2.0];
        let calls = std::cell::Cell::new(0);
        let system = Counted { inner: StiffPair, calls: &calls };

        let out = Integrator::Auto.solve(&system, [1.0, 1.0], &times, &options).unwrap();
        assert!((out[2][0] - 2.0f64.cos()).abs() < 1e-3);
        // The full ceiling would cost over a million evaluations.
        assert!(calls.get() < 50 * AUTO_EXPLICIT_MAX_STEPS, "{} rhs calls", calls.get());

        let capped = IntegratorOptions {
            max_steps: AUTO_EXPLICIT_MAX_STEPS,
            ..options
        };
        assert!(matches!(
            Integrator::DormandPrince.solve(&StiffPair, [1.0, 1.0], &times, &capped),
            Err(IntegrationError::MaxStepsExceeded { .. })
        ));
    }

    #[test]
    fn test_invalid_time_grid() {
        let options = IntegratorOptions::default();
        let decay = Decay { rate: 1.0 };
        assert!(matches!(
            Integrator::Auto.solve(&decay, [1.0], &[], &options),
            Err(IntegrationError::InvalidTimeGrid(_))
        ));
        assert!(matches!(
            Integrator::Auto.solve(&decay, [1.0], &[0.0, 2.0, 1.0], &options),
            Err(IntegrationError::InvalidTimeGrid(_))
        ));
    }

    #[test]
    fn test_single_time_point_returns_initial_state() {
        let out = Integrator::Auto
            .solve(&Decay { rate: 1.0 }, [3.0], &[4.0], &IntegratorOptions::default())
            .unwrap();
        assert_eq!(out, vec![[3.0]]);
    }

    #[test]
    fn test_nan_rhs_is_reported() {
        struct Broken;
        impl OdeSystem<1> for Broken {
            fn rhs(&self, _t: f64, _y: &[f64; 1]) -> [f64; 1] {
                [f64::NAN]
            }
        }
        let result = Integrator::Auto.solve(&Broken, [1.0], &[0.0, 1.0], &IntegratorOptions::default());
        assert!(result.is_err());
    }
}
