//! # SEIR model
//!
//! A four-compartment (S, E, I, R) epidemic model whose transmission,
//! recovery and incubation rates vary in time through harmonic terms. The
//! model owns the observed infected series and scores a parameter vector by
//! integrating the ODE system over the observed time grid and comparing the
//! predicted infected counts against the data.
//!
//! [`SeirModel`] implements [`Challenge`], so it is directly usable as the
//! objective of an [`AcorOptimizer`](crate::acor::AcorOptimizer). Scoring is a
//! pure function of the parameter vector and the model's immutable data: any
//! integration failure or non-finite prediction yields `f64::INFINITY`.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::model::{Observations, SeirModel};
//! use acor_seir::Challenge;
//!
//! let observations = Observations::new(
//!     (0..15).map(f64::from).collect(),
//!     vec![1.0, 3.0, 8.0, 28.0, 75.0, 221.0, 281.0, 255.0, 235.0, 190.0, 125.0, 70.0, 28.0, 12.0, 5.0],
//! )
//! .unwrap();
//! let model = SeirModel::default().with_observations(observations);
//!
//! let params = model.default_bounds().midpoint();
//! let cost = model.score(&params);
//! assert!(cost.is_finite() && cost >= 0.0);
//! ```

pub mod harmonic;
pub mod loss;

use std::f64::consts::PI;

use crate::bounds::Bounds;
use crate::challenge::Challenge;
use crate::error::{AcorError, Result};
use crate::ode::{IntegrationError, Integrator, IntegratorOptions, OdeSystem};

pub use harmonic::{HarmonicConfig, ParameterLayout, Rate, RateSlot, Rates, MAX_HARMONICS};
pub use loss::LossKind;

/// Population used when none is configured.
pub const DEFAULT_POPULATION: u64 = 763;

/// Paired observation times and infected counts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observations {
    times: Vec<f64>,
    infected: Vec<f64>,
}

impl Observations {
    /// Creates a validated observation series.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` if the series are empty, differ in
    /// length, contain non-finite values, or the times are not strictly increasing.
    pub fn new(times: Vec<f64>, infected: Vec<f64>) -> Result<Self> {
        let observations = Self { times, infected };
        observations.validate()?;
        Ok(observations)
    }

    pub fn validate(&self) -> Result<()> {
        if self.times.is_empty() {
            return Err(AcorError::Configuration(
                "Observed series must not be empty".to_string(),
            ));
        }
        if self.times.len() != self.infected.len() {
            return Err(AcorError::Configuration(format!(
                "Observed times ({}) and infected counts ({}) differ in length",
                self.times.len(),
                self.infected.len()
            )));
        }
        if let Some(i) = self
            .times
            .iter()
            .chain(&self.infected)
            .position(|v| !v.is_finite())
        {
            return Err(AcorError::Configuration(format!(
                "Observed series contains a non-finite value at position {}",
                i % self.times.len()
            )));
        }
        if let Some(w) = self.times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AcorError::Configuration(format!(
                "Observed times must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }
        Ok(())
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn infected(&self) -> &[f64] {
        &self.infected
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// S, E, I, R state at one time point.
pub type SeirState = [f64; 4];

/// Harmonic SEIR model bound to an observed series.
#[derive(Debug, Clone)]
pub struct SeirModel {
    observations: Option<Observations>,
    population: u64,
    layout: ParameterLayout,
    loss: LossKind,
    integrator: Integrator,
    integrator_options: IntegratorOptions,
}

impl SeirModel {
    /// Creates a model without data for the given harmonic configuration.
    pub fn new(harmonics: HarmonicConfig) -> Result<Self> {
        Ok(Self {
            observations: None,
            population: DEFAULT_POPULATION,
            layout: ParameterLayout::new(harmonics)?,
            loss: LossKind::default(),
            integrator: Integrator::default(),
            integrator_options: IntegratorOptions::default(),
        })
    }

    pub fn with_observations(mut self, observations: Observations) -> Self {
        self.observations = Some(observations);
        self
    }

    /// Sets the population size `N`.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` when `population` is zero.
    pub fn with_population(mut self, population: u64) -> Result<Self> {
        if population == 0 {
            return Err(AcorError::Configuration(
                "Population size must be positive".to_string(),
            ));
        }
        self.population = population;
        Ok(self)
    }

    pub fn with_loss(mut self, loss: LossKind) -> Result<Self> {
        loss.validate()?;
        self.loss = loss;
        Ok(self)
    }

    pub fn with_integrator(mut self, integrator: Integrator, options: IntegratorOptions) -> Self {
        self.integrator = integrator;
        self.integrator_options = options;
        self
    }

    pub fn observations(&self) -> Option<&Observations> {
        self.observations.as_ref()
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn loss(&self) -> LossKind {
        self.loss
    }

    pub fn harmonics(&self) -> HarmonicConfig {
        self.layout.config()
    }

    pub fn layout(&self) -> &ParameterLayout {
        &self.layout
    }

    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    pub fn integrator_options(&self) -> &IntegratorOptions {
        &self.integrator_options
    }

    /// Dimension of the parameter vector.
    pub fn dim(&self) -> usize {
        self.layout.dim()
    }

    pub fn labels(&self) -> Vec<String> {
        self.layout.labels()
    }

    pub fn default_bounds(&self) -> Bounds {
        self.layout.default_bounds()
    }

    /// Initial state derived from the first observation and the ratio `k`.
    ///
    /// `E0 = round(I0 * k)` (ties to even), `R0 = 0`, `S0 = max(0, N - E0 - I0)`.
    /// Returns `None` when no data is loaded.
    pub fn initial_state(&self, k: f64) -> Option<SeirState> {
        let infected0 = *self.observations.as_ref()?.infected.first()?;
        let exposed0 = (infected0 * k).round_ties_even();
        let recovered0 = 0.0;
        let susceptible0 = (self.population as f64 - exposed0 - infected0 - recovered0).max(0.0);
        Some([susceptible0, exposed0, infected0, recovered0])
    }

    /// Right-hand side of the SEIR system at time `t`.
    pub fn derivatives(&self, t: f64, y: &SeirState, params: &[f64]) -> SeirState {
        let [s, e, i, _r] = *y;
        let Rates { beta, gamma, sigma } = self.layout.rates_at(params, t);
        let infection = beta * s * i / self.population as f64;
        [
            -infection,
            infection - sigma * e,
            sigma * e - gamma * i,
            gamma * i,
        ]
    }

    /// Integrates the model over the observed time grid.
    ///
    /// # Errors
    ///
    /// `Configuration` when no data is loaded or the parameter vector has the
    /// wrong length, `Integration` when the integrator fails.
    pub fn simulate(&self, params: &[f64]) -> Result<Vec<SeirState>> {
        let observations = self.observations.as_ref().ok_or_else(|| {
            AcorError::Configuration("No observed data loaded".to_string())
        })?;
        self.simulate_on(params, &observations.times)
    }

    /// Integrates the model over an arbitrary strictly increasing grid, e.g. for
    /// plotting a forecast past the last observation.
    pub fn simulate_on(&self, params: &[f64], times: &[f64]) -> Result<Vec<SeirState>> {
        self.check_params(params)?;
        let k = params[self.layout.k_index()];
        let y0 = self
            .initial_state(k)
            .ok_or_else(|| AcorError::Configuration("No observed data loaded".to_string()))?;
        let system = HarmonicSeir {
            model: self,
            params,
        };
        let states = self
            .integrator
            .solve(&system, y0, times, &self.integrator_options)?;
        if let Some(pos) = states.iter().position(|s| s.iter().any(|v| !v.is_finite())) {
            return Err(IntegrationError::NonFinite { t: times[pos] }.into());
        }
        Ok(states)
    }

    /// Predicted infected counts over the observed time grid.
    pub fn predict_infected(&self, params: &[f64]) -> Result<Vec<f64>> {
        Ok(self.simulate(params)?.iter().map(|s| s[2]).collect())
    }

    /// Decoded `beta(t)`, `gamma(t)`, `sigma(t)` at each of `times`.
    pub fn rates(&self, params: &[f64], times: &[f64]) -> Result<Vec<Rates>> {
        self.check_params(params)?;
        Ok(times
            .iter()
            .map(|&t| self.layout.rates_at(params, t))
            .collect())
    }

    /// Loss between observed and predicted infected counts.
    ///
    /// Never fails: missing data, a wrong-length vector, integration failure
    /// or a non-finite prediction all score `f64::INFINITY`.
    pub fn fitness(&self, params: &[f64]) -> f64 {
        let Some(observations) = self.observations.as_ref() else {
            return f64::INFINITY;
        };
        match self.predict_infected(params) {
            Ok(predicted) => {
                let cost = self.loss.evaluate(&observations.infected, &predicted);
                if cost.is_nan() {
                    f64::INFINITY
                } else {
                    cost
                }
            }
            Err(_) => f64::INFINITY,
        }
    }

    fn check_params(&self, params: &[f64]) -> Result<()> {
        if params.len() != self.layout.dim() {
            return Err(AcorError::Configuration(format!(
                "Expected {} parameters, got {}",
                self.layout.dim(),
                params.len()
            )));
        }
        Ok(())
    }
}

impl Default for SeirModel {
    fn default() -> Self {
        Self {
            observations: None,
            population: DEFAULT_POPULATION,
            layout: ParameterLayout::default(),
            loss: LossKind::default(),
            integrator: Integrator::default(),
            integrator_options: IntegratorOptions::default(),
        }
    }
}

impl Challenge for SeirModel {
    fn score(&self, params: &[f64]) -> f64 {
        self.fitness(params)
    }

    fn validate(&self) -> Result<()> {
        match &self.observations {
            Some(observations) => observations.validate(),
            None => Err(AcorError::Configuration(
                "No observed data loaded".to_string(),
            )),
        }
    }
}

/// The model with one parameter vector bound, as seen by the integrator.
struct HarmonicSeir<'a> {
    model: &'a SeirModel,
    params: &'a [f64],
}

impl OdeSystem<4> for HarmonicSeir<'_> {
    #[inline]
    fn rhs(&self, t: f64, y: &SeirState) -> SeirState {
        self.model.derivatives(t, y, self.params)
    }
}

/// Akaike and Bayesian information criteria for a fit with Gaussian residuals.
///
/// Returns `(f64::INFINITY, f64::INFINITY)` when `mse < 1e-12` or `n == 0`.
pub fn information_criteria(mse: f64, num_params: usize, n: usize) -> (f64, f64) {
    if mse < 1e-12 || n == 0 {
        return (f64::INFINITY, f64::INFINITY);
    }
    let n = n as f64;
    let p = num_params as f64;
    let log_likelihood = -n / 2.0 * ((2.0 * PI).ln() + mse.ln() + 1.0);
    let aic = 2.0 * p - 2.0 * log_likelihood;
    let bic = p * n.ln() - 2.0 * log_likelihood;
    (aic, bic)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLU: [f64; 15] = [
        1.0, 3.0, 8.0, 28.0, 75.0, 221.0, 281.0, 255.0, 235.0, 190.0, 125.0, 70.0, 28.0, 12.0,
        5.0,
    ];

    fn flu_model() -> SeirModel {
        let observations = Observations::new((0..15).map(f64::from).collect(), FLU.to_vec()).unwrap();
        SeirModel::default().with_observations(observations)
    }

    #[test]
    fn test_observations_validation() {
        assert!(Observations::new(vec![], vec![]).is_err());
        assert!(Observations::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Observations::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_err());
        assert!(Observations::new(vec![0.0, 1.0], vec![1.0, f64::NAN]).is_err());
        assert!(Observations::new(vec![0.0, 1.0], vec![1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_initial_conditions() {
        let observations = Observations::new(vec![0.0, 1.0], vec![10.0, 12.0]).unwrap();
        let model = SeirModel::default()
            .with_observations(observations)
            .with_population(1000)
            .unwrap();
        assert_eq!(model.initial_state(1.5), Some([975.0, 15.0, 10.0, 0.0]));
    }

    #[test]
    fn test_initial_susceptible_never_negative() {
        let observations = Observations::new(vec![0.0, 1.0], vec![600.0, 500.0]).unwrap();
        let model = SeirModel::default().with_observations(observations);
        let [s, e, i, r] = model.initial_state(1.5).unwrap();
        assert_eq!(s, 0.0);
        assert_eq!(e, 900.0);
        assert_eq!(i, 600.0);
        assert_eq!(r, 0.0);
    }

    #[test]
    fn test_fitness_without_data_is_infinite() {
        let model = SeirModel::default();
        let params = model.default_bounds().midpoint();
        assert_eq!(model.fitness(&params), f64::INFINITY);
        assert!(Challenge::validate(&model).is_err());
    }

    #[test]
    fn test_fitness_wrong_length_is_infinite() {
        let model = flu_model();
        assert_eq!(model.fitness(&[0.0; 5]), f64::INFINITY);
    }

    #[test]
    fn test_midpoint_fitness_is_finite_and_repeatable() {
        let model = flu_model();
        let params = model.default_bounds().midpoint();
        let first = model.fitness(&params);
        assert!(first.is_finite());
        assert!(first >= 0.0);
        assert_eq!(first, model.fitness(&params));
    }

    #[test]
    fn test_compartments_conserve_population() {
        let model = flu_model();
        let params = model.default_bounds().midpoint();
        let states = model.simulate(&params).unwrap();
        assert_eq!(states.len(), 15);
        let total0: f64 = states[0].iter().sum();
        for state in &states {
            let total: f64 = state.iter().sum();
            assert!((total - total0).abs() < 1e-4 * total0);
        }
    }

    #[test]
    fn test_rates_with_zero_amplitudes_are_constant() {
        let model = flu_model();
        let params = model.default_bounds().midpoint();
        let rates = model.rates(&params, &[0.0, 7.0, 14.0]).unwrap();
        // Midpoint baselines are 0, so every rate is exp(0) = 1.
        for r in rates {
            assert!((r.beta - 1.0).abs() < 1e-12);
            assert!((r.gamma - 1.0).abs() < 1e-12);
            assert!((r.sigma - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_information_criteria() {
        let (aic, bic) = information_criteria(4.0, 3, 10);
        let ll = -5.0 * ((2.0 * PI).ln() + 4.0f64.ln() + 1.0);
        assert!((aic - (6.0 - 2.0 * ll)).abs() < 1e-12);
        assert!((bic - (3.0 * 10.0f64.ln() - 2.0 * ll)).abs() < 1e-12);
        assert_eq!(information_criteria(0.0, 3, 10), (f64::INFINITY, f64::INFINITY));
        assert_eq!(information_criteria(1.0, 3, 0), (f64::INFINITY, f64::INFINITY));
    }
}
