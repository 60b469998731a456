//! # Session
//!
//! JSON snapshot of a fitting session: model configuration (integrator
//! settings included), observed data, search bounds, and optionally the best
//! parameters found and the options used. Re-importing a session rebuilds a
//! model that scores the stored parameters exactly as before.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::model::{Observations, SeirModel};
//! use acor_seir::session::Session;
//!
//! let observations = Observations::new(vec![0.0, 1.0, 2.0], vec![1.0, 4.0, 9.0]).unwrap();
//! let model = SeirModel::default().with_observations(observations);
//! let session = Session::from_model(&model, model.default_bounds());
//!
//! let json = session.to_json().unwrap();
//! let restored = Session::from_json(&json).unwrap();
//! assert_eq!(restored.bounds, session.bounds);
//! ```

use serde::{Deserialize, Serialize};

use crate::acor::AcorOptions;
use crate::bounds::Bounds;
use crate::error::{AcorError, Result};
use crate::model::{HarmonicConfig, LossKind, Observations, SeirModel};
use crate::ode::{Integrator, IntegratorOptions};

/// Serializable state of one fitting session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub harmonics: HarmonicConfig,
    pub population: u64,
    pub loss: LossKind,
    #[serde(default)]
    pub integrator: Integrator,
    #[serde(default)]
    pub integrator_options: IntegratorOptions,
    #[serde(default)]
    pub observations: Option<Observations>,
    pub bounds: Bounds,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub best_params: Option<Vec<f64>>,
    /// Only finite costs are stored.
    #[serde(default)]
    pub best_cost: Option<f64>,
    #[serde(default)]
    pub options: Option<AcorOptions>,
}

impl Session {
    /// Captures the configuration and data of `model` with the given bounds.
    pub fn from_model(model: &SeirModel, bounds: Bounds) -> Self {
        Self {
            harmonics: model.harmonics(),
            population: model.population(),
            loss: model.loss(),
            integrator: model.integrator(),
            integrator_options: *model.integrator_options(),
            observations: model.observations().cloned(),
            bounds,
            labels: model.labels(),
            best_params: None,
            best_cost: None,
            options: None,
        }
    }

    pub fn with_best(mut self, params: Vec<f64>, cost: f64) -> Self {
        self.best_params = Some(params);
        self.best_cost = cost.is_finite().then_some(cost);
        self
    }

    pub fn with_options(mut self, options: AcorOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Checks the cross-field invariants: the bounds and the stored best
    /// parameters match the dimension of the harmonic configuration.
    pub fn validate(&self) -> Result<()> {
        self.harmonics.validate()?;
        self.bounds.validate()?;
        self.loss.validate()?;
        if let Some(observations) = &self.observations {
            observations.validate()?;
        }
        if let Some(options) = &self.options {
            options.validate()?;
        }
        let tolerances = &self.integrator_options;
        if !(tolerances.rtol > 0.0 && tolerances.atol > 0.0) || tolerances.max_steps == 0 {
            return Err(AcorError::Configuration(format!(
                "Session integrator options are invalid: {:?}",
                tolerances
            )));
        }
        let dim = self.harmonics.dimension();
        if self.bounds.dim() != dim {
            return Err(AcorError::Configuration(format!(
                "Session bounds have {} components, the model needs {}",
                self.bounds.dim(),
                dim
            )));
        }
        if let Some(params) = &self.best_params {
            if params.len() != dim {
                return Err(AcorError::Configuration(format!(
                    "Session best parameters have {} components, the model needs {}",
                    params.len(),
                    dim
                )));
            }
        }
        Ok(())
    }

    /// Rebuilds the model described by this session.
    pub fn build_model(&self) -> Result<SeirModel> {
        let model = SeirModel::new(self.harmonics)?
            .with_population(self.population)?
            .with_loss(self.loss)?
            .with_integrator(self.integrator, self.integrator_options);
        Ok(match &self.observations {
            Some(observations) => model.with_observations(observations.clone()),
            None => model,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a session.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Session = serde_json::from_str(json)?;
        session.validate()?;
        Ok(session)
    }
}
