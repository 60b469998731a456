//! # acor-seir
//!
//! Fits a harmonic SEIR epidemic model to an observed infection series with a
//! multi-colony ACOR optimizer.
//!
//! - [`model`]: the SEIR ODE system with time-varying harmonic rates and its
//!   fitness function.
//! - [`ode`]: adaptive Dormand–Prince and Rosenbrock integrators.
//! - [`acor`]: archives, colonies, migration, local search, refinement and the
//!   optimizer loop.
//! - [`pool`]: the parallel evaluation pool.
//! - [`controller`]: background execution with progress events and
//!   cooperative cancellation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use acor_seir::acor::{AcorOptimizer, AcorOptions, RunLimits};
//! use acor_seir::model::{Observations, SeirModel};
//!
//! let observations = Observations::new(
//!     (0..15).map(f64::from).collect(),
//!     vec![1.0, 3.0, 8.0, 28.0, 75.0, 221.0, 281.0, 255.0, 235.0, 190.0, 125.0, 70.0, 28.0, 12.0, 5.0],
//! )?;
//! let model = SeirModel::default().with_observations(observations);
//! let bounds = model.default_bounds();
//!
//! let mut optimizer = AcorOptimizer::new(model, bounds, AcorOptions::default())?;
//! let solution = optimizer.optimize(RunLimits::default().with_plateau(100))?;
//! println!("best cost {:.3e} after {} iterations", solution.cost, solution.iterations);
//! # Ok::<(), acor_seir::AcorError>(())
//! ```

pub mod acor;
pub mod bounds;
pub mod caching;
pub mod challenge;
pub mod controller;
pub mod error;
pub mod expr;
pub mod model;
pub mod ode;
pub mod pool;
pub mod rng;
#[cfg(feature = "serde")]
pub mod session;

// Re-export commonly used types for convenience
pub use acor::{AcorOptimizer, AcorOptions, RunLimits, Solution, StopReason};
pub use bounds::Bounds;
pub use challenge::Challenge;
pub use controller::{Controller, RunEvent, RunHandle, RunResult};
pub use error::{AcorError, OptionExt, Result, ResultExt};
pub use expr::parse_numeric;
pub use model::{information_criteria, Observations, SeirModel};
