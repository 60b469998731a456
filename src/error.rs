//! # Error Types
//!
//! This module defines the error type shared by the whole crate. Errors fall
//! into a few families:
//!
//! - configuration problems detected before a run starts (invalid bounds,
//!   an archive that is too small, missing observed data),
//! - runtime failures caught at the run boundary,
//! - integration failures, which the fitness function turns into an
//!   infinite cost and never lets escape a run.
//!
//! ## Examples
//!
//! Using the `Result` type:
//!
//! ```rust
//! use acor_seir::error::{AcorError, Result};
//!
//! fn check_archive(size: usize) -> Result<()> {
//!     if size <= 1 {
//!         return Err(AcorError::Configuration("archive too small".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_archive(1).is_err());
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use acor_seir::error::{AcorError, OptionExt};
//!
//! fn first_cost(costs: &[f64]) -> acor_seir::error::Result<f64> {
//!     costs.first().copied().ok_or_else_acor(|| {
//!         AcorError::Runtime("empty archive".to_string())
//!     })
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::ode::IntegrationError;

/// Represents errors that can occur while configuring or running an optimization.
#[derive(Error, Debug)]
pub enum AcorError {
    /// Invalid options, bounds or model data, reported before a run starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An unexpected failure inside the iterate loop.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The ODE integrator failed. Fitness evaluation maps this to an infinite cost.
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    /// The evaluation thread pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// A numeric expression could not be parsed.
    #[error("Invalid expression: {0}")]
    Expression(String),

    /// A session could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error that occurs when an I/O operation fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

impl From<rayon::ThreadPoolBuildError> for AcorError {
    fn from(error: rayon::ThreadPoolBuildError) -> Self {
        AcorError::ThreadPool(error.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for AcorError {
    fn from(error: serde_json::Error) -> Self {
        AcorError::Serialization(error.to_string())
    }
}

/// A specialized Result type for optimizer operations.
pub type Result<T> = std::result::Result<T, AcorError>;

/// Extension trait for Result to add context to errors.
///
/// ## Examples
///
/// ```rust
/// use acor_seir::error::ResultExt;
/// use std::fs::File;
///
/// fn open_session(path: &str) -> acor_seir::error::Result<()> {
///     File::open(path).context("Failed to open session file")?;
///     Ok(())
/// }
/// ```
pub trait ResultExt<T, E> {
    /// Converts the error into an `AcorError::Other` prefixed with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| AcorError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, AcorError>` using a closure to build the error.
    fn ok_or_else_acor<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> AcorError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_acor<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> AcorError,
    {
        self.ok_or_else(err_fn)
    }
}
