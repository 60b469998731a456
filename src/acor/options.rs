//! # AcorOptions
//!
//! The `AcorOptions` struct holds the configuration of one optimization run:
//! colony and archive sizes, the exploration factor `q`, migration cadence,
//! and the switches and cadences of the intensification strategies (local
//! search, opposition-based learning, greedy refinement). Options are
//! supplied once at optimizer construction and never change during a run.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::acor::options::{AcorOptions, LogLevel};
//!
//! // Defaults: 90 ants, archive of 40, 1500 iterations, 4 colonies.
//! let defaults = AcorOptions::default();
//! assert_eq!(defaults.get_archive_size(), 40);
//!
//! let options = AcorOptions::builder()
//!     .n_ants(30)
//!     .archive_size(10)
//!     .max_iter(200)
//!     .colonies(2)
//!     .log_level(LogLevel::Minimal)
//!     .seed(42)
//!     .build();
//! assert!(options.validate().is_ok());
//! ```
//!
//! ## `LogLevel`
//!
//! - `Verbose`: one event per iteration plus per-colony and strategy events.
//! - `Minimal`: one event per iteration.
//! - `None`: only stop reasons and failures are logged.

use std::time::Duration;

use crate::error::{AcorError, Result};

pub use crate::caching::CacheType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogLevel {
    Verbose,
    Minimal,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcorOptions {
    n_ants: usize,
    archive_size: usize,
    max_iter: usize,
    q: f64,
    colonies: usize,
    migration_interval: usize,
    migration_size: usize,
    local_search_enabled: bool,
    local_search_radius: f64,
    local_search_points: usize,
    local_search_frequency: usize,
    obl_enabled: bool,
    refinement_enabled: bool,
    refinement_frequency: usize,
    refinement_step: f64,
    log_level: LogLevel,
    cache_type: CacheType,
    seed: Option<u64>,
    /// Overrides the default pool size of 80% of the logical processors.
    worker_threads: Option<usize>,
    /// Batches smaller than this are evaluated on the optimizer thread.
    parallel_threshold: usize,
}

impl AcorOptions {
    /// Returns a builder for creating an `AcorOptions` instance.
    ///
    /// Every option left unset keeps its default value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use acor_seir::acor::options::AcorOptions;
    ///
    /// let options = AcorOptions::builder()
    ///     .local_search(false)
    ///     .refinement(true)
    ///     .refinement_frequency(10)
    ///     .build();
    /// assert!(!options.is_local_search_enabled());
    /// ```
    pub fn builder() -> AcorOptionsBuilder {
        AcorOptionsBuilder::default()
    }

    /// Checks the option ranges.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` for an archive of one or fewer
    /// members, zero ants, colonies, iterations or cadences, more migrants
    /// than archive slots, a non-positive `q`, or a negative radius or step.
    pub fn validate(&self) -> Result<()> {
        let config_error = |msg: String| Err(AcorError::Configuration(msg));

        if self.archive_size <= 1 {
            return config_error(format!(
                "Archive size must be greater than 1, got {}",
                self.archive_size
            ));
        }
        if self.n_ants == 0 {
            return config_error("Number of ants cannot be zero".to_string());
        }
        if self.max_iter == 0 {
            return config_error("Maximum iterations cannot be zero".to_string());
        }
        if self.colonies == 0 {
            return config_error("Number of colonies cannot be zero".to_string());
        }
        if !self.q.is_finite() || self.q <= 0.0 {
            return config_error(format!("q must be positive, got {}", self.q));
        }
        if self.migration_interval == 0 {
            return config_error("Migration interval cannot be zero".to_string());
        }
        if self.migration_size > self.archive_size {
            return config_error(format!(
                "Migration size {} exceeds archive size {}",
                self.migration_size, self.archive_size
            ));
        }
        if self.local_search_frequency == 0 || self.refinement_frequency == 0 {
            return config_error("Local search and refinement frequencies cannot be zero".to_string());
        }
        if !self.local_search_radius.is_finite() || self.local_search_radius < 0.0 {
            return config_error(format!(
                "Local search radius must be non-negative, got {}",
                self.local_search_radius
            ));
        }
        if !self.refinement_step.is_finite() || self.refinement_step < 0.0 {
            return config_error(format!(
                "Refinement step must be non-negative, got {}",
                self.refinement_step
            ));
        }
        if self.worker_threads == Some(0) {
            return config_error("Worker thread count cannot be zero".to_string());
        }
        Ok(())
    }

    pub fn get_n_ants(&self) -> usize {
        self.n_ants
    }

    pub fn get_archive_size(&self) -> usize {
        self.archive_size
    }

    pub fn get_max_iter(&self) -> usize {
        self.max_iter
    }

    /// Exploration factor scaling the kernel spread.
    pub fn get_q(&self) -> f64 {
        self.q
    }

    pub fn get_colonies(&self) -> usize {
        self.colonies
    }

    pub fn get_migration_interval(&self) -> usize {
        self.migration_interval
    }

    pub fn get_migration_size(&self) -> usize {
        self.migration_size
    }

    pub fn is_local_search_enabled(&self) -> bool {
        self.local_search_enabled
    }

    pub fn get_local_search_radius(&self) -> f64 {
        self.local_search_radius
    }

    pub fn get_local_search_points(&self) -> usize {
        self.local_search_points
    }

    pub fn get_local_search_frequency(&self) -> usize {
        self.local_search_frequency
    }

    pub fn is_obl_enabled(&self) -> bool {
        self.obl_enabled
    }

    pub fn is_refinement_enabled(&self) -> bool {
        self.refinement_enabled
    }

    pub fn get_refinement_frequency(&self) -> usize {
        self.refinement_frequency
    }

    pub fn get_refinement_step(&self) -> f64 {
        self.refinement_step
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn get_cache_type(&self) -> CacheType {
        self.cache_type
    }

    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn get_worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }

    pub fn get_parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    /// Sets the log level.
    pub fn set_log_level(&mut self, log_level: LogLevel) {
        self.log_level = log_level;
    }

    /// Sets the RNG seed used by the next run.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }
}

impl Default for AcorOptions {
    fn default() -> Self {
        AcorOptionsBuilder::default().build()
    }
}

/// Per-run stop limits handed to `optimize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunLimits {
    /// Wall-clock budget, checked at iteration boundaries.
    pub time_limit: Option<Duration>,
    /// Consecutive iterations without global improvement before stopping.
    pub plateau: Option<usize>,
}

impl RunLimits {
    pub fn new(time_limit: Option<Duration>, plateau: Option<usize>) -> Self {
        Self {
            time_limit,
            plateau,
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn with_plateau(mut self, plateau: usize) -> Self {
        self.plateau = Some(plateau);
        self
    }
}

/// Builder for `AcorOptions`.
///
/// Provides a fluent interface for constructing `AcorOptions` instances.
#[derive(Debug, Clone, Default)]
pub struct AcorOptionsBuilder {
    n_ants: Option<usize>,
    archive_size: Option<usize>,
    max_iter: Option<usize>,
    q: Option<f64>,
    colonies: Option<usize>,
    migration_interval: Option<usize>,
    migration_size: Option<usize>,
    local_search_enabled: Option<bool>,
    local_search_radius: Option<f64>,
    local_search_points: Option<usize>,
    local_search_frequency: Option<usize>,
    obl_enabled: Option<bool>,
    refinement_enabled: Option<bool>,
    refinement_frequency: Option<usize>,
    refinement_step: Option<f64>,
    log_level: Option<LogLevel>,
    cache_type: Option<CacheType>,
    seed: Option<u64>,
    worker_threads: Option<usize>,
    parallel_threshold: Option<usize>,
}

impl AcorOptionsBuilder {
    /// Sets the number of candidates generated per colony and iteration.
    pub fn n_ants(mut self, value: usize) -> Self {
        self.n_ants = Some(value);
        self
    }

    /// Sets the archive size of every colony.
    pub fn archive_size(mut self, value: usize) -> Self {
        self.archive_size = Some(value);
        self
    }

    pub fn max_iter(mut self, value: usize) -> Self {
        self.max_iter = Some(value);
        self
    }

    pub fn q(mut self, value: f64) -> Self {
        self.q = Some(value);
        self
    }

    pub fn colonies(mut self, value: usize) -> Self {
        self.colonies = Some(value);
        self
    }

    pub fn migration_interval(mut self, value: usize) -> Self {
        self.migration_interval = Some(value);
        self
    }

    pub fn migration_size(mut self, value: usize) -> Self {
        self.migration_size = Some(value);
        self
    }

    /// Enables or disables local search around each colony's best.
    pub fn local_search(mut self, enabled: bool) -> Self {
        self.local_search_enabled = Some(enabled);
        self
    }

    pub fn local_search_radius(mut self, value: f64) -> Self {
        self.local_search_radius = Some(value);
        self
    }

    pub fn local_search_points(mut self, value: usize) -> Self {
        self.local_search_points = Some(value);
        self
    }

    pub fn local_search_frequency(mut self, value: usize) -> Self {
        self.local_search_frequency = Some(value);
        self
    }

    /// Enables or disables opposition-based initialization.
    pub fn obl(mut self, enabled: bool) -> Self {
        self.obl_enabled = Some(enabled);
        self
    }

    /// Enables or disables greedy refinement of the global best.
    pub fn refinement(mut self, enabled: bool) -> Self {
        self.refinement_enabled = Some(enabled);
        self
    }

    pub fn refinement_frequency(mut self, value: usize) -> Self {
        self.refinement_frequency = Some(value);
        self
    }

    pub fn refinement_step(mut self, value: f64) -> Self {
        self.refinement_step = Some(value);
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.log_level = Some(value);
        self
    }

    pub fn cache_type(mut self, value: CacheType) -> Self {
        self.cache_type = Some(value);
        self
    }

    /// Seeds the run's random number generator for reproducible runs.
    pub fn seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    pub fn worker_threads(mut self, value: usize) -> Self {
        self.worker_threads = Some(value);
        self
    }

    /// Sets the parallel threshold.
    pub fn parallel_threshold(mut self, value: usize) -> Self {
        self.parallel_threshold = Some(value);
        self
    }

    /// Builds the `AcorOptions` instance.
    pub fn build(self) -> AcorOptions {
        AcorOptions {
            n_ants: self.n_ants.unwrap_or(90),
            archive_size: self.archive_size.unwrap_or(40),
            max_iter: self.max_iter.unwrap_or(1500),
            q: self.q.unwrap_or(0.7),
            colonies: self.colonies.unwrap_or(4),
            migration_interval: self.migration_interval.unwrap_or(25),
            migration_size: self.migration_size.unwrap_or(2),
            local_search_enabled: self.local_search_enabled.unwrap_or(true),
            local_search_radius: self.local_search_radius.unwrap_or(0.1),
            local_search_points: self.local_search_points.unwrap_or(10),
            local_search_frequency: self.local_search_frequency.unwrap_or(5),
            obl_enabled: self.obl_enabled.unwrap_or(true),
            refinement_enabled: self.refinement_enabled.unwrap_or(true),
            refinement_frequency: self.refinement_frequency.unwrap_or(50),
            refinement_step: self.refinement_step.unwrap_or(0.05),
            log_level: self.log_level.unwrap_or_default(),
            cache_type: self.cache_type.unwrap_or_default(),
            seed: self.seed,
            worker_threads: self.worker_threads,
            parallel_threshold: self.parallel_threshold.unwrap_or(2),
        }
    }
}
