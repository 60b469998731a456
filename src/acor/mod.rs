//! # ACOR
//!
//! Multi-colony Ant Colony Optimization for continuous domains.
//!
//! Every colony keeps a cost-sorted archive. Each iteration a colony samples
//! `n_ants` candidates from Gaussian kernels centred on archive members
//! chosen with rank-based weights, scores them in parallel, and keeps the
//! best `archive_size` of old and new members. On top of that loop:
//!
//! - opposition-based learning widens the initial population with reflected
//!   candidates,
//! - local search perturbs each colony's best every `local_search_frequency`
//!   iterations,
//! - ring migration copies each colony's elite into the next colony every
//!   `migration_interval` iterations,
//! - greedy refinement steps along every coordinate of the global best every
//!   `refinement_frequency` iterations.
//!
//! Runs stop on cancellation, a time limit, a plateau of the global best, or
//! after `max_iter` iterations, checked in that order at the top of each
//! iteration.

pub mod archive;
pub mod colony;
pub mod migration;
pub mod optimizer;
pub mod options;
pub mod progress;
pub mod refinement;
pub mod stop;

pub use archive::{Archive, Candidate};
pub use colony::{initial_population_size, Colony};
pub use optimizer::{AcorOptimizer, Solution};
pub use options::{AcorOptions, AcorOptionsBuilder, CacheType, LogLevel, RunLimits};
pub use progress::{Progress, ProgressKind, ProgressSink};
pub use stop::{CancellationToken, StopReason};
