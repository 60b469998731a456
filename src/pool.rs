//! # Evaluation pool
//!
//! A dedicated rayon thread pool that scores batches of candidate vectors.
//! The pool is built once per run and reused by every batch of that run. It
//! only ever sees a [`Challenge`]: progress sinks and other optimizer state
//! stay on the optimizer's own thread.
//!
//! Every evaluation is isolated: a panicking or NaN-returning challenge
//! scores `f64::INFINITY` for that candidate instead of tearing down the batch.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::warn;

use crate::challenge::Challenge;
use crate::error::Result;

/// Fraction of the logical processors given to evaluation workers.
const WORKER_FRACTION: f64 = 0.8;

/// Default worker count: `max(1, floor(0.8 * logical processors))`.
pub fn default_worker_count() -> usize {
    let logical = thread::available_parallelism().map_or(1, |n| n.get());
    ((logical as f64 * WORKER_FRACTION) as usize).max(1)
}

/// Thread pool scoring candidate batches in parallel.
pub struct EvaluationPool {
    pool: ThreadPool,
    parallel_threshold: usize,
}

impl EvaluationPool {
    /// Builds a pool of `workers` threads, or [`default_worker_count`] when `None`.
    ///
    /// Batches with fewer than `parallel_threshold` candidates are scored on
    /// the calling thread.
    pub fn new(workers: Option<usize>, parallel_threshold: usize) -> Result<Self> {
        let num_threads = workers.unwrap_or_else(default_worker_count).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("acor-eval-{}", i))
            .build()?;
        Ok(Self {
            pool,
            parallel_threshold,
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Scores every vector of `batch`, preserving order.
    pub fn evaluate(&self, challenge: &dyn Challenge, batch: &[Vec<f64>]) -> Vec<f64> {
        if batch.len() < self.parallel_threshold || self.num_threads() == 1 {
            return batch.iter().map(|p| score_isolated(challenge, p)).collect();
        }
        self.pool.install(|| {
            batch
                .par_iter()
                .map(|p| score_isolated(challenge, p))
                .collect()
        })
    }
}

impl std::fmt::Debug for EvaluationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationPool")
            .field("num_threads", &self.num_threads())
            .field("parallel_threshold", &self.parallel_threshold)
            .finish()
    }
}

/// Scores one vector, mapping panics and NaN to `f64::INFINITY`.
fn score_isolated(challenge: &dyn Challenge, params: &[f64]) -> f64 {
    match panic::catch_unwind(AssertUnwindSafe(|| challenge.score(params))) {
        Ok(cost) if cost.is_nan() => f64::INFINITY,
        Ok(cost) => cost,
        Err(_) => {
            warn!("fitness evaluation panicked; scoring the candidate as infinite");
            f64::INFINITY
        }
    }
}
