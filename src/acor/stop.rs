//! Stop conditions and cooperative cancellation.
//!
//! Stop conditions are only ever checked at the top of an iteration, so an
//! in-flight evaluation batch always completes first. A time limit can
//! therefore be overrun by up to one iteration's worth of evaluations, and a
//! stop request takes effect one iteration boundary later.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::options::RunLimits;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// A stop was requested through the cancellation token.
    Cancelled,
    /// The wall-clock budget was exhausted.
    TimeLimit,
    /// The global best did not improve for the given number of iterations.
    Plateau(usize),
    /// All iterations ran.
    MaxIterations,
    /// The run loop failed; the optimizer holds whatever state was reached.
    Failed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "Stopped."),
            StopReason::TimeLimit => write!(f, "Time limit reached."),
            StopReason::Plateau(k) => write!(f, "Global plateau (K={}).", k),
            StopReason::MaxIterations => write!(f, "Maximum iterations reached."),
            StopReason::Failed => write!(f, "Run failed."),
        }
    }
}

/// Shared flag polled by the optimizer at iteration boundaries.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop; observed at the next iteration boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears a previous request so the token can be reused for another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Evaluates the stop conditions of one run, in priority order.
#[derive(Debug, Clone)]
pub(crate) struct StopCheck {
    started: Instant,
    limits: RunLimits,
}

impl StopCheck {
    pub(crate) fn new(started: Instant, limits: RunLimits) -> Self {
        Self { started, limits }
    }

    /// Cancellation, then time limit, then plateau.
    pub(crate) fn check(&self, token: &CancellationToken, no_improve: usize) -> Option<StopReason> {
        if token.is_cancelled() {
            return Some(StopReason::Cancelled);
        }
        if let Some(limit) = self.limits.time_limit {
            if self.started.elapsed() >= limit {
                return Some(StopReason::TimeLimit);
            }
        }
        match self.limits.plateau {
            Some(k) if no_improve >= k => Some(StopReason::Plateau(k)),
            _ => None,
        }
    }
}
