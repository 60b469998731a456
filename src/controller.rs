//! # Execution controller
//!
//! Runs an [`AcorOptimizer`] on a dedicated thread and relays its progress
//! over a channel. The caller keeps a [`RunHandle`] to request a stop and to
//! receive events:
//!
//! - [`RunEvent::Progress`] for every progress event of the run,
//! - exactly one [`RunEvent::Finished`] at the end, carrying the immutable
//!   [`RunResult`] and the optimizer with its final state, even when the run
//!   failed or panicked.
//!
//! ## Example
//!
//! ```rust
//! use acor_seir::acor::{AcorOptimizer, AcorOptions, RunLimits};
//! use acor_seir::controller::Controller;
//! use acor_seir::{Bounds, Challenge};
//!
//! struct Sphere;
//!
//! impl Challenge for Sphere {
//!     fn score(&self, params: &[f64]) -> f64 {
//!         params.iter().map(|x| x * x).sum()
//!     }
//! }
//!
//! let options = AcorOptions::builder().n_ants(10).archive_size(5).max_iter(20).build();
//! let bounds = Bounds::new(vec![(-1.0, 1.0); 2]).unwrap();
//! let optimizer = AcorOptimizer::new(Sphere, bounds, options).unwrap();
//!
//! let handle = Controller::start(optimizer, RunLimits::default()).unwrap();
//! let completion = handle.wait().unwrap();
//! assert_eq!(completion.result.history.len(), 20);
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::acor::{AcorOptimizer, CancellationToken, Progress, RunLimits, StopReason};
use crate::challenge::Challenge;
use crate::error::{AcorError, Result};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable record of one finished run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunResult {
    pub run_id: u64,
    /// `f64::INFINITY` if the run failed before any colony was scored.
    pub best_cost: f64,
    pub best_params: Vec<f64>,
    pub history: Vec<f64>,
    pub duration: Duration,
    pub stop_reason: StopReason,
}

/// Terminal event payload: the result and the optimizer that produced it.
pub struct Completion<C: Challenge> {
    pub result: RunResult,
    pub optimizer: AcorOptimizer<C>,
}

/// Event relayed from the run thread.
pub enum RunEvent<C: Challenge> {
    Progress(Progress),
    Finished(Box<Completion<C>>),
}

/// Starts optimizer runs on background threads.
pub struct Controller;

impl Controller {
    /// Moves `optimizer` to a new thread and starts `optimize(limits)` there.
    ///
    /// Any earlier stop request on the optimizer is cleared first.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Io` if the thread cannot be spawned.
    pub fn start<C>(mut optimizer: AcorOptimizer<C>, limits: RunLimits) -> Result<RunHandle<C>>
    where
        C: Challenge + 'static,
    {
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel();

        optimizer.clear_stop();
        let cancellation = optimizer.cancellation_token();
        let progress_sender = sender.clone();
        optimizer.set_progress_sink(move |progress| {
            // The receiver may already be gone; the run continues regardless.
            let _ = progress_sender.send(RunEvent::Progress(progress));
        });

        let thread = thread::Builder::new()
            .name(format!("acor-run-{}", run_id))
            .spawn(move || execute(run_id, optimizer, limits, sender))?;

        Ok(RunHandle {
            run_id,
            cancellation,
            events: receiver,
            thread: Some(thread),
        })
    }
}

fn execute<C: Challenge>(
    run_id: u64,
    mut optimizer: AcorOptimizer<C>,
    limits: RunLimits,
    sender: Sender<RunEvent<C>>,
) {
    let started = Instant::now();
    info!(run_id, "run started");

    // Cleared in `start`, so a stop issued right after spawning is kept.
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| optimizer.run(limits)));
    let stop_reason = match outcome {
        Ok(Ok(solution)) => solution.stop_reason,
        Ok(Err(error)) => report_failure(&sender, run_id, error.to_string()),
        Err(payload) => report_failure(&sender, run_id, panic_message(payload.as_ref())),
    };

    optimizer.clear_progress_sink();
    let result = RunResult {
        run_id,
        best_cost: optimizer.best_cost(),
        best_params: optimizer.best_params().unwrap_or_default(),
        history: optimizer.history_costs(),
        duration: started.elapsed(),
        stop_reason,
    };
    info!(
        run_id,
        best_cost = result.best_cost,
        reason = %result.stop_reason,
        duration_ms = result.duration.as_millis() as u64,
        "run finished"
    );

    let _ = sender.send(RunEvent::Finished(Box::new(Completion { result, optimizer })));
}

fn report_failure<C: Challenge>(sender: &Sender<RunEvent<C>>, run_id: u64, detail: String) -> StopReason {
    warn!(run_id, error = %detail, "run failed");
    let _ = sender.send(RunEvent::Progress(Progress::error(
        0,
        format!("Error in optimization run: {}", detail),
    )));
    StopReason::Failed
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic with a non-string payload".to_string()
    }
}

/// Caller-side handle of a running optimization.
pub struct RunHandle<C: Challenge> {
    run_id: u64,
    cancellation: CancellationToken,
    events: Receiver<RunEvent<C>>,
    thread: Option<JoinHandle<()>>,
}

impl<C: Challenge> RunHandle<C> {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Requests a cooperative stop, honored at the next iteration boundary.
    pub fn stop(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Event stream of the run. It ends after the `Finished` event.
    pub fn events(&self) -> &Receiver<RunEvent<C>> {
        &self.events
    }

    /// Blocks until the run finishes, discarding progress events.
    pub fn wait(self) -> Result<Completion<C>> {
        self.wait_with(|_| {})
    }

    /// Blocks until the run finishes, passing every progress event to `on_progress`.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Runtime` if the `Finished` event was already taken
    /// from [`events`](Self::events) or the run thread vanished without one.
    pub fn wait_with<F>(mut self, mut on_progress: F) -> Result<Completion<C>>
    where
        F: FnMut(Progress),
    {
        loop {
            match self.events.recv() {
                Ok(RunEvent::Progress(progress)) => on_progress(progress),
                Ok(RunEvent::Finished(completion)) => {
                    if let Some(thread) = self.thread.take() {
                        thread.join().map_err(|_| {
                            AcorError::Runtime(format!("Run {} thread panicked", self.run_id))
                        })?;
                    }
                    return Ok(*completion);
                }
                Err(_) => {
                    return Err(AcorError::Runtime(format!(
                        "Run {} ended without a completion event",
                        self.run_id
                    )))
                }
            }
        }
    }
}
