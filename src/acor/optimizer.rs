use std::time::Instant;

use tracing::{debug, info, warn};

use super::archive::{compare_costs, Candidate};
use super::colony::{Colony, Evaluator};
use super::migration::ring_migration;
use super::options::{AcorOptions, LogLevel, RunLimits};
use super::progress::{percent, Progress, ProgressSink};
use super::refinement::refine;
use super::stop::{CancellationToken, StopCheck, StopReason};
use crate::bounds::Bounds;
use crate::caching::with_cache;
use crate::challenge::Challenge;
use crate::error::{AcorError, Result};
use crate::pool::EvaluationPool;
use crate::rng::RandomNumberGenerator;

/// Minimum decrease of the global best that counts as an improvement.
const IMPROVEMENT_EPSILON: f64 = 1e-12;

/// Outcome of one call to [`AcorOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    pub params: Vec<f64>,
    pub cost: f64,
    pub stop_reason: StopReason,
    /// Iterations whose body ran to completion.
    pub iterations: usize,
}

/// Mutable state of a run, owned by the optimizer and only handed out as copies.
#[derive(Debug, Clone)]
struct OptimizerState {
    colonies: Vec<Colony>,
    best: Option<Candidate>,
    history_costs: Vec<f64>,
    history_params: Vec<Vec<f64>>,
    evaluations: usize,
    iterations: usize,
    stop_reason: Option<StopReason>,
}

impl OptimizerState {
    fn new() -> Self {
        Self {
            colonies: Vec::new(),
            best: None,
            history_costs: Vec::new(),
            history_params: Vec::new(),
            evaluations: 0,
            iterations: 0,
            stop_reason: None,
        }
    }
}

/// Multi-colony ACOR optimizer.
///
/// The optimizer minimizes a [`Challenge`] inside a box of [`Bounds`]. Each run
/// builds its own evaluation pool, so only `score` ever crosses to worker
/// threads; the progress sink stays on the thread calling `optimize`.
///
/// # Example
///
/// ```rust
/// use acor_seir::acor::{AcorOptimizer, AcorOptions, RunLimits};
/// use acor_seir::{Bounds, Challenge};
///
/// struct Sphere;
///
/// impl Challenge for Sphere {
///     fn score(&self, params: &[f64]) -> f64 {
///         params.iter().map(|x| x * x).sum()
///     }
/// }
///
/// let options = AcorOptions::builder()
///     .n_ants(20)
///     .archive_size(10)
///     .max_iter(50)
///     .colonies(2)
///     .seed(1)
///     .build();
/// let bounds = Bounds::new(vec![(-5.0, 5.0); 3]).unwrap();
/// let mut optimizer = AcorOptimizer::new(Sphere, bounds, options).unwrap();
/// let solution = optimizer.optimize(RunLimits::default()).unwrap();
/// assert!(solution.cost < 1.0);
/// ```
pub struct AcorOptimizer<C: Challenge> {
    challenge: C,
    bounds: Bounds,
    options: AcorOptions,
    warm_start: Option<Vec<f64>>,
    cancellation: CancellationToken,
    progress: Option<ProgressSink>,
    state: OptimizerState,
}

impl<C: Challenge> AcorOptimizer<C> {
    /// Creates an optimizer.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` if the options or bounds are invalid
    /// or the challenge is not ready (for a model, missing observed data).
    pub fn new(challenge: C, bounds: Bounds, options: AcorOptions) -> Result<Self> {
        options.validate()?;
        bounds.validate()?;
        challenge.validate()?;
        Ok(Self {
            challenge,
            bounds,
            options,
            warm_start: None,
            cancellation: CancellationToken::new(),
            progress: None,
            state: OptimizerState::new(),
        })
    }

    /// Seeds slot 0 of colony 0 with `params`, clipped into the bounds.
    pub fn with_warm_start(mut self, params: Vec<f64>) -> Result<Self> {
        self.set_warm_start(Some(params))?;
        Ok(self)
    }

    pub fn set_warm_start(&mut self, params: Option<Vec<f64>>) -> Result<()> {
        self.warm_start = match params {
            Some(mut params) => {
                if params.len() != self.bounds.dim() {
                    return Err(AcorError::Configuration(format!(
                        "Warm start has {} components, bounds have {}",
                        params.len(),
                        self.bounds.dim()
                    )));
                }
                self.bounds.clip(&mut params);
                Some(params)
            }
            None => None,
        };
        Ok(())
    }

    /// Installs the receiver of progress events.
    pub fn set_progress_sink<F>(&mut self, sink: F)
    where
        F: FnMut(Progress) + Send + 'static,
    {
        self.progress = Some(Box::new(sink));
    }

    pub fn clear_progress_sink(&mut self) {
        self.progress = None;
    }

    /// Shares the optimizer's cancellation flag.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Asks a running `optimize` to stop at its next iteration boundary.
    pub fn request_stop(&self) {
        self.cancellation.cancel();
    }

    pub fn clear_stop(&self) {
        self.cancellation.reset();
    }

    pub fn should_stop(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn challenge(&self) -> &C {
        &self.challenge
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn options(&self) -> &AcorOptions {
        &self.options
    }

    pub fn warm_start(&self) -> Option<&[f64]> {
        self.warm_start.as_deref()
    }

    /// Global best cost, `f64::INFINITY` before the first run.
    pub fn best_cost(&self) -> f64 {
        self.state.best.as_ref().map_or(f64::INFINITY, |b| b.cost)
    }

    /// Copy of the global best parameters.
    pub fn best_params(&self) -> Option<Vec<f64>> {
        self.state.best.as_ref().map(|b| b.params.clone())
    }

    /// Global best cost after every completed iteration.
    pub fn history_costs(&self) -> Vec<f64> {
        self.state.history_costs.clone()
    }

    /// Global best parameters after every completed iteration.
    pub fn history_params(&self) -> Vec<Vec<f64>> {
        self.state.history_params.clone()
    }

    /// Copies of every colony's archive, best first.
    pub fn archives(&self) -> Vec<Vec<Candidate>> {
        self.state
            .colonies
            .iter()
            .map(|c| c.archive().members().to_vec())
            .collect()
    }

    pub fn evaluation_count(&self) -> usize {
        self.state.evaluations
    }

    pub fn iterations(&self) -> usize {
        self.state.iterations
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.state.stop_reason
    }

    /// Runs the optimization until a stop condition triggers or `max_iter`
    /// iterations complete.
    ///
    /// Any stop request left over from an earlier run is cleared first; stop
    /// the run through [`request_stop`](Self::request_stop) or a
    /// [`CancellationToken`] while it is running.
    ///
    /// # Errors
    ///
    /// Fails only on internal errors (thread pool construction, invalid
    /// sampling distributions). Fitness failures are scored as infinite and
    /// never surface. On error the state reached so far stays readable.
    pub fn optimize(&mut self, limits: RunLimits) -> Result<Solution> {
        self.clear_stop();
        self.run(limits)
    }

    /// The optimization loop. Honors a stop flag that is already set.
    pub(crate) fn run(&mut self, limits: RunLimits) -> Result<Solution> {
        let started = Instant::now();
        let Self {
            challenge,
            bounds,
            options,
            warm_start,
            cancellation,
            progress,
            state,
        } = self;
        *state = OptimizerState::new();

        let mut rng = match options.get_seed() {
            Some(seed) => RandomNumberGenerator::from_seed(seed),
            None => RandomNumberGenerator::new(),
        };
        let pool = EvaluationPool::new(
            options.get_worker_threads(),
            options.get_parallel_threshold(),
        )?;
        let scorer = with_cache(&*challenge, options.get_cache_type());
        let mut evaluator = Evaluator::new(&pool, scorer.as_ref());
        let log_level = options.get_log_level();
        let max_iter = options.get_max_iter();

        info!(
            colonies = options.get_colonies(),
            archive_size = options.get_archive_size(),
            n_ants = options.get_n_ants(),
            dim = bounds.dim(),
            workers = pool.num_threads(),
            "starting optimization"
        );

        for c in 0..options.get_colonies() {
            let seed = if c == 0 { warm_start.as_deref() } else { None };
            let colony = Colony::initialize(&mut evaluator, bounds, options, &mut rng, seed)?;
            if log_level == LogLevel::Verbose {
                debug!(colony = c, best_cost = colony.best().cost, "colony initialized");
            }
            state.colonies.push(colony);
        }
        state.best = colonies_best(&state.colonies);
        state.evaluations = evaluator.evaluations();

        let stop_check = StopCheck::new(started, limits);
        let mut no_improve = 0usize;
        let mut stop_reason = StopReason::MaxIterations;
        let mut natural_end = true;

        for it in 1..=max_iter {
            if let Some(reason) = stop_check.check(cancellation, no_improve) {
                info!(iteration = it, reason = %reason, "optimization stopped");
                emit(progress, Progress::status(percent(it, max_iter), reason.to_string()));
                stop_reason = reason;
                natural_end = false;
                break;
            }

            for (c, colony) in state.colonies.iter_mut().enumerate() {
                colony.advance(&mut evaluator, bounds, options, &mut rng)?;
                if options.is_local_search_enabled() && it % options.get_local_search_frequency() == 0 {
                    let improved = colony.local_search(&mut evaluator, bounds, options, &mut rng)?;
                    if log_level == LogLevel::Verbose && improved {
                        debug!(colony = c, best_cost = colony.best().cost, "local search improved colony best");
                    }
                }
                if log_level == LogLevel::Verbose {
                    debug!(iteration = it, colony = c, best_cost = colony.best().cost);
                }
            }

            if it % options.get_migration_interval() == 0 {
                let moved = ring_migration(&mut state.colonies, options.get_migration_size());
                if log_level == LogLevel::Verbose && moved > 0 {
                    debug!(iteration = it, migrants = moved, "ring migration");
                }
            }

            if options.is_refinement_enabled() && it % options.get_refinement_frequency() == 0 {
                if let Some(best) = state.best.as_ref() {
                    emit(
                        progress,
                        Progress::status(percent(it, max_iter), "Applying greedy refinement...".to_string()),
                    );
                    if let Some(refined) =
                        refine(&mut evaluator, bounds, best, options.get_refinement_step())
                    {
                        if log_level == LogLevel::Verbose {
                            debug!(iteration = it, best_cost = refined.cost, "refinement improved global best");
                        }
                        emit(
                            progress,
                            Progress::status(
                                percent(it, max_iter),
                                format!("Refinement found improvement: {:.3e}", refined.cost),
                            ),
                        );
                        state.best = Some(refined);
                    }
                }
            }

            // Only a colony beating the current global best, refined or not,
            // resets the plateau counter.
            if update_global_best(&mut state.best, colonies_best(&state.colonies)) {
                no_improve = 0;
            } else {
                no_improve += 1;
            }
            let (best_cost, best_params) = match state.best.as_ref() {
                Some(best) => (best.cost, best.params.clone()),
                None => {
                    return Err(AcorError::Runtime(
                        "No global best after initialization".to_string(),
                    ))
                }
            };

            state.history_costs.push(best_cost);
            state.history_params.push(best_params.clone());
            state.iterations = it;
            state.evaluations = evaluator.evaluations();

            if log_level != LogLevel::None {
                info!(iteration = it, best_cost, plateau = no_improve);
            }
            let snapshot = (it % 10 == 0).then_some(best_params);
            emit(
                progress,
                Progress::iteration(
                    percent(it, max_iter),
                    format!(
                        "Iter {}/{} - Best Cost: {:.3e} (Global Plateau: {})",
                        it, max_iter, best_cost, no_improve
                    ),
                    snapshot,
                ),
            );
        }

        if natural_end {
            info!(iterations = max_iter, "optimization finished");
            emit(progress, Progress::status(100, stop_reason.to_string()));
        }
        state.stop_reason = Some(stop_reason);

        let best = state.best.clone().ok_or_else(|| {
            warn!("optimization ended without a global best");
            AcorError::Runtime("No global best after initialization".to_string())
        })?;
        Ok(Solution {
            params: best.params,
            cost: best.cost,
            stop_reason,
            iterations: state.iterations,
        })
    }
}

impl<C: Challenge + std::fmt::Debug> std::fmt::Debug for AcorOptimizer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcorOptimizer")
            .field("challenge", &self.challenge)
            .field("bounds", &self.bounds)
            .field("options", &self.options)
            .field("best_cost", &self.best_cost())
            .field("iterations", &self.state.iterations)
            .finish()
    }
}

/// Lowest colony best; the earliest colony wins ties.
fn colonies_best(colonies: &[Colony]) -> Option<Candidate> {
    colonies
        .iter()
        .map(Colony::best)
        .reduce(|best, c| {
            if compare_costs(c.cost, best.cost) == std::cmp::Ordering::Less {
                c
            } else {
                best
            }
        })
        .cloned()
}

/// Replaces `best` with `candidate` if it is lower by more than
/// [`IMPROVEMENT_EPSILON`]. Returns whether it did.
fn update_global_best(best: &mut Option<Candidate>, candidate: Option<Candidate>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    let current = best.as_ref().map_or(f64::INFINITY, |b| b.cost);
    if candidate.cost + IMPROVEMENT_EPSILON < current {
        *best = Some(candidate);
        true
    } else {
        false
    }
}

fn emit(sink: &mut Option<ProgressSink>, event: Progress) {
    if let Some(sink) = sink.as_mut() {
        sink(event);
    }
}
