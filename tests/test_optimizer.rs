use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use acor_seir::acor::{initial_population_size, AcorOptimizer, AcorOptions, ProgressKind, RunLimits, StopReason};
use acor_seir::{AcorError, Bounds, Challenge, Observations, SeirModel};

struct Flat;

impl Challenge for Flat {
    fn score(&self, _params: &[f64]) -> f64 {
        1.0
    }
}

struct Rosenbrock;

impl Challenge for Rosenbrock {
    fn score(&self, params: &[f64]) -> f64 {
        params
            .windows(2)
            .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
            .sum()
    }
}

const SLEEPY_COST: Duration = Duration::from_millis(5);

/// Sphere that takes a fixed time per evaluation.
struct Sleepy;

impl Challenge for Sleepy {
    fn score(&self, params: &[f64]) -> f64 {
        std::thread::sleep(SLEEPY_COST);
        params.iter().map(|x| x * x).sum()
    }
}

/// Panics on half of the search box.
struct Fragile;

impl Challenge for Fragile {
    fn score(&self, params: &[f64]) -> f64 {
        if params[0] > 0.0 {
            panic!("evaluation blew up");
        }
        params.iter().map(|x| x * x).sum()
    }
}

fn small_options() -> AcorOptions {
    AcorOptions::builder()
        .n_ants(10)
        .archive_size(6)
        .max_iter(30)
        .colonies(2)
        .migration_interval(5)
        .migration_size(2)
        .refinement_frequency(10)
        .seed(7)
        .build()
}

#[test]
fn test_plateau_stops_after_k_flat_iterations() {
    let mut optimizer =
        AcorOptimizer::new(Flat, Bounds::new(vec![(0.0, 1.0); 3]).unwrap(), small_options()).unwrap();
    let solution = optimizer.optimize(RunLimits::default().with_plateau(3)).unwrap();

    assert_eq!(solution.stop_reason, StopReason::Plateau(3));
    assert_eq!(solution.iterations, 3);
    assert_eq!(optimizer.history_costs(), vec![1.0; 3]);
    assert_eq!(optimizer.stop_reason(), Some(StopReason::Plateau(3)));
}

#[test]
fn test_zero_time_limit_stops_before_first_iteration() {
    let mut optimizer =
        AcorOptimizer::new(Rosenbrock, Bounds::new(vec![(-2.0, 2.0); 2]).unwrap(), small_options()).unwrap();
    let solution = optimizer
        .optimize(RunLimits::default().with_time_limit(Duration::ZERO))
        .unwrap();
    assert_eq!(solution.stop_reason, StopReason::TimeLimit);
    assert_eq!(solution.iterations, 0);
    // The initialized archives still provide a best.
    assert!(solution.cost.is_finite());
}

#[test]
fn test_cancellation_takes_priority() {
    let mut optimizer =
        AcorOptimizer::new(Flat, Bounds::new(vec![(0.0, 1.0); 2]).unwrap(), small_options()).unwrap();
    let token = optimizer.cancellation_token();
    optimizer.set_progress_sink(move |progress| {
        if progress.kind == ProgressKind::Iteration {
            token.cancel();
        }
    });
    // After one flat iteration both the plateau and the stop request are due.
    let solution = optimizer.optimize(RunLimits::default().with_plateau(1)).unwrap();
    assert_eq!(solution.stop_reason, StopReason::Cancelled);
    assert_eq!(solution.iterations, 1);
    assert!(optimizer.should_stop());
}

#[test]
fn test_time_limit_ends_run_within_one_iteration() {
    let options = AcorOptions::builder()
        .n_ants(4)
        .archive_size(4)
        .max_iter(100_000)
        .colonies(1)
        .local_search(false)
        .refinement(false)
        .worker_threads(1)
        .seed(13)
        .build();
    let mut optimizer =
        AcorOptimizer::new(Sleepy, Bounds::new(vec![(-1.0, 1.0); 2]).unwrap(), options).unwrap();
    let limit = Duration::from_millis(50);

    let started = Instant::now();
    let solution = optimizer.optimize(RunLimits::default().with_time_limit(limit)).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(solution.stop_reason, StopReason::TimeLimit);
    assert!(solution.iterations > 0);
    // One iteration is 4 evaluations of 5 ms; the rest is scheduling slack.
    let iteration = 4 * SLEEPY_COST;
    assert!(elapsed >= limit);
    assert!(elapsed < limit + iteration + Duration::from_millis(250), "took {:?}", elapsed);
}

#[test]
fn test_initialization_evaluation_counts() {
    for (archive_size, obl) in [(5, true), (6, true), (5, false)] {
        let options = AcorOptions::builder()
            .archive_size(archive_size)
            .n_ants(4)
            .colonies(3)
            .migration_size(2)
            .obl(obl)
            .build();
        let mut optimizer =
            AcorOptimizer::new(Rosenbrock, Bounds::new(vec![(-2.0, 2.0); 2]).unwrap(), options).unwrap();
        optimizer
            .optimize(RunLimits::default().with_time_limit(Duration::ZERO))
            .unwrap();

        assert_eq!(
            optimizer.evaluation_count(),
            3 * initial_population_size(archive_size, obl)
        );
        for archive in optimizer.archives() {
            assert_eq!(archive.len(), archive_size);
        }
    }
    assert_eq!(initial_population_size(5, true), 6);
    assert_eq!(initial_population_size(5, false), 5);
}

#[test]
fn test_archives_stay_sorted_and_bounded() {
    let bounds = Bounds::new(vec![(-2.0, 2.0), (-1.0, 3.0)]).unwrap();
    let mut optimizer = AcorOptimizer::new(Rosenbrock, bounds.clone(), small_options()).unwrap();
    let solution = optimizer.optimize(RunLimits::default()).unwrap();

    assert_eq!(solution.stop_reason, StopReason::MaxIterations);
    assert!(bounds.contains(&solution.params));
    for archive in optimizer.archives() {
        assert_eq!(archive.len(), 6);
        assert!(archive.windows(2).all(|w| w[0].cost <= w[1].cost));
        assert!(archive.iter().all(|c| bounds.contains(&c.params)));
        // The global best is at least as good as every colony.
        assert!(solution.cost <= archive[0].cost);
    }
    let history = optimizer.history_costs();
    assert!(history.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_single_colony_runs_without_migration() {
    let options = AcorOptions::builder()
        .n_ants(8)
        .archive_size(5)
        .max_iter(12)
        .colonies(1)
        .migration_interval(1)
        .migration_size(5)
        .seed(3)
        .build();
    let mut optimizer =
        AcorOptimizer::new(Rosenbrock, Bounds::new(vec![(-2.0, 2.0); 2]).unwrap(), options).unwrap();
    let solution = optimizer.optimize(RunLimits::default()).unwrap();
    assert_eq!(solution.iterations, 12);
    assert_eq!(optimizer.archives().len(), 1);
}

#[test]
fn test_panicking_evaluations_score_infinite() {
    let options = AcorOptions::builder()
        .n_ants(12)
        .archive_size(6)
        .max_iter(10)
        .colonies(2)
        .migration_size(2)
        .worker_threads(2)
        .seed(11)
        .build();
    let mut optimizer =
        AcorOptimizer::new(Fragile, Bounds::new(vec![(-1.0, 1.0); 2]).unwrap(), options).unwrap();
    let solution = optimizer.optimize(RunLimits::default()).unwrap();

    assert_eq!(solution.stop_reason, StopReason::MaxIterations);
    assert!(solution.cost.is_finite());
    assert!(solution.params[0] <= 0.0);
}

#[test]
fn test_fit_flu_outbreak_from_warm_start() {
    let infected = vec![
        1.0, 3.0, 8.0, 28.0, 75.0, 221.0, 281.0, 255.0, 235.0, 190.0, 125.0, 70.0, 28.0, 12.0, 5.0,
    ];
    let observations = Observations::new((0..15).map(f64::from).collect(), infected).unwrap();
    let model = SeirModel::default().with_observations(observations);
    let bounds = model.default_bounds();
    let start = bounds.midpoint();
    let start_cost = model.fitness(&start);

    let options = AcorOptions::builder()
        .n_ants(10)
        .archive_size(8)
        .max_iter(12)
        .colonies(2)
        .migration_size(2)
        .refinement_frequency(6)
        .seed(2024)
        .build();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let mut optimizer = AcorOptimizer::new(model, bounds, options)
        .unwrap()
        .with_warm_start(start)
        .unwrap();
    optimizer.set_progress_sink(move |progress| sink.lock().unwrap().push(progress));

    let solution = optimizer.optimize(RunLimits::default()).unwrap();
    assert!(solution.cost <= start_cost);
    assert_eq!(optimizer.challenge().fitness(&solution.params), solution.cost);

    let messages = messages.lock().unwrap();
    let iterations = messages
        .iter()
        .filter(|p| p.kind == ProgressKind::Iteration)
        .count();
    assert_eq!(iterations, 12);
    assert!(messages
        .iter()
        .any(|p| p.message == "Applying greedy refinement..."));
    assert!(messages.iter().all(|p| p.percent <= 100));
}

#[test]
fn test_overflowing_kernel_fails_the_run() {
    // Valid on paper, but q times the archive spread overflows to infinity.
    let options = AcorOptions::builder()
        .n_ants(4)
        .archive_size(4)
        .max_iter(10)
        .colonies(1)
        .q(1e308)
        .seed(21)
        .build();
    let mut optimizer =
        AcorOptimizer::new(Rosenbrock, Bounds::new(vec![(0.0, 1e6); 2]).unwrap(), options).unwrap();
    let result = optimizer.optimize(RunLimits::default());

    assert!(matches!(result, Err(AcorError::Runtime(_))));
    assert_eq!(optimizer.iterations(), 0);
    assert!(optimizer.best_cost().is_finite());
}

#[cfg(feature = "serde")]
#[test]
fn test_unsampleable_bounds_rejected_before_run() {
    let bounds: Bounds = serde_json::from_str(r#"{"limits": [[-1e308, 1e308]]}"#).unwrap();
    let result = AcorOptimizer::new(Rosenbrock, bounds, small_options());
    assert!(matches!(result, Err(AcorError::Configuration(_))));
}
