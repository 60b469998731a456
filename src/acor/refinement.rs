//! Greedy coordinate refinement of the global best.

use std::cmp::Ordering;

use super::archive::{compare_costs, Candidate};
use super::colony::{first_best, Evaluator};
use crate::bounds::Bounds;

/// `2 * D` steps around `center`: each coordinate moved by
/// `+step * (high - low)` and `-step * (high - low)`, clamped to its bound.
pub(crate) fn neighbors(center: &[f64], bounds: &Bounds, step: f64) -> Vec<Vec<f64>> {
    let mut steps = Vec::with_capacity(2 * center.len());
    for i in 0..center.len() {
        let delta = step * bounds.range(i);
        let mut plus = center.to_vec();
        plus[i] = (plus[i] + delta).min(bounds.high(i));
        steps.push(plus);
        let mut minus = center.to_vec();
        minus[i] = (minus[i] - delta).max(bounds.low(i));
        steps.push(minus);
    }
    steps
}

/// Scores every neighbor and returns the best one if it strictly beats `best`.
///
/// A single update per pass, not a coordinate-descent sweep.
pub(crate) fn refine(
    evaluator: &mut Evaluator<'_>,
    bounds: &Bounds,
    best: &Candidate,
    step: f64,
) -> Option<Candidate> {
    let scored = evaluator.evaluate(neighbors(&best.params, bounds, step));
    first_best(scored).filter(|c| compare_costs(c.cost, best.cost) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Challenge;
    use crate::pool::EvaluationPool;

    struct Shifted;

    impl Challenge for Shifted {
        fn score(&self, params: &[f64]) -> f64 {
            (params[0] - 1.0).powi(2) + (params[1] + 0.5).powi(2)
        }
    }

    #[test]
    fn test_neighbors_are_clamped() {
        let bounds = Bounds::new(vec![(0.0, 1.0), (-1.0, 1.0)]).unwrap();
        let steps = neighbors(&[0.99, 0.0], &bounds, 0.1);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], vec![1.0, 0.0]);
        assert!((steps[1][0] - 0.89).abs() < 1e-12);
        assert_eq!(steps[2], vec![0.99, 0.2]);
        assert_eq!(steps[3], vec![0.99, -0.2]);
    }

    #[test]
    fn test_refine_takes_single_best_neighbor() {
        let pool = EvaluationPool::new(Some(1), usize::MAX).unwrap();
        let mut evaluator = Evaluator::new(&pool, &Shifted);
        let bounds = Bounds::new(vec![(-2.0, 2.0), (-2.0, 2.0)]).unwrap();
        let center = Candidate::new(vec![0.0, 0.0], Shifted.score(&[0.0, 0.0]));

        let refined = refine(&mut evaluator, &bounds, &center, 0.25).unwrap();
        assert_eq!(evaluator.evaluations(), 4);
        // +1.0 on x removes the larger error term; y stays put.
        assert_eq!(refined.params, vec![1.0, 0.0]);
        assert_eq!(refined.cost, 0.25);
    }

    #[test]
    fn test_refine_without_improvement() {
        let pool = EvaluationPool::new(Some(1), usize::MAX).unwrap();
        let mut evaluator = Evaluator::new(&pool, &Shifted);
        let bounds = Bounds::new(vec![(-2.0, 2.0), (-2.0, 2.0)]).unwrap();
        let optimum = Candidate::new(vec![1.0, -0.5], 0.0);
        assert!(refine(&mut evaluator, &bounds, &optimum, 0.1).is_none());
    }
}
