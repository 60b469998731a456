//! A single ACOR colony: initialization, Gaussian-kernel generation and
//! local search around the colony best.

use std::cmp::Ordering;

use rand::distributions::WeightedIndex;

use super::archive::{compare_costs, Archive, Candidate};
use super::options::AcorOptions;
use crate::bounds::Bounds;
use crate::challenge::Challenge;
use crate::error::{AcorError, Result};
use crate::pool::EvaluationPool;
use crate::rng::RandomNumberGenerator;

/// Scores batches through the run's pool and counts evaluations.
pub(crate) struct Evaluator<'a> {
    pool: &'a EvaluationPool,
    challenge: &'a dyn Challenge,
    evaluations: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(pool: &'a EvaluationPool, challenge: &'a dyn Challenge) -> Self {
        Self {
            pool,
            challenge,
            evaluations: 0,
        }
    }

    pub(crate) fn evaluate(&mut self, batch: Vec<Vec<f64>>) -> Vec<Candidate> {
        let costs = self.pool.evaluate(self.challenge, &batch);
        self.evaluations += batch.len();
        batch
            .into_iter()
            .zip(costs)
            .map(|(params, cost)| Candidate::new(params, cost))
            .collect()
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.evaluations
    }
}

/// First candidate with the lowest cost.
pub(crate) fn first_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().reduce(|best, c| {
        if compare_costs(c.cost, best.cost) == Ordering::Less {
            c
        } else {
            best
        }
    })
}

/// Size of the initial population before truncation to the archive.
///
/// With opposition-based learning, `ceil(archive_size / 2)` random vectors
/// plus their reflections; otherwise exactly `archive_size`.
pub fn initial_population_size(archive_size: usize, obl: bool) -> usize {
    if obl {
        2 * archive_size.div_ceil(2)
    } else {
        archive_size
    }
}

/// One colony and its archive.
#[derive(Debug, Clone)]
pub struct Colony {
    archive: Archive,
}

impl Colony {
    /// Draws, scores and truncates the initial population.
    ///
    /// `warm_start` (already clipped) takes slot 0, and with OBL its reflection
    /// takes the matching opposite slot.
    pub(crate) fn initialize(
        evaluator: &mut Evaluator<'_>,
        bounds: &Bounds,
        options: &AcorOptions,
        rng: &mut RandomNumberGenerator,
        warm_start: Option<&[f64]>,
    ) -> Result<Self> {
        let archive_size = options.get_archive_size();
        let population = if options.is_obl_enabled() {
            let half = archive_size.div_ceil(2);
            let mut initial: Vec<Vec<f64>> = (0..half).map(|_| bounds.sample_uniform(rng)).collect();
            if let Some(params) = warm_start {
                initial[0] = params.to_vec();
            }
            let opposite: Vec<Vec<f64>> = initial.iter().map(|x| bounds.opposite(x)).collect();
            initial.extend(opposite);
            initial
        } else {
            let mut initial: Vec<Vec<f64>> =
                (0..archive_size).map(|_| bounds.sample_uniform(rng)).collect();
            if let Some(params) = warm_start {
                initial[0] = params.to_vec();
            }
            initial
        };

        let scored = evaluator.evaluate(population);
        Ok(Self {
            archive: Archive::from_population(scored, archive_size)?,
        })
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub(crate) fn archive_mut(&mut self) -> &mut Archive {
        &mut self.archive
    }

    pub fn best(&self) -> &Candidate {
        self.archive.best()
    }

    /// Samples `n_ants` candidates from the rank-weighted Gaussian kernels.
    pub(crate) fn sample_ants(
        &self,
        bounds: &Bounds,
        options: &AcorOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<Vec<f64>>> {
        let weights = WeightedIndex::new(self.archive.rank_weights())
            .map_err(|e| AcorError::Runtime(format!("Invalid rank weights: {}", e)))?;
        let mut spreads: Vec<Option<Vec<f64>>> = vec![None; self.archive.len()];

        (0..options.get_n_ants())
            .map(|_| {
                let rank = rng.weighted_index(&weights);
                let mean = &self.archive.members()[rank].params;
                let spread = spreads[rank]
                    .get_or_insert_with(|| self.archive.kernel_spread(rank, options.get_q()));
                let mut ant = mean
                    .iter()
                    .zip(spread.iter())
                    .map(|(&mu, &sigma)| rng.normal(mu, sigma))
                    .collect::<Result<Vec<f64>>>()?;
                bounds.clip(&mut ant);
                Ok(ant)
            })
            .collect()
    }

    /// Generates, scores and merges one batch of ants.
    pub(crate) fn advance(
        &mut self,
        evaluator: &mut Evaluator<'_>,
        bounds: &Bounds,
        options: &AcorOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<()> {
        let ants = self.sample_ants(bounds, options, rng)?;
        let scored = evaluator.evaluate(ants);
        self.archive.merge(scored);
        Ok(())
    }

    /// Gaussian perturbations of the colony best with per-dimension standard
    /// deviation `radius * (high - low)`. Replaces the best only on strict
    /// improvement.
    pub(crate) fn local_search(
        &mut self,
        evaluator: &mut Evaluator<'_>,
        bounds: &Bounds,
        options: &AcorOptions,
        rng: &mut RandomNumberGenerator,
    ) -> Result<bool> {
        let radius = options.get_local_search_radius();
        let center = self.archive.best().params.clone();
        let candidates = (0..options.get_local_search_points())
            .map(|_| {
                let mut candidate = center
                    .iter()
                    .enumerate()
                    .map(|(i, &x)| Ok(x + rng.normal(0.0, radius * bounds.range(i))?))
                    .collect::<Result<Vec<f64>>>()?;
                bounds.clip(&mut candidate);
                Ok(candidate)
            })
            .collect::<Result<Vec<_>>>()?;

        match first_best(evaluator.evaluate(candidates)) {
            Some(best) => Ok(self.archive.improve_best(best)),
            None => Ok(false),
        }
    }
}
