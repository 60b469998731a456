//! # Archive
//!
//! Per-colony elite set of scored parameter vectors. The archive always
//! holds exactly `capacity` members sorted ascending by cost, so `best()` is
//! the colony's current best and `worst()` the next to be displaced.

use std::cmp::Ordering;

use crate::error::{AcorError, Result};

/// A parameter vector and its cost.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    pub params: Vec<f64>,
    pub cost: f64,
}

impl Candidate {
    pub fn new(params: Vec<f64>, cost: f64) -> Self {
        Self { params, cost }
    }
}

/// Total order on costs that puts NaN after everything, infinity included.
pub(crate) fn compare_costs(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| {
        if a.is_nan() && b.is_nan() {
            Ordering::Equal
        } else if a.is_nan() {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    })
}

/// Stable ascending sort by cost. Equal costs keep their input order.
pub(crate) fn sort_by_cost(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| compare_costs(a.cost, b.cost));
}

/// Fixed-size, cost-sorted elite set of one colony.
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    members: Vec<Candidate>,
    capacity: usize,
}

impl Archive {
    /// Builds an archive from a scored population, keeping the `capacity` best.
    ///
    /// # Errors
    ///
    /// Returns `AcorError::Configuration` if `capacity < 2` or the population
    /// has fewer than `capacity` members.
    pub fn from_population(mut population: Vec<Candidate>, capacity: usize) -> Result<Self> {
        if capacity < 2 {
            return Err(AcorError::Configuration(format!(
                "Archive capacity must be greater than 1, got {}",
                capacity
            )));
        }
        if population.len() < capacity {
            return Err(AcorError::Configuration(format!(
                "Population of {} cannot fill an archive of {}",
                population.len(),
                capacity
            )));
        }
        sort_by_cost(&mut population);
        population.truncate(capacity);
        Ok(Self {
            members: population,
            capacity,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn get(&self, rank: usize) -> Option<&Candidate> {
        self.members.get(rank)
    }

    /// Member with the lowest cost.
    pub fn best(&self) -> &Candidate {
        &self.members[0]
    }

    pub fn worst(&self) -> &Candidate {
        &self.members[self.members.len() - 1]
    }

    /// Costs in rank order.
    pub fn costs(&self) -> Vec<f64> {
        self.members.iter().map(|c| c.cost).collect()
    }

    /// Elitist truncation: merges `incoming` with the current members, sorts
    /// them stably and keeps the `capacity` best. Current members win ties.
    pub fn merge(&mut self, incoming: Vec<Candidate>) {
        self.members.extend(incoming);
        sort_by_cost(&mut self.members);
        self.members.truncate(self.capacity);
    }

    /// Replaces the best member if `candidate` is strictly better.
    pub fn improve_best(&mut self, candidate: Candidate) -> bool {
        if compare_costs(candidate.cost, self.members[0].cost) == Ordering::Less {
            self.members[0] = candidate;
            sort_by_cost(&mut self.members);
            true
        } else {
            false
        }
    }

    /// Overwrites the `incoming.len()` worst slots and re-sorts.
    pub fn replace_worst(&mut self, incoming: &[Candidate]) {
        let count = incoming.len().min(self.members.len());
        let start = self.members.len() - count;
        self.members[start..].clone_from_slice(&incoming[..count]);
        sort_by_cost(&mut self.members);
    }

    /// Copy of the `count` best members.
    pub fn top(&self, count: usize) -> Vec<Candidate> {
        self.members[..count.min(self.members.len())].to_vec()
    }

    /// Normalized selection weights `exp(-rank / (capacity / 2))`.
    pub fn rank_weights(&self) -> Vec<f64> {
        let lam = self.capacity as f64 / 2.0;
        let raw: Vec<f64> = (0..self.members.len())
            .map(|rank| (-(rank as f64) / lam).exp())
            .collect();
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }

    /// Per-dimension Gaussian spread around the member at `rank`:
    /// `q * (Σ_j |x_j - mu| / (capacity - 1) + 1e-12)`.
    pub fn kernel_spread(&self, rank: usize, q: f64) -> Vec<f64> {
        let mu = &self.members[rank].params;
        let denom = (self.capacity - 1) as f64;
        let mut spread = vec![0.0; mu.len()];
        for member in &self.members {
            for (s, (x, m)) in spread.iter_mut().zip(member.params.iter().zip(mu)) {
                *s += (x - m).abs();
            }
        }
        spread
            .into_iter()
            .map(|s| q * (s / denom + 1e-12))
            .collect()
    }

    /// Returns `true` if the members are sorted and the archive is full.
    pub fn is_consistent(&self) -> bool {
        self.members.len() == self.capacity
            && self
                .members
                .windows(2)
                .all(|w| compare_costs(w[0].cost, w[1].cost) != Ordering::Greater)
    }
}
