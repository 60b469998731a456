//! # Caching Module
//!
//! Memoization of fitness evaluations. Identical parameter vectors show up
//! more often than one would expect: refinement steps clipped onto a bound,
//! a warm start duplicated by its own clip, candidates sampled with a
//! vanishing kernel spread. Wrapping the challenge in one of these caches
//! avoids re-integrating the model for them without changing any result.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thread_local::ThreadLocal;

use crate::challenge::Challenge;

/// Cache key of a parameter vector: the exact bit pattern of every component.
///
/// `-0.0` is folded onto `0.0` so that both spellings share an entry.
pub type ParamKey = Vec<u64>;

/// Builds the cache key of `params`.
pub fn param_key(params: &[f64]) -> ParamKey {
    params
        .iter()
        .map(|&x| if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() })
        .collect()
}

/// The type of evaluation cache a run wraps its challenge in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheType {
    /// Every evaluation is computed.
    #[default]
    None,
    /// One mutex-protected map shared by all workers.
    Global,
    /// One map per worker thread, no contention.
    ThreadLocal,
}

/// A wrapper around a challenge that caches fitness evaluations in a shared map.
#[derive(Debug, Clone)]
pub struct CachedChallenge<C>
where
    C: Challenge,
{
    challenge: C,
    cache: Arc<Mutex<HashMap<ParamKey, f64>>>,
}

impl<C> CachedChallenge<C>
where
    C: Challenge,
{
    /// Wraps `challenge` with an empty cache.
    pub fn new(challenge: C) -> Self {
        Self {
            challenge,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts from previously computed costs, e.g. restored from an earlier run.
    pub fn with_cache(challenge: C, cache: HashMap<ParamKey, f64>) -> Self {
        Self {
            challenge,
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    /// Returns a reference to the wrapped challenge.
    pub fn inner(&self) -> &C {
        &self.challenge
    }

    /// Number of distinct parameter vectors cached.
    pub fn cache_size(&self) -> usize {
        self.lock().len()
    }

    /// Clears the cache.
    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    /// Snapshot of every cached cost.
    pub fn get_cache(&self) -> HashMap<ParamKey, f64> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ParamKey, f64>> {
        // A panicking evaluation never leaves the map half-written.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C> Challenge for CachedChallenge<C>
where
    C: Challenge,
{
    fn score(&self, params: &[f64]) -> f64 {
        let key = param_key(params);

        if let Some(score) = self.lock().get(&key) {
            return *score;
        }

        // The lock is not held while the model integrates.
        let score = self.challenge.score(params);
        self.lock().insert(key, score);

        score
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.challenge.validate()
    }
}

/// Per-thread maps from parameter keys to costs.
///
/// Each evaluation worker gets its own map, so lookups never contend.
#[derive(Debug)]
pub struct ThreadLocalCache {
    cache: ThreadLocal<RefCell<HashMap<ParamKey, f64>>>,
}

impl ThreadLocalCache {
    pub fn new() -> Self {
        Self {
            cache: ThreadLocal::new(),
        }
    }

    /// Gets a cached fitness value if the current thread has one.
    pub fn get(&self, key: &ParamKey) -> Option<f64> {
        self.cache
            .get()
            .and_then(|cell| cell.try_borrow().ok())
            .and_then(|cache| cache.get(key).copied())
    }

    /// Inserts a fitness value into the current thread's cache.
    pub fn insert(&self, key: ParamKey, value: f64) {
        let cell = self.cache.get_or_default();
        if let Ok(mut cache) = cell.try_borrow_mut() {
            cache.insert(key, value);
        }
    }

    /// Clears the cache for the current thread.
    pub fn clear(&self) {
        if let Some(cell) = self.cache.get() {
            if let Ok(mut cache) = cell.try_borrow_mut() {
                cache.clear();
            }
        }
    }

    /// Number of distinct parameter vectors cached by the current thread.
    pub fn len(&self) -> usize {
        self.cache
            .get()
            .and_then(|cell| cell.try_borrow().ok())
            .map_or(0, |cache| cache.len())
    }

    /// Returns `true` if the cache for the current thread is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ThreadLocalCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Challenge wrapper backed by a [`ThreadLocalCache`].
#[derive(Debug, Clone)]
pub struct ThreadLocalCachedChallenge<C>
where
    C: Challenge,
{
    challenge: C,
    cache: Arc<ThreadLocalCache>,
}

impl<C> ThreadLocalCachedChallenge<C>
where
    C: Challenge,
{
    pub fn new(challenge: C) -> Self {
        Self {
            challenge,
            cache: Arc::new(ThreadLocalCache::new()),
        }
    }

    /// Returns a reference to the wrapped challenge.
    pub fn inner(&self) -> &C {
        &self.challenge
    }

    /// Clears the cache for the current thread.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of distinct parameter vectors cached by the current thread.
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

impl<C> Challenge for ThreadLocalCachedChallenge<C>
where
    C: Challenge,
{
    fn score(&self, params: &[f64]) -> f64 {
        let key = param_key(params);

        if let Some(score) = self.cache.get(&key) {
            return score;
        }

        let score = self.challenge.score(params);
        self.cache.insert(key, score);

        score
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.challenge.validate()
    }
}

/// Wraps `challenge` in the cache selected by `cache_type`.
pub fn with_cache<'a, C>(challenge: &'a C, cache_type: CacheType) -> Box<dyn Challenge + 'a>
where
    C: Challenge,
{
    match cache_type {
        CacheType::None => Box::new(challenge),
        CacheType::Global => Box::new(CachedChallenge::new(challenge)),
        CacheType::ThreadLocal => Box::new(ThreadLocalCachedChallenge::new(challenge)),
    }
}
