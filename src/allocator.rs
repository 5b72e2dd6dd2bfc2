//! Thompson Sampling over Beta-Bernoulli posteriors
//!
//! The allocator is the probabilistic core shared by experiment sessions and
//! the evolutionary zoo. Each choice carries pull/reward counters; a draw from
//! `Beta(alpha0 + rewards, beta0 + failures)` per choice picks the argmax.
//! Choices with little data produce wide posteriors (exploration), choices
//! with strong track records produce tight ones (exploitation).
//!
//! The allocator itself is stateless: counters live in the store and are
//! aggregated at query time, so no in-process state can drift from durable
//! truth.
//!
//! # Example
//!
//! ```
//! use bandido::{ChoiceStats, ThompsonAllocator};
//! use std::collections::BTreeMap;
//!
//! let mut records = BTreeMap::new();
//! records.insert("red".to_string(), ChoiceStats::new(100, 90));
//! records.insert("blue".to_string(), ChoiceStats::new(100, 10));
//!
//! let allocator = ThompsonAllocator::new();
//! let choice = allocator.select(&records).unwrap();
//! assert!(records.contains_key(&choice));
//! ```

use crate::error::{Error, Result};
use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated pull/reward counters for one choice
///
/// Counters are recomputed from the assignment log at query time rather than
/// maintained as mutable running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceStats {
    pulls: u64,
    rewards: u64,
}

impl ChoiceStats {
    /// Create counters from raw pull/reward totals
    #[must_use]
    pub const fn new(pulls: u64, rewards: u64) -> Self {
        Self { pulls, rewards }
    }

    /// Number of times this choice was served
    #[must_use]
    pub const fn pulls(&self) -> u64 {
        self.pulls
    }

    /// Number of recorded successes
    #[must_use]
    pub const fn rewards(&self) -> u64 {
        self.rewards
    }

    /// Failures under the Bernoulli model
    ///
    /// Saturates at zero when rewards outrun pulls, which skews the posterior
    /// optimistic instead of panicking on underflow.
    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.pulls.saturating_sub(self.rewards)
    }

    /// Record one pull
    pub fn record_pull(&mut self) {
        self.pulls += 1;
    }

    /// Record one reward
    pub fn record_reward(&mut self) {
        self.rewards += 1;
    }

    /// Posterior mean under the uniform Beta(1, 1) prior
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn posterior_mean(&self) -> f64 {
        let successes = self.rewards as f64;
        let failures = self.failures() as f64;
        (1.0 + successes) / (2.0 + successes + failures)
    }
}

/// Prior configuration for the Beta-Bernoulli model
///
/// The default `(1.0, 1.0)` is the uniform prior: every success probability
/// is equally likely before any data arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThompsonConfig {
    /// Prior alpha (must be > 0)
    pub alpha0: f64,
    /// Prior beta (must be > 0)
    pub beta0: f64,
}

impl Default for ThompsonConfig {
    fn default() -> Self {
        Self {
            alpha0: 1.0,
            beta0: 1.0,
        }
    }
}

/// Thompson Sampling allocator
///
/// Holds only prior configuration. Randomness is injected per call:
/// [`select`](Self::select) uses the process-global thread RNG,
/// [`select_with`](Self::select_with) takes any [`Rng`] for reproducible
/// draws in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThompsonAllocator {
    cfg: ThompsonConfig,
}

impl ThompsonAllocator {
    /// Create an allocator with the uniform prior
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator with explicit priors
    #[must_use]
    pub const fn with_config(cfg: ThompsonConfig) -> Self {
        Self { cfg }
    }

    /// Prior configuration in effect
    #[must_use]
    pub const fn config(&self) -> &ThompsonConfig {
        &self.cfg
    }

    /// Select a choice using the process-global thread RNG
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoChoices`] when `records` is empty.
    pub fn select<K>(&self, records: &BTreeMap<K, ChoiceStats>) -> Result<K>
    where
        K: Ord + Clone,
    {
        self.select_with(records, &mut rand::thread_rng())
    }

    /// Select a choice using an injected RNG
    ///
    /// Draws one Beta sample per choice and returns the key with the largest
    /// draw. Iteration follows `BTreeMap` order, so an exact tie keeps the
    /// first (smallest) key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoChoices`] when `records` is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn select_with<K, R>(&self, records: &BTreeMap<K, ChoiceStats>, rng: &mut R) -> Result<K>
    where
        K: Ord + Clone,
        R: Rng,
    {
        let mut best: Option<&K> = None;
        let mut best_sample = f64::NEG_INFINITY;

        for (key, stats) in records {
            let alpha = self.cfg.alpha0 + stats.rewards() as f64;
            let beta = self.cfg.beta0 + stats.failures() as f64;
            let theta = sample_beta(alpha, beta, rng);
            if theta > best_sample {
                best_sample = theta;
                best = Some(key);
            }
        }

        best.cloned().ok_or(Error::NoChoices)
    }
}

/// Draw from `Beta(alpha, beta)`, falling back to a neutral 0.5 when the
/// parameters are degenerate (non-finite or non-positive priors).
fn sample_beta<R: Rng>(alpha: f64, beta: f64, rng: &mut R) -> f64 {
    if !(alpha.is_finite() && beta.is_finite()) || alpha <= 0.0 || beta <= 0.0 {
        return 0.5;
    }
    match Beta::new(alpha, beta) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.5,
    }
}
