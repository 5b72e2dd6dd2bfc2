//! Zoo - a live population under combined bandit selection and breeding

use super::mutant::{Mutant, PropertyDomain};
use super::{genetic_diversity, parallel_evaluate, select_elites, FitnessFn};
use crate::allocator::{ChoiceStats, ThompsonAllocator};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Population management knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZooConfig {
    /// Mutants to maintain when seeding.
    pub population_size: usize,
    /// Per-property redraw probability for newly minted mutants.
    pub mutation_rate: f64,
    /// Mutation strength carried on newly minted mutants.
    pub mutation_strength: f64,
}

impl Default for ZooConfig {
    fn default() -> Self {
        Self {
            population_size: 20,
            mutation_rate: 0.1,
            mutation_strength: 0.5,
        }
    }
}

/// A population of mutants sharing one [`PropertyDomain`].
///
/// The zoo plays both halves of the evolutionary loop. Online, it
/// Thompson-samples over each mutant's pull/reward counters to decide who
/// serves the next request. Offline, it scores the population against
/// fitness objectives and breeds replacements from the elites.
///
/// Methods take `&mut self`; wrap the zoo in a lock to drive it from
/// several threads.
#[derive(Debug)]
pub struct Zoo {
    domain: PropertyDomain,
    population: Vec<Mutant>,
    cfg: ZooConfig,
    allocator: ThompsonAllocator,
    rng: StdRng,
    next_id: u64,
}

impl Zoo {
    /// Create an empty zoo seeded from OS entropy.
    #[must_use]
    pub fn new(domain: PropertyDomain, cfg: ZooConfig) -> Self {
        Self::from_rng(domain, cfg, StdRng::from_entropy())
    }

    /// Create an empty zoo with a fixed seed (reproducible evolution).
    #[must_use]
    pub fn with_seed(domain: PropertyDomain, cfg: ZooConfig, seed: u64) -> Self {
        Self::from_rng(domain, cfg, StdRng::seed_from_u64(seed))
    }

    fn from_rng(domain: PropertyDomain, cfg: ZooConfig, rng: StdRng) -> Self {
        Self {
            domain,
            population: Vec::new(),
            cfg,
            allocator: ThompsonAllocator::new(),
            rng,
            next_id: 0,
        }
    }

    /// The shared property domain.
    #[must_use]
    pub const fn domain(&self) -> &PropertyDomain {
        &self.domain
    }

    /// The live population, in insertion order.
    #[must_use]
    pub fn mutants(&self) -> &[Mutant] {
        &self.population
    }

    /// Look up a mutant by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Mutant> {
        self.population.iter().find(|m| m.id() == id)
    }

    /// Population size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.population.len()
    }

    /// Check whether the population is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// Fill the population with random genomes up to the configured size.
    ///
    /// Existing mutants are kept; only the shortfall is minted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyDomain`] when a property has no candidates.
    pub fn seed_population(&mut self) -> Result<()> {
        while self.population.len() < self.cfg.population_size {
            let genome = self.domain.random_genome(&mut self.rng)?;
            let id = self.mint_id();
            self.population.push(Mutant::new(
                id,
                genome,
                self.cfg.mutation_rate,
                self.cfg.mutation_strength,
            ));
        }
        info!(population = self.population.len(), "zoo population seeded");
        Ok(())
    }

    /// Pick the mutant to serve next via Thompson Sampling and record the
    /// pull on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPopulation`] when no mutants are live.
    pub fn select(&mut self) -> Result<u64> {
        if self.population.is_empty() {
            return Err(Error::EmptyPopulation);
        }

        let records: BTreeMap<u64, ChoiceStats> = self
            .population
            .iter()
            .map(|m| (m.id(), m.stats()))
            .collect();
        let id = self.allocator.select_with(&records, &mut self.rng)?;

        if let Some(mutant) = self.population.iter_mut().find(|m| m.id() == id) {
            mutant.record_pull();
        }
        debug!(mutant = id, "mutant selected");
        Ok(id)
    }

    /// Record a success for a mutant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MutantNotFound`] for an id not in the population.
    pub fn reward(&mut self, id: u64) -> Result<()> {
        match self.population.iter_mut().find(|m| m.id() == id) {
            Some(mutant) => {
                mutant.record_reward();
                Ok(())
            }
            None => Err(Error::MutantNotFound(id)),
        }
    }

    /// Breed a mutated child from a parent and add it to the population.
    ///
    /// Returns the child's id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MutantNotFound`] for an unknown parent and
    /// [`Error::EmptyDomain`] when a redraw has no candidates.
    pub fn spawn_from(&mut self, parent_id: u64) -> Result<u64> {
        let parent_idx = self
            .population
            .iter()
            .position(|m| m.id() == parent_id)
            .ok_or(Error::MutantNotFound(parent_id))?;
        let id = self.mint_id();
        let child = self.population[parent_idx].spawn_child(id, &self.domain, &mut self.rng)?;
        self.population.push(child);
        debug!(parent = parent_id, child = id, "mutant spawned");
        Ok(id)
    }

    /// Breed a crossover child from two parents and add it to the
    /// population.
    ///
    /// Returns the child's id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MutantNotFound`] when either parent is unknown.
    pub fn crossover_pair(&mut self, id_a: u64, id_b: u64) -> Result<u64> {
        let idx_a = self
            .population
            .iter()
            .position(|m| m.id() == id_a)
            .ok_or(Error::MutantNotFound(id_a))?;
        let idx_b = self
            .population
            .iter()
            .position(|m| m.id() == id_b)
            .ok_or(Error::MutantNotFound(id_b))?;

        let id = self.mint_id();
        let child = {
            let a = &self.population[idx_a];
            let b = &self.population[idx_b];
            a.crossover(b, id, &mut self.rng)
        };
        self.population.push(child);
        debug!(parent_a = id_a, parent_b = id_b, child = id, "mutants crossed");
        Ok(id)
    }

    /// Remove a mutant from the population.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MutantNotFound`] for an id not in the population.
    pub fn retire(&mut self, id: u64) -> Result<Mutant> {
        let idx = self
            .population
            .iter()
            .position(|m| m.id() == id)
            .ok_or(Error::MutantNotFound(id))?;
        Ok(self.population.remove(idx))
    }

    /// Score the whole population against the objectives.
    ///
    /// Runs across the rayon worker pool when the `rayon` feature is on.
    pub fn evaluate(&mut self, objectives: &[FitnessFn]) {
        parallel_evaluate(&mut self.population, objectives);
    }

    /// The `count` greatest mutants under an explicit comparator.
    pub fn elites<F>(&self, count: usize, compare: F) -> Vec<&Mutant>
    where
        F: FnMut(&Mutant, &Mutant) -> Ordering,
    {
        select_elites(&self.population, count, compare)
    }

    /// Summed per-property variance of the current population.
    #[must_use]
    pub fn diversity(&self) -> f64 {
        genetic_diversity(&self.population)
    }

    fn mint_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
