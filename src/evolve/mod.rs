//! Evolutionary Search Engine
//!
//! Generate-and-test over typed genomes, with the same Beta-Bernoulli
//! machinery the experiment session uses deciding which mutant serves live
//! traffic:
//!
//! ```text
//! PropertyDomain ──seed──▶ Zoo ──select (Thompson over pulls/rewards)──▶ serve
//!        ▲                  │ ▲                                            │
//!        │                  │ └──────────────── reward ◀───────────────────┘
//!        │                  ▼
//!        └── spawn_child / crossover ◀── elites ◀── evaluate (fitness vector)
//! ```
//!
//! [`Mutant`] owns the genome plus its audit trail; this module's free
//! functions score and rank whole populations; [`Zoo`] drives the loop.
//!
//! Fitness is a vector (one score per objective). The crate never orders
//! fitness vectors implicitly: ranking takes an explicit comparator, with
//! [`compare_weighted`] as the scalarizing helper.
//!
//! # Example
//!
//! ```
//! use bandido::evolve::{compare_weighted, FitnessFn, PropertyDomain, Zoo, ZooConfig};
//!
//! # fn main() -> bandido::Result<()> {
//! let domain = PropertyDomain::new()
//!     .with_property("temperature", vec![0.2.into(), 0.7.into(), 1.0.into()])
//!     .with_property("style", vec!["terse".into(), "verbose".into()]);
//!
//! let mut zoo = Zoo::with_seed(domain, ZooConfig::default(), 42);
//! zoo.seed_population()?;
//!
//! // Serve traffic: select a live mutant, reward the ones that worked.
//! let id = zoo.select()?;
//! zoo.reward(id)?;
//!
//! // Evolve: score everyone, breed from the best.
//! let objectives: Vec<FitnessFn> = vec![Box::new(|m| m.stats().posterior_mean())];
//! zoo.evaluate(&objectives);
//! let best = zoo.elites(1, compare_weighted(vec![1.0]))[0].id();
//! zoo.spawn_from(best)?;
//! # Ok(())
//! # }
//! ```

mod mutant;
mod zoo;

pub use mutant::{Mutant, MutationEvent, PropertyDomain, PropertyValue};
pub use zoo::{Zoo, ZooConfig};

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Boxed fitness objective: scores one mutant on one axis.
pub type FitnessFn = Box<dyn Fn(&Mutant) -> f64 + Send + Sync>;

/// Score one mutant against every objective, in order.
pub fn evaluate_fitness(mutant: &mut Mutant, objectives: &[FitnessFn]) {
    let scores: Vec<f64> = objectives.iter().map(|objective| objective(mutant)).collect();
    mutant.set_fitness(scores);
}

/// Score a whole population across the rayon worker pool.
///
/// Joins before returning. A panicking objective propagates to the caller;
/// which mutants were already scored at that point is unspecified.
#[cfg(feature = "rayon")]
pub fn parallel_evaluate(population: &mut [Mutant], objectives: &[FitnessFn]) {
    use rayon::prelude::*;
    population
        .par_iter_mut()
        .for_each(|mutant| evaluate_fitness(mutant, objectives));
}

/// Score a whole population sequentially (rayon feature disabled).
#[cfg(not(feature = "rayon"))]
pub fn parallel_evaluate(population: &mut [Mutant], objectives: &[FitnessFn]) {
    for mutant in population.iter_mut() {
        evaluate_fitness(mutant, objectives);
    }
}

/// Pick the `count` greatest mutants under an explicit comparator,
/// greatest first.
///
/// There is deliberately no default ordering: fitness is a vector and only
/// the caller knows how to weigh its axes. Ties keep population order.
/// Asking for more elites than exist returns the whole population ranked.
pub fn select_elites<F>(population: &[Mutant], count: usize, mut compare: F) -> Vec<&Mutant>
where
    F: FnMut(&Mutant, &Mutant) -> Ordering,
{
    let mut ranked: Vec<&Mutant> = population.iter().collect();
    ranked.sort_by(|a, b| compare(b, a));
    ranked.truncate(count);
    ranked
}

/// Collapse a fitness vector to one score by weighted sum.
///
/// Objectives beyond the weight list are ignored, and vice versa. An
/// unevaluated mutant scores negative infinity, ranking below every
/// evaluated one.
#[must_use]
pub fn weighted_fitness(mutant: &Mutant, weights: &[f64]) -> f64 {
    match mutant.fitness() {
        Some(scores) => scores
            .iter()
            .zip(weights)
            .map(|(score, weight)| score * weight)
            .sum(),
        None => f64::NEG_INFINITY,
    }
}

/// Build a [`select_elites`] comparator from objective weights.
pub fn compare_weighted(weights: Vec<f64>) -> impl Fn(&Mutant, &Mutant) -> Ordering {
    move |a, b| weighted_fitness(a, &weights).total_cmp(&weighted_fitness(b, &weights))
}

/// Summed per-property population variance of the numeric projections.
///
/// Zero for fewer than two mutants and for populations of identical
/// genomes; grows as genomes drift apart. Order of the population does not
/// matter. Non-numeric values contribute through their hash projection, a
/// spread signal rather than a meaningful distance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn genetic_diversity(population: &[Mutant]) -> f64 {
    if population.len() < 2 {
        return 0.0;
    }

    let mut names: BTreeSet<&str> = BTreeSet::new();
    for mutant in population {
        names.extend(mutant.properties().keys().map(String::as_str));
    }

    let mut total = 0.0;
    for name in names {
        let values: Vec<f64> = population
            .iter()
            .filter_map(|mutant| mutant.properties().get(name))
            .map(PropertyValue::numeric_projection)
            .collect();
        if values.len() < 2 {
            continue;
        }
        // Shift by the first value before averaging. Hash projections sit
        // near 2^64, where naive summation rounds and identical genomes
        // would report nonzero variance.
        let base = values[0];
        let count = values.len() as f64;
        let mean = values.iter().map(|v| v - base).sum::<f64>() / count;
        let variance = values
            .iter()
            .map(|v| (v - base - mean).powi(2))
            .sum::<f64>()
            / count;
        total += variance;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mutant_with(id: u64, size: i64, color: &str) -> Mutant {
        let mut genome = BTreeMap::new();
        genome.insert("size".to_string(), PropertyValue::Int(size));
        genome.insert("color".to_string(), PropertyValue::from(color));
        Mutant::new(id, genome, 0.1, 0.5)
    }

    #[test]
    fn test_evaluate_fitness_scores_in_objective_order() {
        let mut mutant = mutant_with(0, 4, "red");
        let objectives: Vec<FitnessFn> = vec![
            Box::new(|m| m.properties()["size"].numeric_projection()),
            Box::new(|_| 9.0),
        ];
        evaluate_fitness(&mut mutant, &objectives);
        assert_eq!(mutant.fitness(), Some(&[4.0, 9.0][..]));
    }

    #[test]
    fn test_parallel_evaluate_covers_population() {
        let mut population: Vec<Mutant> = (0..64u64)
            .map(|i| mutant_with(i, i64::try_from(i).unwrap(), "red"))
            .collect();
        let objectives: Vec<FitnessFn> =
            vec![Box::new(|m| m.properties()["size"].numeric_projection() * 2.0)];

        parallel_evaluate(&mut population, &objectives);

        for mutant in &population {
            let expected = mutant.properties()["size"].numeric_projection() * 2.0;
            assert_eq!(mutant.fitness(), Some(&[expected][..]));
        }
    }

    #[test]
    fn test_select_elites_ranks_by_comparator() {
        let mut population = vec![
            mutant_with(0, 1, "a"),
            mutant_with(1, 3, "b"),
            mutant_with(2, 2, "c"),
        ];
        let objectives: Vec<FitnessFn> =
            vec![Box::new(|m| m.properties()["size"].numeric_projection())];
        for mutant in &mut population {
            evaluate_fitness(mutant, &objectives);
        }

        let elites = select_elites(&population, 2, compare_weighted(vec![1.0]));
        assert_eq!(elites.len(), 2);
        assert_eq!(elites[0].id(), 1);
        assert_eq!(elites[1].id(), 2);
    }

    #[test]
    fn test_select_elites_unevaluated_rank_last() {
        let mut scored = mutant_with(0, 1, "a");
        scored.set_fitness(vec![-100.0]);
        let unscored = mutant_with(1, 99, "b");
        let population = vec![unscored, scored];

        let elites = select_elites(&population, 2, compare_weighted(vec![1.0]));
        assert_eq!(elites[0].id(), 0);
        assert_eq!(elites[1].id(), 1);
    }

    #[test]
    fn test_select_elites_count_beyond_population() {
        let population = vec![mutant_with(0, 1, "a")];
        let elites = select_elites(&population, 10, compare_weighted(vec![1.0]));
        assert_eq!(elites.len(), 1);
    }

    #[test]
    fn test_weighted_fitness_truncates_to_shorter() {
        let mut mutant = mutant_with(0, 1, "a");
        mutant.set_fitness(vec![2.0, 3.0, 100.0]);
        // Third objective has no weight and is dropped.
        assert!((weighted_fitness(&mutant, &[1.0, 2.0]) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weighted_fitness_unevaluated_is_neg_infinity() {
        let mutant = mutant_with(0, 1, "a");
        assert_eq!(weighted_fitness(&mutant, &[1.0]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_diversity_identical_population_is_zero() {
        let population = vec![
            mutant_with(0, 5, "red"),
            mutant_with(1, 5, "red"),
            mutant_with(2, 5, "red"),
        ];
        assert!(genetic_diversity(&population).abs() < f64::EPSILON);
    }

    #[test]
    fn test_diversity_grows_with_variation() {
        let uniform = vec![mutant_with(0, 5, "red"), mutant_with(1, 5, "red")];
        let varied_numeric = vec![mutant_with(0, 1, "red"), mutant_with(1, 9, "red")];
        let varied_text = vec![mutant_with(0, 5, "red"), mutant_with(1, 5, "blue")];

        assert!(genetic_diversity(&varied_numeric) > genetic_diversity(&uniform));
        assert!(genetic_diversity(&varied_text) > genetic_diversity(&uniform));
    }

    #[test]
    fn test_diversity_is_order_invariant() {
        let forward = vec![mutant_with(0, 1, "a"), mutant_with(1, 7, "b")];
        let backward = vec![mutant_with(1, 7, "b"), mutant_with(0, 1, "a")];
        let d1 = genetic_diversity(&forward);
        let d2 = genetic_diversity(&backward);
        // Hash projections are astronomical, so compare relatively.
        assert!((d1 - d2).abs() <= d1.abs() * 1e-9);
    }

    #[test]
    fn test_diversity_below_two_mutants_is_zero() {
        assert!(genetic_diversity(&[]).abs() < f64::EPSILON);
        assert!(genetic_diversity(&[mutant_with(0, 1, "a")]).abs() < f64::EPSILON);
    }
}
