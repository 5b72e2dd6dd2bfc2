//! Evolutionary Search Walkthrough
//!
//! Breeds reply-style parameter sets under live bandit selection: the zoo
//! Thompson-samples which mutant serves each request, conversions feed its
//! counters, and an evolution round scores, ranks, retires, and breeds.
//!
//! Run with: cargo run --example evolution_flow

use bandido::evolve::{
    compare_weighted, FitnessFn, Mutant, PropertyDomain, PropertyValue, Zoo, ZooConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bandido=info")),
        )
        .init();

    println!("=== Bandido Evolution Flow ===\n");

    // -------------------------------------------------------------------------
    // 1. Declare the genome space
    // -------------------------------------------------------------------------
    println!("1. Property domain:");

    let domain = PropertyDomain::new()
        .with_property("temperature", vec![0.2.into(), 0.7.into(), 1.0.into()])
        .with_property(
            "style",
            vec!["terse".into(), "friendly".into(), "formal".into()],
        )
        .with_property("emoji", vec![true.into(), false.into()]);

    for name in domain.property_names() {
        println!(
            "   {:<12} {} candidates",
            name,
            domain.values(name).unwrap().len()
        );
    }

    // -------------------------------------------------------------------------
    // 2. Seed the zoo
    // -------------------------------------------------------------------------
    let cfg = ZooConfig {
        population_size: 8,
        mutation_rate: 0.25,
        mutation_strength: 0.5,
    };
    let mut zoo = Zoo::with_seed(domain, cfg, 42);
    zoo.seed_population()?;
    println!("\n2. Seeded {} mutants", zoo.len());

    // -------------------------------------------------------------------------
    // 3. Serve traffic (friendly style and low temperature convert best)
    // -------------------------------------------------------------------------
    println!("\n3. Serving 400 requests...");

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..400 {
        let id = zoo.select()?;
        let rate = {
            let genome = zoo.get(id).unwrap().properties();
            let mut rate = 0.02;
            if matches!(genome.get("style"), Some(PropertyValue::Text(s)) if s == "friendly") {
                rate += 0.10;
            }
            if matches!(genome.get("temperature"), Some(PropertyValue::Float(t)) if *t < 0.5) {
                rate += 0.08;
            }
            rate
        };
        if rng.gen_bool(rate) {
            zoo.reward(id)?;
        }
    }

    for mutant in zoo.mutants() {
        println!(
            "   mutant {:<2} pulls={:<3} rewards={:<2} genome: {}",
            mutant.id(),
            mutant.stats().pulls(),
            mutant.stats().rewards(),
            genome_line(mutant)
        );
    }

    // -------------------------------------------------------------------------
    // 4. Score and rank the population
    // -------------------------------------------------------------------------
    println!("\n4. Evaluating fitness (conversion posterior, emoji-free bonus)...");

    let objectives: Vec<FitnessFn> = vec![
        Box::new(|m| m.stats().posterior_mean()),
        Box::new(|m| {
            if matches!(m.properties().get("emoji"), Some(PropertyValue::Flag(false))) {
                1.0
            } else {
                0.0
            }
        }),
    ];
    zoo.evaluate(&objectives);

    let ranked = zoo.elites(zoo.len(), compare_weighted(vec![1.0, 0.05]));
    println!("   Ranked population:");
    for mutant in &ranked {
        println!(
            "     mutant {:<2} fitness={:?}",
            mutant.id(),
            mutant.fitness().unwrap()
        );
    }
    let best = ranked[0].id();
    let second = ranked[1].id();
    let weakest = ranked.last().unwrap().id();

    // -------------------------------------------------------------------------
    // 5. Retire the weakest
    // -------------------------------------------------------------------------
    let diversity_before = zoo.diversity();
    zoo.retire(weakest)?;
    println!("\n5. Retired mutant {weakest}");

    // -------------------------------------------------------------------------
    // 6. Breed from the elites
    // -------------------------------------------------------------------------
    println!("\n6. Breeding...");

    let crossed = zoo.crossover_pair(best, second)?;
    let spawned = zoo.spawn_from(crossed)?;
    println!(
        "   crossover({best}, {second}) -> mutant {} (age {})",
        crossed,
        zoo.get(crossed).unwrap().age()
    );
    println!(
        "   spawn_from({crossed}) -> mutant {} with {} recorded mutations",
        spawned,
        zoo.get(spawned).unwrap().history().len()
    );
    println!(
        "   diversity before={diversity_before:.3e} after={:.3e}",
        zoo.diversity()
    );

    // -------------------------------------------------------------------------
    // 7. Persist the champion
    // -------------------------------------------------------------------------
    let champion = zoo.get(best).unwrap().clone();
    println!("\n7. Champion is mutant {best}: {}", genome_line(&champion));

    let path = std::env::temp_dir().join("bandido-champion.json");
    champion.save(&path)?;
    let restored = Mutant::load(&path)?;
    std::fs::remove_file(&path)?;
    println!("   Round-trips through JSON: {}", restored == champion);

    println!("\n=== Evolution Flow Complete ===");
    Ok(())
}

fn genome_line(mutant: &Mutant) -> String {
    mutant
        .properties()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
