//! Sticky Allocation Walkthrough
//!
//! Simulates live traffic against one experiment: users get allocated with
//! Thompson Sampling, assignments stay sticky, rewards arrive for a fraction
//! of users, and traffic shifts toward the converting choice.
//!
//! Run with: cargo run --example experiment_flow

use bandido::store::ExperimentStore;
use bandido::{ExperimentSession, MemoryStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bandido=info")),
        )
        .init();

    println!("=== Bandido Experiment Flow ===\n");

    // -------------------------------------------------------------------------
    // 1. Register an experiment
    // -------------------------------------------------------------------------
    println!("1. Registering experiment...");

    let store = Arc::new(MemoryStore::new());
    let session = ExperimentSession::with_seed(Arc::clone(&store), 42);

    let experiment = session.register_experiment("checkout-button", ["red", "blue", "green"])?;
    println!("   Name: {}", experiment.name());
    println!("   Version: {}", experiment.version());
    println!("   Choices: {:?}", experiment.choices());

    // -------------------------------------------------------------------------
    // 2. Simulate traffic with hidden conversion rates
    // -------------------------------------------------------------------------
    println!("\n2. Simulating 2000 users (hidden rates: red 12%, blue 4%, green 2%)...");

    let mut rng = StdRng::seed_from_u64(7);
    for i in 0..2000 {
        let user = format!("user-{i}");
        let choice = session.pull(&user, "checkout-button")?;
        let rate = match choice.as_str() {
            "red" => 0.12,
            "blue" => 0.04,
            _ => 0.02,
        };
        if rng.gen_bool(rate) {
            session.reward(&user, "checkout-button")?;
        }
    }

    // -------------------------------------------------------------------------
    // 3. Inspect the aggregated counters
    // -------------------------------------------------------------------------
    println!("\n3. Aggregated counters:");

    let stats = store.choice_stats("checkout-button", experiment.choices(), None)?;
    for (choice, counters) in &stats {
        println!(
            "   {:<6} pulls={:<5} rewards={:<4} posterior_mean={:.4}",
            choice,
            counters.pulls(),
            counters.rewards(),
            counters.posterior_mean()
        );
    }

    let total: u64 = stats.values().map(|c| c.pulls()).sum();
    let (leader, leader_stats) = stats.iter().max_by_key(|(_, c)| c.pulls()).unwrap();
    println!(
        "   Leader: {} with {:.1}% of traffic",
        leader,
        100.0 * leader_stats.pulls() as f64 / total as f64
    );

    // -------------------------------------------------------------------------
    // 4. Assignments are sticky
    // -------------------------------------------------------------------------
    println!("\n4. Stickiness:");

    let first = session.pull("user-0", "checkout-button")?;
    let again = session.pull("user-0", "checkout-button")?;
    println!("   user-0 first pull: {first}");
    println!("   user-0 later pull: {again}");

    // -------------------------------------------------------------------------
    // 5. Reward reporting is idempotent and absorbing
    // -------------------------------------------------------------------------
    println!("\n5. Reward outcomes:");

    println!(
        "   repeat report for user-0: {:?}",
        session.reward("user-0", "checkout-button")?
    );
    println!(
        "   report for a user never pulled: {:?}",
        session.reward("ghost", "checkout-button")?
    );

    // -------------------------------------------------------------------------
    // 6. Changing the choice set versions the experiment
    // -------------------------------------------------------------------------
    println!("\n6. Versioning on choice-set change:");

    let v1 = session.register_experiment("checkout-button", ["red", "blue", "green", "purple"])?;
    println!("   Current version: {}", v1.version());

    let history = store.experiment_history("checkout-button")?;
    println!("   History ({} versions):", history.len());
    for record in &history {
        println!("     v{} -> {:?}", record.version(), record.choices());
    }

    // -------------------------------------------------------------------------
    // 7. Swallowing variants never fail the request path
    // -------------------------------------------------------------------------
    println!("\n7. Safe variants:");

    println!(
        "   safe_pull on an unregistered experiment: {:?}",
        session.safe_pull("user-1", "not-registered")
    );
    println!(
        "   safe_reward for the same: {:?}",
        session.safe_reward("user-1", "not-registered")
    );

    println!("\n=== Experiment Flow Complete ===");
    Ok(())
}
