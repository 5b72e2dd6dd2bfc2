//! # Bandido: Embedded Multi-Armed Bandit Experiment Engine
//!
//! Bandido allocates users to experiment choices with Thompson Sampling,
//! keeps assignments sticky, counts at most one conversion per user, and
//! reuses the same Beta-Bernoulli machinery to drive evolutionary search
//! over typed genomes.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: empty choice sets fail loudly; swallow-on-error
//!   lives only in `safe_*` variants whose types say so
//! - **Genchi Genbutsu**: counters are aggregated from the assignment log at
//!   query time, never cached where they can drift
//! - **Jidoka**: races on first assignment resolve to one durable winner
//!   that every caller observes
//! - **Muda elimination**: one allocator serves both experiment sessions and
//!   the evolutionary zoo
//!
//! ## Example Usage
//!
//! ```rust
//! use bandido::{ExperimentSession, MemoryStore, RewardOutcome};
//! use std::sync::Arc;
//!
//! # fn main() -> bandido::Result<()> {
//! let session = ExperimentSession::with_seed(Arc::new(MemoryStore::new()), 42);
//! session.register_experiment("checkout-button", ["red", "blue", "green"])?;
//!
//! // First pull allocates; every later pull returns the same choice.
//! let choice = session.pull("user-1", "checkout-button")?;
//! assert_eq!(session.pull("user-1", "checkout-button")?, choice);
//!
//! // Rewards attach to the assignment, at most once.
//! assert_eq!(
//!     session.reward("user-1", "checkout-button")?,
//!     RewardOutcome::Recorded
//! );
//! assert_eq!(
//!     session.reward("user-1", "checkout-button")?,
//!     RewardOutcome::AlreadyRewarded
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod allocator;
pub mod error;
pub mod evolve;
pub mod record;
pub mod session;
pub mod store;

pub use allocator::{ChoiceStats, ThompsonAllocator, ThompsonConfig};
pub use error::{Error, Result};
pub use record::{AssignmentRecord, ExperimentRecord};
pub use session::{ExperimentSession, RewardOutcome};
pub use store::{ExperimentStore, MemoryStore};
