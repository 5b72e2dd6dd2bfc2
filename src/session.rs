//! Experiment Session - sticky allocation over a store
//!
//! The session is the caller-facing surface: register an experiment, pull a
//! choice for a user, report a reward. It owns the policy glue between the
//! stateless [`ThompsonAllocator`] and an [`ExperimentStore`]:
//!
//! - **Sticky pulls**: the first pull allocates, every later pull returns the
//!   stored choice. Under a race the store picks one winner and all callers
//!   observe it.
//! - **Idempotent rewards**: a user converts at most once; double reports and
//!   reports without an assignment are absorbed, not errors.
//! - **Typed swallowing**: `safe_pull`/`safe_reward` trade errors for `None`
//!   plus a warning, for call sites that must never fail the request path.
//!
//! # Example
//!
//! ```
//! use bandido::{ExperimentSession, MemoryStore, RewardOutcome};
//! use std::sync::Arc;
//!
//! # fn main() -> bandido::Result<()> {
//! let session = ExperimentSession::with_seed(Arc::new(MemoryStore::new()), 42);
//! session.register_experiment("checkout-button", ["red", "blue"])?;
//!
//! let choice = session.pull("user-1", "checkout-button")?;
//! assert_eq!(session.pull("user-1", "checkout-button")?, choice);
//!
//! assert_eq!(
//!     session.reward("user-1", "checkout-button")?,
//!     RewardOutcome::Recorded
//! );
//! # Ok(())
//! # }
//! ```

use crate::allocator::ThompsonAllocator;
use crate::error::{Error, Result};
use crate::record::{AssignmentRecord, ExperimentRecord};
use crate::store::ExperimentStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// What a reward report did.
///
/// The swallow policy is part of the type: missing assignments and repeat
/// reports come back as values, not errors, so call sites cannot confuse
/// "absorbed" with "failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardOutcome {
    /// Reward recorded for the first time.
    Recorded,
    /// Assignment was already rewarded; counters unchanged.
    AlreadyRewarded,
    /// User has no assignment in the experiment; nothing was stored.
    NoAssignment,
}

impl RewardOutcome {
    /// Whether this report changed stored state.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// Sticky experiment session over a pluggable store.
///
/// Safe to share across threads behind an `Arc`; the only interior state is
/// the sampling RNG, guarded by a mutex held just for the draw.
pub struct ExperimentSession<S: ExperimentStore> {
    store: Arc<S>,
    allocator: ThompsonAllocator,
    rng: Mutex<StdRng>,
}

impl<S: ExperimentStore> ExperimentSession<S> {
    /// Create a session seeded from OS entropy.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            allocator: ThompsonAllocator::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a session with a fixed seed (reproducible allocation).
    #[must_use]
    pub fn with_seed(store: Arc<S>, seed: u64) -> Self {
        Self {
            store,
            allocator: ThompsonAllocator::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Access the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register an experiment, creating or versioning as needed.
    ///
    /// Delegates to
    /// [`get_or_create_experiment`](ExperimentStore::get_or_create_experiment):
    /// an unchanged choice list returns the current version, a changed one
    /// appends a new version.
    ///
    /// # Errors
    ///
    /// Propagates choice-list validation and store failures.
    pub fn register_experiment(
        &self,
        name: &str,
        choices: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<ExperimentRecord> {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        let record = self.store.get_or_create_experiment(name, &choices)?;
        info!(
            experiment = record.name(),
            version = record.version(),
            "experiment registered"
        );
        Ok(record)
    }

    /// Pull a choice for a user, allocating on first contact.
    ///
    /// The first call Thompson-samples over counters aggregated from the
    /// assignment log and stores the result; every later call returns the
    /// stored choice without sampling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] for an unregistered name, and
    /// propagates store failures.
    pub fn pull(&self, user_id: &str, experiment_name: &str) -> Result<String> {
        self.pull_inner(user_id, experiment_name, None)
    }

    /// Pull a choice within a traffic segment.
    ///
    /// Sampling aggregates only assignments tagged with `subset_key`, so
    /// segments learn independently. The assignment itself is tagged with the
    /// segment. Stickiness still spans segments: one assignment per
    /// `(user, experiment)` regardless of key.
    ///
    /// # Errors
    ///
    /// Same contract as [`pull`](Self::pull).
    pub fn pull_in_subset(
        &self,
        user_id: &str,
        experiment_name: &str,
        subset_key: &str,
    ) -> Result<String> {
        self.pull_inner(user_id, experiment_name, Some(subset_key))
    }

    fn pull_inner(
        &self,
        user_id: &str,
        experiment_name: &str,
        subset_key: Option<&str>,
    ) -> Result<String> {
        if let Some(existing) = self.store.get_assignment(user_id, experiment_name)? {
            debug!(
                user = user_id,
                experiment = experiment_name,
                choice = existing.choice_key(),
                "sticky assignment returned"
            );
            return Ok(existing.choice_key().to_string());
        }

        let experiment = self
            .store
            .current_experiment(experiment_name)?
            .ok_or_else(|| Error::ExperimentNotFound(experiment_name.to_string()))?;

        let stats =
            self.store
                .choice_stats(experiment_name, experiment.choices(), subset_key)?;
        let choice = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.allocator.select_with(&stats, &mut *rng)?
        };

        let mut builder = AssignmentRecord::builder(user_id, experiment_name, choice);
        if let Some(subset) = subset_key {
            builder = builder.subset_key(subset);
        }
        // The store resolves insert races; a losing writer gets the winner's
        // row here and returns its choice, not the local draw.
        let stored = self.store.insert_assignment(builder.build())?;
        debug!(
            user = user_id,
            experiment = experiment_name,
            choice = stored.choice_key(),
            "assignment created"
        );
        Ok(stored.choice_key().to_string())
    }

    /// Report a reward for a user's assignment.
    ///
    /// A report with no assignment behind it is absorbed with a warning
    /// rather than stored or raised: rewards only ever attach to pulls the
    /// system actually made.
    ///
    /// # Errors
    ///
    /// Propagates store failures other than the missing assignment, which
    /// maps to [`RewardOutcome::NoAssignment`].
    pub fn reward(&self, user_id: &str, experiment_name: &str) -> Result<RewardOutcome> {
        match self.store.set_rewarded(user_id, experiment_name) {
            Ok(true) => {
                debug!(
                    user = user_id,
                    experiment = experiment_name,
                    "reward recorded"
                );
                Ok(RewardOutcome::Recorded)
            }
            Ok(false) => Ok(RewardOutcome::AlreadyRewarded),
            Err(Error::AssignmentNotFound { .. }) => {
                warn!(
                    user = user_id,
                    experiment = experiment_name,
                    "reward for user with no assignment, ignored"
                );
                Ok(RewardOutcome::NoAssignment)
            }
            Err(error) => Err(error),
        }
    }

    /// [`pull`](Self::pull) that swallows errors.
    ///
    /// Failures are logged at `warn` and become `None`. For call sites that
    /// must never fail the surrounding request.
    #[must_use]
    pub fn safe_pull(&self, user_id: &str, experiment_name: &str) -> Option<String> {
        match self.pull(user_id, experiment_name) {
            Ok(choice) => Some(choice),
            Err(error) => {
                warn!(
                    user = user_id,
                    experiment = experiment_name,
                    %error,
                    "pull failed, swallowed"
                );
                None
            }
        }
    }

    /// [`pull_in_subset`](Self::pull_in_subset) that swallows errors.
    #[must_use]
    pub fn safe_pull_in_subset(
        &self,
        user_id: &str,
        experiment_name: &str,
        subset_key: &str,
    ) -> Option<String> {
        match self.pull_in_subset(user_id, experiment_name, subset_key) {
            Ok(choice) => Some(choice),
            Err(error) => {
                warn!(
                    user = user_id,
                    experiment = experiment_name,
                    subset = subset_key,
                    %error,
                    "subset pull failed, swallowed"
                );
                None
            }
        }
    }

    /// [`reward`](Self::reward) that swallows errors.
    #[must_use]
    pub fn safe_reward(&self, user_id: &str, experiment_name: &str) -> Option<RewardOutcome> {
        match self.reward(user_id, experiment_name) {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                warn!(
                    user = user_id,
                    experiment = experiment_name,
                    %error,
                    "reward failed, swallowed"
                );
                None
            }
        }
    }
}
