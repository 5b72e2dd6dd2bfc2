//! Assignment Store Abstraction
//!
//! The repository seam between the allocation engine and durable storage.
//! Sessions talk to an [`ExperimentStore`]; engines implement it. The crate
//! ships [`MemoryStore`], a lock-free in-process engine that doubles as the
//! test fake. A SQL-backed engine lives behind the same trait without the
//! session layer noticing.
//!
//! Two contracts matter more than the method list:
//!
//! - **Uniqueness**: at most one assignment per `(user_id, experiment_name)`.
//!   [`insert_assignment`](ExperimentStore::insert_assignment) is the
//!   serialization point; racing writers all receive the single winning row.
//! - **Query-time aggregation**: pull/reward counters are recomputed from
//!   the assignment log on demand, never stored as running totals.
//!
//! # Example
//!
//! ```
//! use bandido::store::{ExperimentStore, MemoryStore};
//! use bandido::AssignmentRecord;
//!
//! # fn main() -> bandido::Result<()> {
//! let store = MemoryStore::new();
//! let choices = vec!["red".to_string(), "blue".to_string()];
//! store.get_or_create_experiment("checkout-button", &choices)?;
//!
//! let stored = store.insert_assignment(AssignmentRecord::new(
//!     "user-1",
//!     "checkout-button",
//!     "red",
//! ))?;
//! assert_eq!(stored.choice_key(), "red");
//!
//! let stats = store.choice_stats("checkout-button", &choices, None)?;
//! assert_eq!(stats["red"].pulls(), 1);
//! assert_eq!(stats["blue"].pulls(), 0);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryStore;

use crate::allocator::ChoiceStats;
use crate::record::{AssignmentRecord, ExperimentRecord};
use crate::Result;
use std::collections::BTreeMap;

/// Repository interface for experiments and assignments.
///
/// All calls are synchronous and may block briefly on internal locks.
/// Implementations must be safe to share across threads behind an `Arc`.
pub trait ExperimentStore: Send + Sync {
    /// Fetch the current version of a named experiment, creating it on
    /// first sight.
    ///
    /// - Unknown name: stores version 0 with the given choices.
    /// - Known name, identical ordered choice list: returns the current
    ///   version unchanged.
    /// - Known name, different list: appends a new version. Prior versions
    ///   and their assignments are retained untouched.
    ///
    /// # Errors
    ///
    /// Rejects an empty choice list with [`crate::Error::NoChoices`] and a
    /// repeated label with [`crate::Error::DuplicateChoice`].
    fn get_or_create_experiment(
        &self,
        name: &str,
        choices: &[String],
    ) -> Result<ExperimentRecord>;

    /// Get the current (latest) version of an experiment, if the name is
    /// known.
    fn current_experiment(&self, name: &str) -> Result<Option<ExperimentRecord>>;

    /// Get every version of an experiment in creation order.
    ///
    /// Returns an empty vector for an unknown name.
    fn experiment_history(&self, name: &str) -> Result<Vec<ExperimentRecord>>;

    /// Get a user's assignment within an experiment, if one exists.
    fn get_assignment(
        &self,
        user_id: &str,
        experiment_name: &str,
    ) -> Result<Option<AssignmentRecord>>;

    /// Insert an assignment, enforcing one per `(user_id, experiment_name)`.
    ///
    /// Returns the stored row. When a concurrent writer got there first the
    /// incoming record is discarded and the winner's row comes back, so every
    /// racing caller observes the same choice. Conflicts are resolved here
    /// and never surface as errors.
    fn insert_assignment(&self, record: AssignmentRecord) -> Result<AssignmentRecord>;

    /// Set the reward flag on an existing assignment.
    ///
    /// Returns `true` if the flag flipped, `false` if it was already set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AssignmentNotFound`] when the user has no
    /// assignment in the experiment.
    fn set_rewarded(&self, user_id: &str, experiment_name: &str) -> Result<bool>;

    /// Aggregate pull/reward counters per choice from the assignment log.
    ///
    /// Every requested choice appears in the result, zero-filled when no
    /// assignments reference it. Assignments whose choice is not in
    /// `choices` are skipped: they point at a retired version's labels.
    /// `subset_key` restricts the scan to assignments tagged with that
    /// segment; `None` aggregates across all segments.
    fn choice_stats(
        &self,
        experiment_name: &str,
        choices: &[String],
        subset_key: Option<&str>,
    ) -> Result<BTreeMap<String, ChoiceStats>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn choices(labels: &[&str]) -> Vec<String> {
        labels.iter().map(ToString::to_string).collect()
    }

    // ============================================================
    // Experiment lifecycle contract
    // ============================================================

    #[test]
    fn test_create_then_get_is_idempotent() {
        let store = MemoryStore::new();
        let cs = choices(&["a", "b"]);

        let first = store.get_or_create_experiment("exp", &cs).unwrap();
        let second = store.get_or_create_experiment("exp", &cs).unwrap();

        assert_eq!(first.version(), 0);
        assert_eq!(first, second);
        assert_eq!(store.experiment_history("exp").unwrap().len(), 1);
    }

    #[test]
    fn test_changed_choices_create_new_version() {
        let store = MemoryStore::new();

        let v0 = store
            .get_or_create_experiment("exp", &choices(&["a", "b"]))
            .unwrap();
        let v1 = store
            .get_or_create_experiment("exp", &choices(&["a", "b", "c"]))
            .unwrap();

        assert_eq!(v0.version(), 0);
        assert_eq!(v1.version(), 1);

        let history = store.experiment_history("exp").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], v0);
        assert_eq!(history[1], v1);

        let current = store.current_experiment("exp").unwrap().unwrap();
        assert_eq!(current, v1);
    }

    #[test]
    fn test_reordered_choices_count_as_changed() {
        let store = MemoryStore::new();
        store
            .get_or_create_experiment("exp", &choices(&["a", "b"]))
            .unwrap();
        let v1 = store
            .get_or_create_experiment("exp", &choices(&["b", "a"]))
            .unwrap();
        assert_eq!(v1.version(), 1);
    }

    #[test]
    fn test_empty_choices_rejected() {
        let store = MemoryStore::new();
        let result = store.get_or_create_experiment("exp", &[]);
        assert!(matches!(result, Err(Error::NoChoices)));
        assert!(store.current_experiment("exp").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_choices_rejected() {
        let store = MemoryStore::new();
        let result = store.get_or_create_experiment("exp", &choices(&["a", "a"]));
        assert!(matches!(result, Err(Error::DuplicateChoice(_))));
    }

    #[test]
    fn test_unknown_experiment_lookups() {
        let store = MemoryStore::new();
        assert!(store.current_experiment("ghost").unwrap().is_none());
        assert!(store.experiment_history("ghost").unwrap().is_empty());
    }

    // ============================================================
    // Assignment uniqueness contract
    // ============================================================

    #[test]
    fn test_first_insert_wins() {
        let store = MemoryStore::new();

        let first = store
            .insert_assignment(AssignmentRecord::new("u", "exp", "a"))
            .unwrap();
        let second = store
            .insert_assignment(AssignmentRecord::new("u", "exp", "b"))
            .unwrap();

        assert_eq!(first.choice_key(), "a");
        assert_eq!(second.choice_key(), "a");
        assert_eq!(store.assignment_count(), 1);
    }

    #[test]
    fn test_assignments_isolated_per_experiment_and_user() {
        let store = MemoryStore::new();
        store
            .insert_assignment(AssignmentRecord::new("u1", "exp1", "a"))
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u1", "exp2", "b"))
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u2", "exp1", "c"))
            .unwrap();

        assert_eq!(store.assignment_count(), 3);
        let row = store.get_assignment("u1", "exp2").unwrap().unwrap();
        assert_eq!(row.choice_key(), "b");
    }

    // ============================================================
    // Reward flag contract
    // ============================================================

    #[test]
    fn test_set_rewarded_flips_once() {
        let store = MemoryStore::new();
        store
            .insert_assignment(AssignmentRecord::new("u", "exp", "a"))
            .unwrap();

        assert!(store.set_rewarded("u", "exp").unwrap());
        assert!(!store.set_rewarded("u", "exp").unwrap());

        let row = store.get_assignment("u", "exp").unwrap().unwrap();
        assert!(row.rewarded());
    }

    #[test]
    fn test_set_rewarded_without_assignment_errors() {
        let store = MemoryStore::new();
        let result = store.set_rewarded("ghost", "exp");
        assert!(matches!(result, Err(Error::AssignmentNotFound { .. })));
    }

    // ============================================================
    // Aggregation contract
    // ============================================================

    #[test]
    fn test_choice_stats_zero_filled() {
        let store = MemoryStore::new();
        let cs = choices(&["a", "b"]);
        let stats = store.choice_stats("exp", &cs, None).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["a"], ChoiceStats::default());
        assert_eq!(stats["b"], ChoiceStats::default());
    }

    #[test]
    fn test_choice_stats_counts_pulls_and_rewards() {
        let store = MemoryStore::new();
        let cs = choices(&["a", "b"]);

        store
            .insert_assignment(AssignmentRecord::new("u1", "exp", "a"))
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u2", "exp", "a"))
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u3", "exp", "b"))
            .unwrap();
        store.set_rewarded("u1", "exp").unwrap();

        let stats = store.choice_stats("exp", &cs, None).unwrap();
        assert_eq!(stats["a"].pulls(), 2);
        assert_eq!(stats["a"].rewards(), 1);
        assert_eq!(stats["b"].pulls(), 1);
        assert_eq!(stats["b"].rewards(), 0);
    }

    #[test]
    fn test_choice_stats_ignores_other_experiments() {
        let store = MemoryStore::new();
        store
            .insert_assignment(AssignmentRecord::new("u", "other", "a"))
            .unwrap();

        let stats = store.choice_stats("exp", &choices(&["a"]), None).unwrap();
        assert_eq!(stats["a"].pulls(), 0);
    }

    #[test]
    fn test_choice_stats_skips_retired_choices() {
        let store = MemoryStore::new();
        // Assignment stored against a label the current version dropped.
        store
            .insert_assignment(AssignmentRecord::new("u", "exp", "retired"))
            .unwrap();

        let stats = store.choice_stats("exp", &choices(&["a", "b"]), None).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["a"].pulls(), 0);
        assert_eq!(stats["b"].pulls(), 0);
    }

    #[test]
    fn test_choice_stats_subset_filter() {
        let store = MemoryStore::new();
        let cs = choices(&["a"]);

        store
            .insert_assignment(
                AssignmentRecord::builder("u1", "exp", "a")
                    .subset_key("mobile")
                    .build(),
            )
            .unwrap();
        store
            .insert_assignment(
                AssignmentRecord::builder("u2", "exp", "a")
                    .subset_key("web")
                    .build(),
            )
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u3", "exp", "a"))
            .unwrap();

        let all = store.choice_stats("exp", &cs, None).unwrap();
        assert_eq!(all["a"].pulls(), 3);

        let mobile = store.choice_stats("exp", &cs, Some("mobile")).unwrap();
        assert_eq!(mobile["a"].pulls(), 1);

        let desktop = store.choice_stats("exp", &cs, Some("desktop")).unwrap();
        assert_eq!(desktop["a"].pulls(), 0);
    }
}
