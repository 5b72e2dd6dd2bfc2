//! In-memory assignment store implementation using `DashMap`.
//!
//! This is the default engine - data is lost on process restart. Durable
//! engines (SQL, KV) implement the same [`ExperimentStore`] trait.

use super::ExperimentStore;
use crate::allocator::ChoiceStats;
use crate::error::Error;
use crate::record::{validate_choices, AssignmentRecord, ExperimentRecord};
use crate::Result;
use dashmap::DashMap;
use std::collections::BTreeMap;

/// Key for the assignment table: one row per user per experiment name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AssignmentKey {
    experiment: String,
    user: String,
}

impl AssignmentKey {
    fn new(experiment: &str, user: &str) -> Self {
        Self {
            experiment: experiment.to_string(),
            user: user.to_string(),
        }
    }
}

/// In-memory experiment store using lock-free concurrent hashmaps.
///
/// Thread-safe and optimized for high-concurrency assignment workloads.
/// The uniqueness constraint rides on `DashMap`'s sharded entry API: the
/// first writer to claim a `(user, experiment)` slot wins and every later
/// writer reads the winning row back.
///
/// # Example
///
/// ```
/// use bandido::store::{ExperimentStore, MemoryStore};
///
/// # fn main() -> bandido::Result<()> {
/// let store = MemoryStore::new();
/// let choices = vec!["a".to_string(), "b".to_string()];
/// let experiment = store.get_or_create_experiment("exp", &choices)?;
/// assert_eq!(experiment.version(), 0);
/// # Ok(())
/// # }
/// ```
pub struct MemoryStore {
    /// Versions per experiment name, in creation order.
    experiments: DashMap<String, Vec<ExperimentRecord>>,
    /// Append-only assignment log (rows mutate only via the reward flag).
    assignments: DashMap<AssignmentKey, AssignmentRecord>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            experiments: DashMap::new(),
            assignments: DashMap::new(),
        }
    }

    /// Create with pre-allocated assignment capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            experiments: DashMap::new(),
            assignments: DashMap::with_capacity(capacity),
        }
    }

    /// Number of experiment names registered.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Number of assignments stored.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Check whether the store holds no experiments and no assignments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.assignments.is_empty()
    }

    /// Clear all experiments and assignments.
    pub fn clear(&self) {
        self.experiments.clear();
        self.assignments.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStore for MemoryStore {
    #[allow(clippy::cast_possible_truncation)]
    fn get_or_create_experiment(
        &self,
        name: &str,
        choices: &[String],
    ) -> Result<ExperimentRecord> {
        validate_choices(choices)?;

        // The entry guard serializes writers on this name, so two racing
        // registrations cannot mint the same version number.
        let mut versions = self.experiments.entry(name.to_string()).or_default();
        if let Some(current) = versions.last() {
            if current.matches_choices(choices) {
                return Ok(current.clone());
            }
        }
        let record = ExperimentRecord::new(name, choices.iter().cloned(), versions.len() as u32);
        versions.push(record.clone());
        Ok(record)
    }

    fn current_experiment(&self, name: &str) -> Result<Option<ExperimentRecord>> {
        Ok(self
            .experiments
            .get(name)
            .and_then(|versions| versions.value().last().cloned()))
    }

    fn experiment_history(&self, name: &str) -> Result<Vec<ExperimentRecord>> {
        Ok(self
            .experiments
            .get(name)
            .map(|versions| versions.value().clone())
            .unwrap_or_default())
    }

    fn get_assignment(
        &self,
        user_id: &str,
        experiment_name: &str,
    ) -> Result<Option<AssignmentRecord>> {
        let key = AssignmentKey::new(experiment_name, user_id);
        Ok(self.assignments.get(&key).map(|row| row.value().clone()))
    }

    fn insert_assignment(&self, record: AssignmentRecord) -> Result<AssignmentRecord> {
        let key = AssignmentKey::new(record.experiment_name(), record.user_id());
        // First writer claims the slot; losers read the winner's row back.
        let row = self.assignments.entry(key).or_insert(record);
        Ok(row.value().clone())
    }

    fn set_rewarded(&self, user_id: &str, experiment_name: &str) -> Result<bool> {
        let key = AssignmentKey::new(experiment_name, user_id);
        match self.assignments.get_mut(&key) {
            Some(mut row) => Ok(row.value_mut().mark_rewarded()),
            None => Err(Error::AssignmentNotFound {
                user_id: user_id.to_string(),
                experiment: experiment_name.to_string(),
            }),
        }
    }

    fn choice_stats(
        &self,
        experiment_name: &str,
        choices: &[String],
        subset_key: Option<&str>,
    ) -> Result<BTreeMap<String, ChoiceStats>> {
        let mut stats: BTreeMap<String, ChoiceStats> = choices
            .iter()
            .map(|label| (label.clone(), ChoiceStats::default()))
            .collect();

        for entry in self.assignments.iter() {
            let record = entry.value();
            if record.experiment_name() != experiment_name {
                continue;
            }
            if let Some(subset) = subset_key {
                if record.subset_key() != Some(subset) {
                    continue;
                }
            }
            // Labels outside the requested set belong to retired versions.
            if let Some(counters) = stats.get_mut(record.choice_key()) {
                counters.record_pull();
                if record.rewarded() {
                    counters.record_reward();
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.experiment_count(), 0);
        assert_eq!(store.assignment_count(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let store = MemoryStore::with_capacity(100);
        store
            .insert_assignment(AssignmentRecord::new("u", "exp", "a"))
            .unwrap();
        assert_eq!(store.assignment_count(), 1);
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store
            .get_or_create_experiment("exp", &["a".to_string()])
            .unwrap();
        store
            .insert_assignment(AssignmentRecord::new("u", "exp", "a"))
            .unwrap();
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_default() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_distinct_users() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        // 100 concurrent writers, one user each
        for i in 0..100 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let user = format!("user-{i}");
                store
                    .insert_assignment(AssignmentRecord::new(user, "exp", "a"))
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.assignment_count(), 100);
    }

    #[test]
    fn test_concurrent_same_user_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        // 32 writers race one (user, experiment) slot with distinct choices.
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let record = AssignmentRecord::new("user", "exp", format!("choice-{i}"));
                store.insert_assignment(record).unwrap().choice_key().to_string()
            }));
        }

        let observed: Vec<String> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(store.assignment_count(), 1);
        let winner = store.get_assignment("user", "exp").unwrap().unwrap();
        for choice in observed {
            assert_eq!(choice, winner.choice_key());
        }
    }

    #[test]
    fn test_concurrent_versioning_stays_sequential() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = vec![];

        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let choices = vec![format!("choice-{i}")];
                store.get_or_create_experiment("exp", &choices).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.experiment_history("exp").unwrap();
        // Every version number minted exactly once, in order.
        for (i, record) in history.iter().enumerate() {
            assert_eq!(record.version() as usize, i);
        }
    }
}
