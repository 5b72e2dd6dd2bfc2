//! Assignment Record - one user's sticky choice within an experiment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Assignment Record binds a user to the choice they were served.
///
/// At most one exists per `(user_id, experiment_name)`; stores enforce that
/// uniqueness. The `rewarded` flag is monotone: it flips false to true at
/// most once, giving every user at most one conversion regardless of how
/// many times the reward is reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentRecord {
    user_id: String,
    experiment_name: String,
    choice_key: String,
    subset_key: Option<String>,
    rewarded: bool,
    created_at: DateTime<Utc>,
}

impl AssignmentRecord {
    /// Create a new unrewarded assignment with the current timestamp.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Stable caller-supplied user identifier
    /// * `experiment_name` - Experiment the user was allocated into
    /// * `choice_key` - Choice label the user was served
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        experiment_name: impl Into<String>,
        choice_key: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            experiment_name: experiment_name.into(),
            choice_key: choice_key.into(),
            subset_key: None,
            rewarded: false,
            created_at: Utc::now(),
        }
    }

    /// Create a builder for constructing an assignment with optional fields.
    #[must_use]
    pub fn builder(
        user_id: impl Into<String>,
        experiment_name: impl Into<String>,
        choice_key: impl Into<String>,
    ) -> AssignmentRecordBuilder {
        AssignmentRecordBuilder::new(user_id, experiment_name, choice_key)
    }

    /// Get the user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Get the choice the user was served.
    #[must_use]
    pub fn choice_key(&self) -> &str {
        &self.choice_key
    }

    /// Get the traffic segment this assignment belongs to, if any.
    #[must_use]
    pub fn subset_key(&self) -> Option<&str> {
        self.subset_key.as_deref()
    }

    /// Whether the reward flag has been set.
    #[must_use]
    pub const fn rewarded(&self) -> bool {
        self.rewarded
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Flip the reward flag, returning whether it changed.
    ///
    /// Repeated calls return `false` and leave the flag set, so double
    /// reporting never double counts.
    pub fn mark_rewarded(&mut self) -> bool {
        if self.rewarded {
            false
        } else {
            self.rewarded = true;
            true
        }
    }
}

/// Builder for `AssignmentRecord`.
#[derive(Debug)]
pub struct AssignmentRecordBuilder {
    user_id: String,
    experiment_name: String,
    choice_key: String,
    subset_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl AssignmentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        experiment_name: impl Into<String>,
        choice_key: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            experiment_name: experiment_name.into(),
            choice_key: choice_key.into(),
            subset_key: None,
            created_at: Utc::now(),
        }
    }

    /// Set the traffic segment key.
    #[must_use]
    pub fn subset_key(mut self, subset_key: impl Into<String>) -> Self {
        self.subset_key = Some(subset_key.into());
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `AssignmentRecord`, unrewarded.
    #[must_use]
    pub fn build(self) -> AssignmentRecord {
        AssignmentRecord {
            user_id: self.user_id,
            experiment_name: self.experiment_name,
            choice_key: self.choice_key,
            subset_key: self.subset_key,
            rewarded: false,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_record_new() {
        let record = AssignmentRecord::new("user-1", "checkout-button", "red");
        assert_eq!(record.user_id(), "user-1");
        assert_eq!(record.experiment_name(), "checkout-button");
        assert_eq!(record.choice_key(), "red");
        assert_eq!(record.subset_key(), None);
        assert!(!record.rewarded());
    }

    #[test]
    fn test_assignment_record_builder_with_subset() {
        let record = AssignmentRecord::builder("user-1", "exp", "a")
            .subset_key("mobile")
            .build();
        assert_eq!(record.subset_key(), Some("mobile"));
        assert!(!record.rewarded());
    }

    #[test]
    fn test_mark_rewarded_is_monotone() {
        let mut record = AssignmentRecord::new("user-1", "exp", "a");
        assert!(record.mark_rewarded());
        assert!(record.rewarded());
        assert!(!record.mark_rewarded());
        assert!(record.rewarded());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut record = AssignmentRecord::builder("u", "e", "c")
            .subset_key("web")
            .build();
        record.mark_rewarded();
        let json = serde_json::to_string(&record).unwrap();
        let back: AssignmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
