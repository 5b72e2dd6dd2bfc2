//! Experiment Record - versioned definition of a choice set

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Experiment Record represents one version of a named experiment.
///
/// Identity is the `(name, version)` pair. Records are immutable once
/// created: registering a name with a different choice list appends a new
/// version instead of rewriting this one, so assignments made against old
/// versions stay interpretable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentRecord {
    name: String,
    choices: Vec<String>,
    version: u32,
    created_at: DateTime<Utc>,
}

impl ExperimentRecord {
    /// Create a new experiment record with the current timestamp.
    ///
    /// # Arguments
    ///
    /// * `name` - Experiment name shared by all versions
    /// * `choices` - Ordered choice labels for this version
    /// * `version` - Version number within the name (first is 0)
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
        version: u32,
    ) -> Self {
        Self {
            name: name.into(),
            choices: choices.into_iter().map(Into::into).collect(),
            version,
            created_at: Utc::now(),
        }
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the ordered choice labels of this version.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Get the version number.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the `(name, version)` identity pair.
    #[must_use]
    pub fn identity(&self) -> (&str, u32) {
        (&self.name, self.version)
    }

    /// Whether `choices` matches this version's list exactly.
    ///
    /// Comparison is ordered: a reorder counts as a different choice set and
    /// triggers a new version.
    #[must_use]
    pub fn matches_choices(&self, choices: &[String]) -> bool {
        self.choices == choices
    }
}

/// Validate a choice list before it becomes an experiment version.
///
/// # Errors
///
/// Returns [`Error::NoChoices`] for an empty list and
/// [`Error::DuplicateChoice`] when a label repeats.
pub fn validate_choices(choices: &[String]) -> Result<()> {
    if choices.is_empty() {
        return Err(Error::NoChoices);
    }
    for (i, label) in choices.iter().enumerate() {
        if choices[..i].contains(label) {
            return Err(Error::DuplicateChoice(label.clone()));
        }
    }
    Ok(())
}
