//! Error types for Bandido
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bandido error types
#[derive(Error, Debug)]
pub enum Error {
    /// Allocation requested over an empty choice set (Poka-Yoke: never pick from nothing)
    #[error("No choices to allocate from\nRegister the experiment with at least one choice before pulling")]
    NoChoices,

    /// Choice list contains a repeated label
    #[error("Duplicate choice label: {0}\nChoice labels within an experiment must be unique")]
    DuplicateChoice(String),

    /// Experiment lookup failed
    #[error("Experiment not found: {0}\nCall register_experiment before pulling from it")]
    ExperimentNotFound(String),

    /// Assignment lookup failed
    #[error("No assignment for user {user_id} in experiment {experiment}")]
    AssignmentNotFound {
        /// User whose assignment was requested
        user_id: String,
        /// Experiment searched
        experiment: String,
    },

    /// Selection requested over an empty population
    #[error("Population is empty\nSeed the zoo before selecting or breeding")]
    EmptyPopulation,

    /// Mutant lookup failed
    #[error("Mutant not found: {0}")]
    MutantNotFound(u64),

    /// Property has no candidate values to draw from
    #[error("Property domain is empty: {0}\nEvery property needs at least one candidate value")]
    EmptyDomain(String),

    /// Storage engine error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
