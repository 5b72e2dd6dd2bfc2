//! Durable record types for experiment allocation
//!
//! Two entities back the allocation engine:
//!
//! ```text
//! ExperimentRecord (identity: name + version)
//!     └── AssignmentRecord (at most one per user per experiment name)
//!             ├── choice_key   the choice the user was served
//!             ├── subset_key   optional traffic segment
//!             └── rewarded     monotone success flag
//! ```
//!
//! Assignments form an append-only event log. Pull/reward counters are never
//! stored; stores aggregate them from this log at query time, so the log is
//! the single source of truth.
//!
//! Changing an experiment's choice list never mutates an existing record:
//! the store appends a new `ExperimentRecord` version and historical
//! assignments keep pointing at choices that may no longer be live.

mod assignment;
mod experiment;

pub use assignment::{AssignmentRecord, AssignmentRecordBuilder};
pub use experiment::{validate_choices, ExperimentRecord};
