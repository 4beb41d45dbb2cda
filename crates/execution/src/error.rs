//! Error taxonomy for the assignment engine.

use serde::{Deserialize, Serialize};
use staffline_core::Slot;
use staffline_storage::StoreError;

/// How a project came out of an assignment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every required slot is filled and the project is connected
    Assigned,
    /// Nothing was written; the project was not ready or could not be staffed
    Skipped,
    /// Nothing was written because the record store kept failing
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Assigned => "assigned",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.pad(s)
    }
}

/// Per-project assignment errors. None of these abort a cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignError {
    /// The project or a resource fails a precondition
    #[error("validation failed: {0}")]
    Validation(String),

    /// Someone else connected the project first
    #[error("conflict: {0}")]
    Conflict(String),

    /// No resource passes the exclusion filters for a slot
    #[error("no eligible candidate for role {0}")]
    NoCandidate(Slot),

    /// A store call failed but may succeed on retry
    #[error("transient I/O failure during {operation}: {message}")]
    TransientIo {
        /// Adapter operation
        operation: &'static str,
        /// Failure description
        message: String,
    },

    /// A store call failed for good
    #[error("I/O failure during {operation} after {attempts} attempt(s): {message}")]
    FatalIo {
        /// Adapter operation
        operation: &'static str,
        /// Attempts made
        attempts: u32,
        /// Last failure description
        message: String,
    },
}

impl AssignError {
    /// Classify a non-transient store error.
    pub fn from_store(error: StoreError, operation: &'static str, attempts: u32) -> Self {
        match error {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::NotFound(msg) | StoreError::Invalid(msg) => Self::Validation(msg),
            other => Self::FatalIo {
                operation,
                attempts,
                message: other.to_string(),
            },
        }
    }

    /// Outcome a project gets when this error stops it.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::NoCandidate(_) => Outcome::Skipped,
            Self::TransientIo { .. } | Self::FatalIo { .. } => Outcome::Failed,
        }
    }
}

/// Cycle-level errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A cycle was requested while another one is running
    #[error("an assignment cycle is already running")]
    CycleBusy,

    /// The project snapshot could not be fetched; the cycle was aborted
    #[error("snapshot fetch failed: {0}")]
    Snapshot(String),
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
