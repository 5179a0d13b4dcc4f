//! Store error types.

use hrac_types::{AssignmentId, RoleId, RuleId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in an access store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint {constraint} violated by {key}")]
    UniqueViolation {
        constraint: &'static str,
        key: String,
    },

    #[error("role not found: {0}")]
    RoleNotFound(RoleId),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    #[error("attribute rule not found: {0}")]
    RuleNotFound(RuleId),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// I/O error while reading or writing a snapshot.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}
