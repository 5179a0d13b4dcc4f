//! Error types for the hrac facade.

use hrac_config::ConfigError;
use hrac_store::StoreError;
use hrac_types::{AssignmentId, RoleId, RuleId};
use thiserror::Error;

/// Result type for hrac operations.
pub type Result<T> = std::result::Result<T, HracError>;

/// Errors from administrative operations.
///
/// Access checks never return these: a denied or unevaluable check is a
/// `false` / empty result.
#[derive(Debug, Error)]
pub enum HracError {
    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("role {0} does not exist")]
    RoleNotFound(RoleId),

    #[error("assignment {0} does not exist")]
    AssignmentNotFound(AssignmentId),

    #[error("attribute rule {0} does not exist")]
    RuleNotFound(RuleId),
}
