//! # hrac-types: Core types for `hrac`
//!
//! This crate contains shared types used across the access-control engine:
//! - Entity IDs ([`UserId`], [`RoleId`], [`AssignmentId`], [`RuleId`], [`RecordId`])
//! - Requested actions ([`Action`])
//! - Entity descriptors ([`EntityType`])
//! - Organisational scopes ([`ScopeType`], [`Scope`])

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Entity IDs - All Copy (cheap 8-byte values)
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for an application user.
    UserId
);
define_id!(
    /// Unique identifier for a role.
    RoleId
);
define_id!(
    /// Unique identifier for a user-role assignment row.
    AssignmentId
);
define_id!(
    /// Unique identifier for an attribute rule.
    RuleId
);
define_id!(
    /// Primary key of a record owned by the data layer (a leave request,
    /// a department, a file...).
    RecordId
);

// ============================================================================
// Parse errors
// ============================================================================

/// Error returned when parsing one of the closed vocabularies in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown scope type: {0}")]
    UnknownScopeType(String),
}

// ============================================================================
// Action
// ============================================================================

/// The operation a caller wants to perform on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    View,
    Change,
    Add,
    Delete,
}

impl Action {
    /// All actions, in declaration order.
    pub const ALL: [Action; 4] = [Action::View, Action::Change, Action::Add, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "VIEW",
            Action::Change => "CHANGE",
            Action::Add => "ADD",
            Action::Delete => "DELETE",
        }
    }

    /// Returns whether this action mutates data.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Action::View)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    /// Parses an action name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownAction(s.to_string()))
    }
}

// ============================================================================
// Entity type
// ============================================================================

/// Describes a kind of record the data layer can hand to the engine.
///
/// The plural name drives the blanket capability lookup: a `VIEW` on
/// `department` checks `can_view_all_departments`, any mutating action checks
/// `can_manage_departments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityType {
    name: String,
    plural: String,
}

impl EntityType {
    /// Creates an entity type whose plural is `name` with an `s` appended.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let plural = format!("{name}s");
        Self { name, plural }
    }

    /// Overrides the plural name (e.g. `"leave_request"` has the default
    /// plural, but an irregular noun may not).
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Name of the capability that grants `action` on every record of this
    /// type.
    ///
    /// # Examples
    ///
    /// ```
    /// use hrac_types::{Action, EntityType};
    ///
    /// let files = EntityType::new("file");
    /// assert_eq!(files.blanket_capability_name(Action::View), "can_view_all_files");
    /// assert_eq!(files.blanket_capability_name(Action::Delete), "can_manage_files");
    /// ```
    pub fn blanket_capability_name(&self, action: Action) -> String {
        if action.is_mutating() {
            format!("can_manage_{}", self.plural)
        } else {
            format!("can_view_all_{}", self.plural)
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Organisational unit kind a role assignment can be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Department,
    Unit,
    Zone,
    State,
}

impl ScopeType {
    pub const ALL: [ScopeType; 4] = [
        ScopeType::Department,
        ScopeType::Unit,
        ScopeType::Zone,
        ScopeType::State,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeType::Department => "department",
            ScopeType::Unit => "unit",
            ScopeType::Zone => "zone",
            ScopeType::State => "state",
        }
    }
}

impl Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScopeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::UnknownScopeType(s.to_string()))
    }
}

/// A concrete organisational unit: "department 5", "zone 2".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub scope_type: ScopeType,
    pub id: u64,
}

impl Scope {
    pub fn new(scope_type: ScopeType, id: u64) -> Self {
        Self { scope_type, id }
    }

    pub fn department(id: u64) -> Self {
        Self::new(ScopeType::Department, id)
    }

    pub fn unit(id: u64) -> Self {
        Self::new(ScopeType::Unit, id)
    }

    pub fn zone(id: u64) -> Self {
        Self::new(ScopeType::Zone, id)
    }

    pub fn state(id: u64) -> Self {
        Self::new(ScopeType::State, id)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope_type, self.id)
    }
}
