//! # hrac-abac: Attribute rules
//!
//! The attribute-based half of the engine. Roles own [`AttributeRule`]s that
//! grant an action on records whose field satisfies a condition. A rule's
//! comparison value is either a literal or a reference to an attribute of the
//! acting user ([`ConditionValue`]).
//!
//! Rules are resolved per user into [`Predicate`]s, which are matched against
//! single [`Record`]s or rendered as SQL for relational collections.
//!
//! ## Fail-closed resolution
//!
//! A reference to an attribute the user does not have, or that the engine
//! does not know, produces [`Predicate::Never`]:
//!
//! ```
//! use hrac_abac::{
//!     AttributeRule, ConditionType, ConditionValue, DynamicRecord, UserAttributes,
//!     rule_predicate,
//! };
//! use hrac_types::{Action, EntityType, RecordId, RoleId, RuleId, UserId};
//!
//! let tasks = EntityType::new("task");
//! let rule = AttributeRule::new(
//!     RuleId::new(1),
//!     RoleId::new(1),
//!     &tasks,
//!     "status",
//!     ConditionType::NotEquals,
//!     ConditionValue::parse("{user.nonexistent_field}"),
//!     Action::View,
//! );
//! let user = UserAttributes::new(UserId::new(1), "alice");
//! let task = DynamicRecord::new(tasks, RecordId::new(1)).with_field("status", "OPEN");
//!
//! assert!(!rule_predicate(&rule, &user).matches(&task));
//! ```

pub mod attributes;
pub mod evaluator;
pub mod policy;
pub mod predicate;
pub mod value;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use attributes::{DynamicRecord, EmployeeProfile, Record, UserAttributePath, UserAttributes};
pub use evaluator::rule_predicate;
pub use policy::{AttributeRule, ConditionType, ConditionValue, UnknownConditionType};
pub use predicate::{Operand, Predicate, SqlFragment, SqlRenderError};
pub use value::Value;
