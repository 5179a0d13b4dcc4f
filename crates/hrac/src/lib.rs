//! # hrac
//!
//! Attribute-based access control for HR applications.
//!
//! Roles bundle blanket capabilities (`can_manage_users`,
//! `can_approve_leaves`, ...) and are granted to users, optionally scoped to
//! a department, unit, zone or state. Attribute rules attached to a role
//! narrow what it may do to individual records:
//!
//! ```text
//! LeaveRequest.employee.current_department EQUALS {user.employee_profile.current_department_id}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AccessControl                         │
//! │  ┌───────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │  GrantService │→ │  AccessStore │ ←│PermissionEvaluator│  │
//! │  │ (roles/rules) │  │ (MemoryStore)│  │ (plan → decision) │  │
//! │  └───────┬───────┘  └──────────────┘  └─────────┬─────────┘  │
//! │          ↓ plans                                 ↓ predicate │
//! │  ┌───────────────────┐                 ┌─────────────────┐   │
//! │  │ GroupSynchronizer │                 │   Collection    │   │
//! │  └───────────────────┘                 └─────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use hrac::{
//!     AccessControl, Action, AttributeRule, Capability, ConditionType, ConditionValue,
//!     DynamicRecord, EmployeeProfile, EntityType, GrantOptions, HracConfig, RecordId,
//!     RecordSet, Role, RoleId, RoleType, RuleId, UserAttributePath, UserAttributes, UserId,
//! };
//!
//! let engine = AccessControl::in_memory(&HracConfig::default()).unwrap();
//! let leave = EntityType::new("leaverequest");
//!
//! engine
//!     .save_role(
//!         Role::new(RoleId::new(1), "HR_OFFICER", RoleType::HrOfficer)
//!             .with_capability(Capability::ManageLeaves),
//!     )
//!     .unwrap();
//! engine
//!     .add_rule(AttributeRule::new(
//!         RuleId::new(1),
//!         RoleId::new(1),
//!         &leave,
//!         "employee.current_department",
//!         ConditionType::Equals,
//!         ConditionValue::user_attribute(UserAttributePath::DepartmentId),
//!         Action::Change,
//!     ))
//!     .unwrap();
//! engine
//!     .assign(UserId::new(7), RoleId::new(1), None, GrantOptions::default())
//!     .unwrap();
//!
//! let officer = UserAttributes::new(UserId::new(7), "officer").with_profile(EmployeeProfile {
//!     current_department_id: Some(5),
//!     ..EmployeeProfile::default()
//! });
//! let request = |id: u64, department: u64| {
//!     DynamicRecord::new(leave.clone(), RecordId::new(id))
//!         .with_field("employee.current_department", department)
//! };
//!
//! let evaluator = engine.evaluator();
//! assert!(evaluator.can_access(&officer, &request(1, 5), Action::Change));
//! assert!(!evaluator.can_access(&officer, &request(2, 7), Action::Change));
//!
//! let requests = RecordSet::new(leave.clone(), vec![request(1, 5), request(2, 7)]);
//! let editable = evaluator.filter_by_permission(&officer, requests, Action::Change);
//! assert_eq!(editable.len(), 1);
//! ```
//!
//! # Modules
//!
//! - **Evaluation**: [`PermissionEvaluator`], [`AccessPlan`], [`Decision`]
//! - **Collections**: [`Collection`], [`RecordSet`], [`SelectQuery`]
//! - **Administration**: [`GrantService`], [`GroupSynchronizer`]
//! - **Requests**: [`RequestContext`], [`SectionGuard`]

mod access;
mod error;
mod evaluator;
mod filter;
mod grants;
mod request;
mod sync;

pub use access::AccessControl;
pub use error::{HracError, Result};
pub use evaluator::{AccessPlan, Decision, DecisionBasis, PermissionEvaluator};
pub use filter::{Collection, RecordSet, SelectQuery};
pub use grants::{Grant, GrantOptions, GrantService, RoleRemoval, RoleSave};
pub use request::{RequestContext, SectionGuard};
pub use sync::GroupSynchronizer;

// Re-export the building blocks
pub use hrac_abac::{
    AttributeRule, ConditionType, ConditionValue, DynamicRecord, EmployeeProfile, Predicate,
    Record, UserAttributePath, UserAttributes, Value,
};
pub use hrac_config::{ConfigError, HracConfig};
pub use hrac_rbac::{
    AssignmentKey, Capability, EffectivePermissions, MembershipAction, MembershipChange,
    PermissionValue, Role, RoleType, UserRoleAssignment,
};
pub use hrac_store::{AccessStore, GroupDirectory, MemoryStore, StoreError};
pub use hrac_types::{
    Action, AssignmentId, EntityType, RecordId, RoleId, RuleId, Scope, ScopeType, UserId,
};
