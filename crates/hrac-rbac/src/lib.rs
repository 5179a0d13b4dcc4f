//! # hrac-rbac: Roles and capabilities
//!
//! The role-based half of the engine:
//! - **Capabilities**: a closed enumeration of blanket permissions
//!   (`can_manage_users`, `can_approve_leaves`, ...)
//! - **Roles**: named bundles of capabilities with a hierarchy level
//! - **Assignments**: user → role bindings, optionally scoped to a
//!   department, unit, zone or state
//! - **Group mapping**: capabilities → platform permission codes
//!
//! ## Examples
//!
//! ```
//! use hrac_rbac::{Capability, Role, RoleType};
//! use hrac_types::RoleId;
//!
//! let officer = Role::new(RoleId::new(1), "HR_OFFICER", RoleType::HrOfficer)
//!     .with_hierarchy_level(20)
//!     .with_capability(Capability::ManageLeaves);
//!
//! assert!(officer.has_blanket_capability("can_manage_leaves"));
//! // Unknown names resolve to false rather than failing.
//! assert!(!officer.has_blanket_capability("can_manage_spaceships"));
//! ```

pub mod assignment;
pub mod groups;
pub mod permissions;
pub mod roles;

// Re-export commonly used types
pub use assignment::{AssignmentKey, UserRoleAssignment};
pub use groups::{
    GroupPermissionPlan, MembershipAction, MembershipChange, PermissionMapping, SyncReport,
};
pub use permissions::{
    Capability, CapabilitySet, EffectivePermissions, PermissionValue, UnknownCapability,
};
pub use roles::{Role, RoleType, UnknownRoleType, has_blanket_capability};
