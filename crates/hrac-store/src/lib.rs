//! # hrac-store: Access-control storage
//!
//! Two storage seams:
//! - [`AccessStore`]: roles, user-role assignments and attribute rules
//! - [`GroupDirectory`]: the platform's groups, their permission codes and
//!   members, plus the registry of permission codes that exist
//!
//! [`MemoryStore`] implements both behind a readers-writer lock and can be
//! persisted as a JSON [`Snapshot`].
//!
//! The assignment table enforces uniqueness of (user, role, scope); a
//! duplicate insert fails with [`StoreError::UniqueViolation`] so callers can
//! treat a concurrent duplicate grant as already granted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hrac_abac::AttributeRule;
use hrac_rbac::{AssignmentKey, Role, UserRoleAssignment};
use hrac_types::{Action, AssignmentId, EntityType, RoleId, RuleId, UserId};

mod error;
mod memory;
mod snapshot;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use snapshot::{GroupState, Snapshot};

/// What a role deletion removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDeletion {
    pub role: Role,
    pub rules: Vec<AttributeRule>,
    pub assignments: Vec<UserRoleAssignment>,
}

/// Storage for roles, assignments and attribute rules.
///
/// All methods are synchronous and take `&self`; implementations provide
/// their own interior locking.
pub trait AccessStore: Send + Sync {
    // ---- Roles ----

    fn role(&self, id: RoleId) -> StoreResult<Option<Role>>;

    fn role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    fn roles(&self) -> StoreResult<Vec<Role>>;

    /// Inserts or replaces a role by id.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if another role already
    /// uses the name.
    fn put_role(&self, role: Role) -> StoreResult<()>;

    /// Deletes a role together with its rules and assignments.
    fn delete_role(&self, id: RoleId) -> StoreResult<RoleDeletion>;

    // ---- Assignments ----

    /// Inserts a new active assignment.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if the key exists (active or
    /// not), and [`StoreError::RoleNotFound`] for an unknown role.
    fn insert_assignment(
        &self,
        key: AssignmentKey,
        assigned_by: Option<UserId>,
        assigned_at: DateTime<Utc>,
    ) -> StoreResult<UserRoleAssignment>;

    /// Replaces a stored assignment. The key fields are not updatable.
    fn update_assignment(&self, assignment: &UserRoleAssignment) -> StoreResult<()>;

    fn assignment(&self, id: AssignmentId) -> StoreResult<Option<UserRoleAssignment>>;

    fn assignment_by_key(&self, key: &AssignmentKey) -> StoreResult<Option<UserRoleAssignment>>;

    /// Every assignment of the user, active or not.
    fn assignments_for(&self, user: UserId) -> StoreResult<Vec<UserRoleAssignment>>;

    fn active_assignments_for(&self, user: UserId) -> StoreResult<Vec<UserRoleAssignment>> {
        let mut assignments = self.assignments_for(user)?;
        assignments.retain(|a| a.is_active);
        Ok(assignments)
    }

    /// Active assignments of one role, across all users.
    fn active_holders_of(&self, role: RoleId) -> StoreResult<Vec<UserRoleAssignment>>;

    // ---- Attribute rules ----

    /// Inserts a rule. The owning role must exist and the id must be unused.
    fn insert_rule(&self, rule: AttributeRule) -> StoreResult<()>;

    fn delete_rule(&self, id: RuleId) -> StoreResult<AttributeRule>;

    fn rules(&self) -> StoreResult<Vec<AttributeRule>>;

    /// Rules owned by any of `roles` for `action` on `entity`.
    fn rules_for(
        &self,
        roles: &BTreeSet<RoleId>,
        entity: &EntityType,
        action: Action,
    ) -> StoreResult<Vec<AttributeRule>> {
        let mut rules = self.rules()?;
        rules.retain(|r| roles.contains(&r.role) && r.applies_to(entity, action));
        Ok(rules)
    }
}

/// The platform's group and permission-code tables.
pub trait GroupDirectory: Send + Sync {
    /// Whether a permission code exists in the platform.
    fn permission_exists(&self, code: &str) -> StoreResult<bool>;

    fn register_permission(&self, code: &str) -> StoreResult<()>;

    /// Replaces the group's permission codes, creating the group if needed.
    fn set_group_permissions(&self, group: &str, codes: BTreeSet<String>) -> StoreResult<()>;

    fn group_permissions(&self, group: &str) -> StoreResult<BTreeSet<String>>;

    /// Adds a member, creating the group if needed. Returns whether the user
    /// was newly added.
    fn add_member(&self, group: &str, user: UserId) -> StoreResult<bool>;

    /// Returns whether the user was a member.
    fn remove_member(&self, group: &str, user: UserId) -> StoreResult<bool>;

    /// Groups the user belongs to.
    fn groups_of(&self, user: UserId) -> StoreResult<BTreeSet<String>>;
}
