//! User-role assignments.
//!
//! An assignment binds a user to a role, optionally narrowed to an
//! organisational [`Scope`]. Assignments are never deleted on revocation;
//! they are deactivated so the audit trail survives.

use chrono::{DateTime, NaiveDate, Utc};
use hrac_types::{AssignmentId, RoleId, Scope, UserId};
use serde::{Deserialize, Serialize};

/// The uniqueness key of an assignment: one row per (user, role, scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub user: UserId,
    pub role: RoleId,
    pub scope: Option<Scope>,
}

impl AssignmentKey {
    pub fn new(user: UserId, role: RoleId, scope: Option<Scope>) -> Self {
        Self { user, role, scope }
    }
}

/// Binding of a user to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    pub id: AssignmentId,
    pub user: UserId,
    pub role: RoleId,

    /// Organisational unit the role applies to. `None` means unscoped.
    pub scope: Option<Scope>,

    pub is_active: bool,

    /// Marks the user's main role when several are held.
    #[serde(default)]
    pub is_primary: bool,

    pub assigned_by: Option<UserId>,
    pub assigned_at: DateTime<Utc>,

    /// Planned end of a time-limited assignment (informational).
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl UserRoleAssignment {
    /// Creates an active assignment.
    pub fn new(
        id: AssignmentId,
        key: AssignmentKey,
        assigned_by: Option<UserId>,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user: key.user,
            role: key.role,
            scope: key.scope,
            is_active: true,
            is_primary: false,
            assigned_by,
            assigned_at,
            end_date: None,
        }
    }

    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::new(self.user, self.role, self.scope)
    }

    /// Key under which this assignment's scope id is reported in the
    /// effective-permission mapping, e.g. `"HOD_department_scope"`.
    ///
    /// Unscoped assignments have no scope key.
    pub fn scope_key(&self, role_name: &str) -> Option<String> {
        self.scope
            .map(|scope| format!("{role_name}_{}_scope", scope.scope_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_assignment_is_active() {
        let key = AssignmentKey::new(UserId::new(1), RoleId::new(2), None);
        let assignment = UserRoleAssignment::new(AssignmentId::new(10), key, None, at());

        assert!(assignment.is_active);
        assert!(!assignment.is_primary);
        assert_eq!(assignment.key(), key);
        assert_eq!(assignment.assigned_at, at());
    }

    #[test]
    fn test_scope_key() {
        let scoped = UserRoleAssignment::new(
            AssignmentId::new(1),
            AssignmentKey::new(UserId::new(1), RoleId::new(2), Some(Scope::department(4))),
            Some(UserId::new(99)),
            at(),
        );
        assert_eq!(
            scoped.scope_key("HOD").as_deref(),
            Some("HOD_department_scope")
        );

        let unscoped = UserRoleAssignment::new(
            AssignmentId::new(2),
            AssignmentKey::new(UserId::new(1), RoleId::new(2), None),
            None,
            at(),
        );
        assert_eq!(unscoped.scope_key("HOD"), None);
    }

    #[test]
    fn test_keys_differ_by_scope() {
        let a = AssignmentKey::new(UserId::new(1), RoleId::new(2), Some(Scope::zone(1)));
        let b = AssignmentKey::new(UserId::new(1), RoleId::new(2), Some(Scope::zone(2)));
        let c = AssignmentKey::new(UserId::new(1), RoleId::new(2), None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
