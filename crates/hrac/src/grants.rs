//! Role administration and grants.
//!
//! Every write returns what must happen to the platform's groups as a plan.
//! Apply it with [`GroupSynchronizer`](crate::GroupSynchronizer) after the
//! write.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use hrac_abac::AttributeRule;
use hrac_rbac::{
    AssignmentKey, GroupPermissionPlan, MembershipAction, MembershipChange, PermissionMapping,
    Role, UserRoleAssignment,
};
use hrac_store::{AccessStore, RoleDeletion, StoreError};
use hrac_types::{AssignmentId, RoleId, RuleId, Scope, UserId};
use tracing::{debug, info};

use crate::error::{HracError, Result};

/// An assignment write and the membership change it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub assignment: UserRoleAssignment,
    pub membership: MembershipChange,
}

/// A role write and the group changes it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSave {
    /// Permission plans for the role's group and, after a group change, for
    /// the group it left.
    pub plans: Vec<GroupPermissionPlan>,
    /// Moves of the role's active holders after a group change.
    pub memberships: Vec<MembershipChange>,
}

/// A role deletion and the group changes it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRemoval {
    pub deletion: RoleDeletion,
    /// The deleted role's group, rebuilt from the roles still mapped onto it.
    pub plan: GroupPermissionPlan,
    pub memberships: Vec<MembershipChange>,
}

/// Options for a grant beyond (user, role, scope).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrantOptions {
    pub assigned_by: Option<UserId>,
    pub is_primary: bool,
    pub end_date: Option<NaiveDate>,
}

/// Writes roles, rules and user-role assignments.
pub struct GrantService {
    store: Arc<dyn AccessStore>,
    mapping: PermissionMapping,
}

impl GrantService {
    pub fn new(store: Arc<dyn AccessStore>) -> Self {
        Self {
            store,
            mapping: PermissionMapping::default(),
        }
    }

    pub fn with_mapping(mut self, mapping: PermissionMapping) -> Self {
        self.mapping = mapping;
        self
    }

    // ------------------------------------------------------------------------
    // Roles and rules
    // ------------------------------------------------------------------------

    /// Creates or updates a role.
    ///
    /// The role's group is planned from every role mapped onto it. When an
    /// update moves the role to another group, the old group is re-planned
    /// and the role's active holders move with it.
    pub fn save_role(&self, role: Role) -> Result<RoleSave> {
        let previous_group = self.store.role(role.id)?.map(|r| r.group);
        let id = role.id;
        let group = role.group.clone();
        info!(
            role = %role.name,
            group = %group,
            capabilities = role.capabilities.len(),
            high_risk = role.capabilities.has_high_risk_capability(),
            "Saving role"
        );
        self.store.put_role(role)?;

        let roles = self.store.roles()?;
        let mut plans = vec![self.mapping.plan_for_group(&group, &roles)];
        let mut memberships = Vec::new();

        if let Some(old) = previous_group.filter(|old| *old != group) {
            plans.push(self.mapping.plan_for_group(&old, &roles));

            let holders: BTreeSet<UserId> = self
                .store
                .active_holders_of(id)?
                .into_iter()
                .map(|a| a.user)
                .collect();
            for user in holders {
                memberships.push(self.membership_after_removal(user, &old)?);
                memberships.push(MembershipChange::new(user, group.as_str(), MembershipAction::Add));
            }
            info!(role = %id, from = %old, to = %group, holders = memberships.len() / 2, "Role changed group");
        }

        Ok(RoleSave { plans, memberships })
    }

    /// Deletes a role with its rules and assignments.
    ///
    /// Users who held it actively leave its group unless another active
    /// assignment still maps to the group.
    pub fn delete_role(&self, id: RoleId) -> Result<RoleRemoval> {
        let deletion = self.store.delete_role(id).map_err(|e| match e {
            StoreError::RoleNotFound(id) => HracError::RoleNotFound(id),
            other => HracError::Store(other),
        })?;

        let mut memberships = Vec::new();
        for assignment in deletion.assignments.iter().filter(|a| a.is_active) {
            memberships.push(self.membership_after_removal(assignment.user, &deletion.role.group)?);
        }
        let plan = self
            .mapping
            .plan_for_group(&deletion.role.group, &self.store.roles()?);

        info!(
            role = %deletion.role.name,
            rules = deletion.rules.len(),
            assignments = deletion.assignments.len(),
            "Deleted role"
        );
        Ok(RoleRemoval {
            deletion,
            plan,
            memberships,
        })
    }

    pub fn add_rule(&self, rule: AttributeRule) -> Result<()> {
        info!(rule = %rule.id, role = %rule.role, definition = %rule, "Adding attribute rule");
        self.store.insert_rule(rule).map_err(|e| match e {
            StoreError::RoleNotFound(id) => HracError::RoleNotFound(id),
            other => HracError::Store(other),
        })
    }

    pub fn delete_rule(&self, id: RuleId) -> Result<AttributeRule> {
        let rule = self.store.delete_rule(id).map_err(|e| match e {
            StoreError::RuleNotFound(id) => HracError::RuleNotFound(id),
            other => HracError::Store(other),
        })?;
        info!(rule = %id, role = %rule.role, "Deleted attribute rule");
        Ok(rule)
    }

    // ------------------------------------------------------------------------
    // Assignments
    // ------------------------------------------------------------------------

    /// Grants `role` to `user`, optionally scoped.
    ///
    /// Idempotent: an existing active assignment is returned unchanged, an
    /// inactive one is reactivated, and a concurrent duplicate insert is
    /// treated as already granted.
    pub fn assign(
        &self,
        user: UserId,
        role: RoleId,
        scope: Option<Scope>,
        options: GrantOptions,
    ) -> Result<Grant> {
        let role = self.store.role(role)?.ok_or(HracError::RoleNotFound(role))?;
        let key = AssignmentKey::new(user, role.id, scope);

        let assignment = match self.store.assignment_by_key(&key)? {
            Some(existing) => self.ensure_active(existing, options)?,
            None => self.insert_assignment(key, options)?,
        };

        Ok(Grant {
            assignment,
            membership: MembershipChange::new(user, role.group, MembershipAction::Add),
        })
    }

    fn insert_assignment(
        &self,
        key: AssignmentKey,
        options: GrantOptions,
    ) -> Result<UserRoleAssignment> {
        match self
            .store
            .insert_assignment(key, options.assigned_by, Utc::now())
        {
            Ok(mut assignment) => {
                if options.is_primary || options.end_date.is_some() {
                    assignment.is_primary = options.is_primary;
                    assignment.end_date = options.end_date;
                    self.store.update_assignment(&assignment)?;
                }
                info!(
                    assignment = %assignment.id,
                    user = %key.user,
                    role = %key.role,
                    scope = ?key.scope,
                    "Granted role"
                );
                Ok(assignment)
            }
            Err(e) if e.is_unique_violation() => {
                debug!(user = %key.user, role = %key.role, "Concurrent grant; using existing assignment");
                match self.store.assignment_by_key(&key)? {
                    Some(existing) => self.ensure_active(existing, options),
                    None => Err(HracError::Store(e)),
                }
            }
            Err(StoreError::RoleNotFound(id)) => Err(HracError::RoleNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns an active assignment unchanged and reactivates an inactive one
    /// with the new options.
    fn ensure_active(
        &self,
        mut assignment: UserRoleAssignment,
        options: GrantOptions,
    ) -> Result<UserRoleAssignment> {
        if assignment.is_active {
            debug!(assignment = %assignment.id, "Role already granted");
            return Ok(assignment);
        }

        assignment.is_active = true;
        assignment.assigned_by = options.assigned_by;
        assignment.assigned_at = Utc::now();
        assignment.is_primary = options.is_primary;
        assignment.end_date = options.end_date;
        self.store.update_assignment(&assignment)?;
        info!(
            assignment = %assignment.id,
            user = %assignment.user,
            role = %assignment.role,
            "Reactivated role assignment"
        );
        Ok(assignment)
    }

    /// Deactivates an assignment. The row is kept for the audit trail.
    pub fn revoke(&self, id: AssignmentId) -> Result<Grant> {
        let mut assignment = self
            .store
            .assignment(id)?
            .ok_or(HracError::AssignmentNotFound(id))?;

        if assignment.is_active {
            assignment.is_active = false;
            self.store.update_assignment(&assignment)?;
            info!(assignment = %id, user = %assignment.user, role = %assignment.role, "Revoked role");
        } else {
            debug!(assignment = %id, "Assignment already inactive");
        }

        let role = self
            .store
            .role(assignment.role)?
            .ok_or(HracError::RoleNotFound(assignment.role))?;
        let membership = self.membership_after_removal(assignment.user, &role.group)?;

        Ok(Grant {
            assignment,
            membership,
        })
    }

    /// Every assignment of the user, active or not.
    pub fn assignments_for(&self, user: UserId) -> Result<Vec<UserRoleAssignment>> {
        Ok(self.store.assignments_for(user)?)
    }

    /// Remove, unless another active assignment of `user` maps to `group`.
    fn membership_after_removal(&self, user: UserId, group: &str) -> Result<MembershipChange> {
        for other in self.store.active_assignments_for(user)? {
            if let Some(role) = self.store.role(other.role)? {
                if role.group == group {
                    return Ok(MembershipChange::new(user, group, MembershipAction::Retain));
                }
            }
        }
        Ok(MembershipChange::new(user, group, MembershipAction::Remove))
    }
}
