//! Mapping from capabilities to external group permission codes.
//!
//! The platform authorization layer knows nothing about capabilities; it
//! understands groups holding low-level permission codes (`add_user`,
//! `view_department`, ...). Each role maps onto one group, and several roles
//! may share a group. A group's codes are rebuilt from the capabilities of
//! every role mapped onto it.
//!
//! Computing what a group should hold is pure
//! ([`PermissionMapping::plan_for_group`]).
//! Applying the plan is a separate step performed by the caller once the role
//! write has succeeded.

use std::collections::{BTreeMap, BTreeSet};

use hrac_types::UserId;
use serde::{Deserialize, Serialize};

use crate::permissions::Capability;
use crate::roles::Role;

/// Fixed mapping from capabilities to permission codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMapping {
    codes: BTreeMap<Capability, Vec<String>>,
}

impl PermissionMapping {
    /// An empty mapping.
    pub fn empty() -> Self {
        Self {
            codes: BTreeMap::new(),
        }
    }

    /// Maps `capability` to the four CRUD codes of `model`
    /// (`add_`, `change_`, `view_`, `delete_`).
    pub fn with_model_codes(self, capability: Capability, model: &str) -> Self {
        let codes = ["add", "change", "view", "delete"]
            .iter()
            .map(|verb| format!("{verb}_{model}"))
            .collect();
        self.with_codes(capability, codes)
    }

    /// Adds explicit codes for a capability (appending to existing ones).
    pub fn with_codes(mut self, capability: Capability, codes: Vec<String>) -> Self {
        let entry = self.codes.entry(capability).or_default();
        for code in codes {
            if !entry.contains(&code) {
                entry.push(code);
            }
        }
        self
    }

    /// Codes mapped from one capability.
    pub fn codes_for(&self, capability: Capability) -> &[String] {
        self.codes.get(&capability).map_or(&[], Vec::as_slice)
    }

    /// Computes the full permission set `group` must hold: the union over
    /// the roles mapped onto it. Roles of other groups are ignored.
    ///
    /// Capabilities without a mapping contribute nothing. A group no role
    /// maps onto any more gets an empty plan.
    pub fn plan_for_group<'a>(
        &self,
        group: &str,
        roles: impl IntoIterator<Item = &'a Role>,
    ) -> GroupPermissionPlan {
        let codes = roles
            .into_iter()
            .filter(|role| role.group == group)
            .flat_map(|role| role.capabilities.iter())
            .flat_map(|c| self.codes_for(c).iter().cloned())
            .collect();
        GroupPermissionPlan {
            group: group.to_string(),
            codes,
        }
    }
}

impl Default for PermissionMapping {
    /// User and department administration map onto the platform's model
    /// permissions.
    fn default() -> Self {
        Self::empty()
            .with_model_codes(Capability::ManageUsers, "user")
            .with_model_codes(Capability::ManageDepartments, "department")
    }
}

/// The permission codes a group must hold after synchronisation. The group's
/// previous codes are cleared first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermissionPlan {
    pub group: String,
    pub codes: BTreeSet<String>,
}

/// Outcome of applying a [`GroupPermissionPlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub group: String,
    /// Codes now held by the group.
    pub applied: Vec<String>,
    /// Codes the permission registry did not recognise.
    pub skipped: Vec<String>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Group membership change required after a grant or revoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipAction {
    Add,
    Remove,
    /// Another active assignment still maps to the group.
    Retain,
}

/// A planned membership change for one user and one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub user: UserId,
    pub group: String,
    pub action: MembershipAction,
}

impl MembershipChange {
    pub fn new(user: UserId, group: impl Into<String>, action: MembershipAction) -> Self {
        Self {
            user,
            group: group.into(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleType;
    use hrac_types::RoleId;

    #[test]
    fn test_default_mapping() {
        let mapping = PermissionMapping::default();
        assert_eq!(
            mapping.codes_for(Capability::ManageUsers),
            &["add_user", "change_user", "view_user", "delete_user"]
        );
        assert_eq!(mapping.codes_for(Capability::ManageDepartments).len(), 4);
        assert!(mapping.codes_for(Capability::ApproveLeaves).is_empty());
    }

    #[test]
    fn test_plan_for_role() {
        let role = Role::new(RoleId::new(1), "SYS_ADMIN", RoleType::SysAdmin)
            .with_capabilities([Capability::ManageUsers, Capability::ViewReports]);

        let plan = PermissionMapping::default().plan_for_group("SYS_ADMIN", [&role]);

        assert_eq!(plan.group, "SYS_ADMIN");
        assert_eq!(plan.codes.len(), 4);
        assert!(plan.codes.contains("delete_user"));
        assert!(!plan.codes.contains("view_department"));
    }

    #[test]
    fn test_plan_for_role_without_mapped_capabilities_is_empty() {
        let role = Role::new(RoleId::new(2), "EMPLOYEE", RoleType::Employee)
            .with_capability(Capability::CreateTasks);

        let plan = PermissionMapping::default().plan_for_group("EMPLOYEE", [&role]);
        assert!(plan.codes.is_empty());
    }

    #[test]
    fn test_plan_for_shared_group_unions_roles() {
        let hod = Role::new(RoleId::new(1), "HOD", RoleType::Hod)
            .with_capability(Capability::ManageUsers);
        let acting = Role::new(RoleId::new(2), "HOD_ACTING", RoleType::Hod)
            .with_group("HOD")
            .with_capability(Capability::ManageDepartments);
        let director = Role::new(RoleId::new(3), "DIRECTOR", RoleType::Director)
            .with_capability(Capability::ManageUsers);

        let plan = PermissionMapping::default().plan_for_group("HOD", [&hod, &acting, &director]);

        assert_eq!(plan.codes.len(), 8);
        assert!(plan.codes.contains("change_user"));
        assert!(plan.codes.contains("view_department"));

        let orphaned = PermissionMapping::default().plan_for_group("HEADS", [&hod, &acting]);
        assert_eq!(orphaned.group, "HEADS");
        assert!(orphaned.codes.is_empty());
    }

    #[test]
    fn test_extra_codes_deduplicate() {
        let mapping = PermissionMapping::default()
            .with_codes(Capability::ManageUsers, vec!["view_user".to_string()])
            .with_codes(Capability::ExportData, vec!["export_report".to_string()]);

        assert_eq!(mapping.codes_for(Capability::ManageUsers).len(), 4);
        assert_eq!(mapping.codes_for(Capability::ExportData), &["export_report"]);
    }
}
