//! Main entry point for the hrac engine.
//!
//! `AccessControl` wires a [`MemoryStore`] to the evaluator, the grant
//! service and the group synchroniser from one [`HracConfig`], and applies
//! group side effects right after each successful write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hrac_abac::{AttributeRule, UserAttributes};
use hrac_config::HracConfig;
use hrac_rbac::{Role, SyncReport};
use hrac_store::MemoryStore;
use hrac_types::{AssignmentId, RoleId, RuleId, Scope, UserId};
use tracing::info;

use crate::error::Result;
use crate::evaluator::PermissionEvaluator;
use crate::grants::{Grant, GrantOptions, GrantService, RoleRemoval};
use crate::request::{RequestContext, SectionGuard};
use crate::sync::GroupSynchronizer;

/// The assembled engine.
pub struct AccessControl {
    store: Arc<MemoryStore>,
    snapshot_path: Option<PathBuf>,
    evaluator: PermissionEvaluator,
    grants: GrantService,
    groups: GroupSynchronizer,
    sections: SectionGuard,
}

impl AccessControl {
    /// Opens the engine on the configured snapshot, starting empty if the
    /// snapshot does not exist yet.
    pub fn open(config: &HracConfig) -> Result<Self> {
        let path = config.store.snapshot.clone();
        let store = if path.exists() {
            MemoryStore::load(&path)?
        } else {
            MemoryStore::new()
        };
        info!(snapshot = %path.display(), "Opened access-control store");
        Self::build(config, store, Some(path))
    }

    /// An engine over an empty store that is never persisted.
    pub fn in_memory(config: &HracConfig) -> Result<Self> {
        Self::build(config, MemoryStore::new(), None)
    }

    fn build(config: &HracConfig, store: MemoryStore, snapshot_path: Option<PathBuf>) -> Result<Self> {
        let store = Arc::new(store);
        let mapping = config.group_sync.permission_mapping()?;
        let sections = SectionGuard::from_config(&config.sections)?;

        let groups = GroupSynchronizer::new(store.clone());
        groups.register_permissions(config.group_sync.permissions.iter().map(String::as_str))?;

        Ok(Self {
            evaluator: PermissionEvaluator::with_config(store.clone(), &config.evaluation),
            grants: GrantService::new(store.clone()).with_mapping(mapping),
            store,
            snapshot_path,
            groups,
            sections,
        })
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    pub fn grants(&self) -> &GrantService {
        &self.grants
    }

    pub fn sections(&self) -> &SectionGuard {
        &self.sections
    }

    pub fn request_context(&self, user: UserAttributes) -> RequestContext {
        RequestContext::build(&self.evaluator, user)
    }

    /// Saves a role and rebuilds the permissions of every group it touches.
    /// Returns one report per group.
    pub fn save_role(&self, role: Role) -> Result<Vec<SyncReport>> {
        let saved = self.grants.save_role(role)?;
        self.groups.apply_memberships(&saved.memberships)?;
        saved
            .plans
            .iter()
            .map(|plan| Ok(self.groups.apply_plan(plan)?))
            .collect()
    }

    /// Deletes a role, rebuilds its group's permissions from the remaining
    /// roles and updates the memberships of its holders.
    pub fn delete_role(&self, id: RoleId) -> Result<RoleRemoval> {
        let removal = self.grants.delete_role(id)?;
        self.groups.apply_memberships(&removal.memberships)?;
        self.groups.apply_plan(&removal.plan)?;
        Ok(removal)
    }

    pub fn add_rule(&self, rule: AttributeRule) -> Result<()> {
        self.grants.add_rule(rule)
    }

    pub fn delete_rule(&self, id: RuleId) -> Result<AttributeRule> {
        self.grants.delete_rule(id)
    }

    /// Grants a role and adds the user to its group.
    pub fn assign(
        &self,
        user: UserId,
        role: RoleId,
        scope: Option<Scope>,
        options: GrantOptions,
    ) -> Result<Grant> {
        let grant = self.grants.assign(user, role, scope, options)?;
        self.groups.apply_membership(&grant.membership)?;
        Ok(grant)
    }

    /// Revokes an assignment and updates the user's group membership.
    pub fn revoke(&self, id: AssignmentId) -> Result<Grant> {
        let grant = self.grants.revoke(id)?;
        self.groups.apply_membership(&grant.membership)?;
        Ok(grant)
    }

    /// Writes the store back to its snapshot. In-memory engines do nothing.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.snapshot_path {
            self.store.save(path)?;
            info!(snapshot = %path.display(), "Saved access-control store");
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrac_rbac::{Capability, MembershipAction, RoleType};
    use hrac_store::GroupDirectory;

    fn config(dir: &Path) -> HracConfig {
        let mut config = HracConfig::default();
        config.store.snapshot = dir.join("store.json");
        config.group_sync.permissions = ["add_user", "change_user", "view_user", "delete_user"]
            .map(String::from)
            .to_vec();
        config
    }

    #[test]
    fn grant_and_revoke_keep_groups_in_step() {
        let engine = AccessControl::in_memory(&HracConfig::default()).unwrap();
        engine
            .save_role(Role::new(RoleId::new(1), "HOD", RoleType::Hod))
            .unwrap();
        let user = UserId::new(8);

        let grant = engine.assign(user, RoleId::new(1), None, GrantOptions::default()).unwrap();
        assert!(engine.store().groups_of(user).unwrap().contains("HOD"));

        let revoked = engine.revoke(grant.assignment.id).unwrap();
        assert_eq!(revoked.membership.action, MembershipAction::Remove);
        assert!(engine.store().groups_of(user).unwrap().is_empty());
    }

    #[test]
    fn save_role_syncs_registered_codes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = AccessControl::open(&config(dir.path())).unwrap();

        let reports = engine
            .save_role(
                Role::new(RoleId::new(1), "SYS_ADMIN", RoleType::SysAdmin)
                    .with_capabilities([Capability::ManageUsers, Capability::ManageDepartments]),
            )
            .unwrap();

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.applied.len(), 4);
        assert_eq!(report.skipped.len(), 4);
        assert!(
            engine
                .store()
                .group_permissions("SYS_ADMIN")
                .unwrap()
                .contains("change_user")
        );
    }

    #[test]
    fn second_role_on_a_group_keeps_the_first_roles_codes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = AccessControl::open(&config(dir.path())).unwrap();
        engine
            .save_role(
                Role::new(RoleId::new(1), "HOD", RoleType::Hod)
                    .with_capability(Capability::ManageUsers),
            )
            .unwrap();
        engine
            .save_role(Role::new(RoleId::new(2), "HOD_ACTING", RoleType::Hod).with_group("HOD"))
            .unwrap();

        let codes = engine.store().group_permissions("HOD").unwrap();
        assert!(codes.contains("change_user"));
        assert_eq!(codes.len(), 4);

        engine.delete_role(RoleId::new(1)).unwrap();
        assert!(engine.store().group_permissions("HOD").unwrap().is_empty());
    }

    #[test]
    fn group_change_then_revoke_leaves_no_membership() {
        let dir = tempfile::tempdir().unwrap();
        let engine = AccessControl::open(&config(dir.path())).unwrap();
        engine
            .save_role(
                Role::new(RoleId::new(1), "HOD", RoleType::Hod)
                    .with_capability(Capability::ManageUsers),
            )
            .unwrap();
        let user = UserId::new(3);
        let grant = engine.assign(user, RoleId::new(1), None, GrantOptions::default()).unwrap();

        let reports = engine
            .save_role(
                Role::new(RoleId::new(1), "HOD", RoleType::Hod)
                    .with_group("HEADS")
                    .with_capability(Capability::ManageUsers),
            )
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(engine.store().groups_of(user).unwrap().into_iter().collect::<Vec<_>>(), vec!["HEADS"]);
        assert!(engine.store().group_permissions("HOD").unwrap().is_empty());
        assert!(engine.store().group_permissions("HEADS").unwrap().contains("view_user"));

        engine.revoke(grant.assignment.id).unwrap();
        assert!(engine.store().groups_of(user).unwrap().is_empty());
    }

    #[test]
    fn open_after_save_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        {
            let engine = AccessControl::open(&config).unwrap();
            engine
                .save_role(Role::new(RoleId::new(1), "HOD", RoleType::Hod))
                .unwrap();
            engine
                .assign(UserId::new(2), RoleId::new(1), None, GrantOptions::default())
                .unwrap();
            engine.save().unwrap();
        }

        let reopened = AccessControl::open(&config).unwrap();
        assert_eq!(reopened.snapshot_path(), Some(config.store.snapshot.as_path()));
        let roles = reopened.evaluator().active_roles_for(UserId::new(2)).unwrap();
        assert_eq!(roles.len(), 1);
        assert!(reopened.store().groups_of(UserId::new(2)).unwrap().contains("HOD"));
    }
}
