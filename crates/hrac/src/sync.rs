//! Explicit group synchronisation.
//!
//! Role saves and grant changes return plans ([`GroupPermissionPlan`],
//! [`MembershipChange`]). The caller applies them here once its own write
//! has succeeded.

use std::collections::BTreeSet;
use std::sync::Arc;

use hrac_rbac::{GroupPermissionPlan, MembershipAction, MembershipChange, SyncReport};
use hrac_store::{GroupDirectory, StoreResult};
use tracing::{debug, info, warn};

/// Applies group plans to a [`GroupDirectory`].
pub struct GroupSynchronizer {
    groups: Arc<dyn GroupDirectory>,
}

impl GroupSynchronizer {
    pub fn new(groups: Arc<dyn GroupDirectory>) -> Self {
        Self { groups }
    }

    /// Rebuilds the group's permissions from the plan.
    ///
    /// The group's previous codes are replaced. Codes unknown to the
    /// platform are skipped and reported, never failing the sync.
    pub fn apply_plan(&self, plan: &GroupPermissionPlan) -> StoreResult<SyncReport> {
        let mut report = SyncReport {
            group: plan.group.clone(),
            ..SyncReport::default()
        };
        for code in &plan.codes {
            if self.groups.permission_exists(code)? {
                report.applied.push(code.clone());
            } else {
                warn!(group = %plan.group, code = %code, "Unknown permission code; skipped");
                report.skipped.push(code.clone());
            }
        }

        let applied: BTreeSet<String> = report.applied.iter().cloned().collect();
        self.groups.set_group_permissions(&plan.group, applied)?;

        info!(
            group = %plan.group,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Synchronised group permissions"
        );
        Ok(report)
    }

    /// Applies a membership change. Returns whether membership changed.
    pub fn apply_membership(&self, change: &MembershipChange) -> StoreResult<bool> {
        let changed = match change.action {
            MembershipAction::Add => self.groups.add_member(&change.group, change.user)?,
            MembershipAction::Remove => self.groups.remove_member(&change.group, change.user)?,
            MembershipAction::Retain => false,
        };
        debug!(
            user = %change.user,
            group = %change.group,
            action = ?change.action,
            changed,
            "Applied group membership change"
        );
        Ok(changed)
    }

    pub fn apply_memberships(&self, changes: &[MembershipChange]) -> StoreResult<usize> {
        let mut changed = 0;
        for change in changes {
            if self.apply_membership(change)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Registers permission codes with the platform.
    pub fn register_permissions<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a str>,
    ) -> StoreResult<()> {
        for code in codes {
            self.groups.register_permission(code)?;
        }
        Ok(())
    }
}
