//! Grant and revoke commands.

use anyhow::{Context, Result};
use hrac::{AssignmentId, GrantOptions, MembershipAction, RoleId, Scope, ScopeType, UserId};

use super::StoreLocation;
use crate::style::{self, SemanticStyle};

/// Arguments of `grant`.
pub struct GrantSpec {
    pub user: u64,
    pub role: u64,
    pub scope_type: Option<String>,
    pub scope_id: Option<u64>,
    pub by: Option<u64>,
    pub primary: bool,
}

impl GrantSpec {
    fn scope(&self) -> Result<Option<Scope>> {
        match (&self.scope_type, self.scope_id) {
            (Some(scope_type), Some(id)) => {
                let scope_type: ScopeType = scope_type.parse()?;
                Ok(Some(Scope::new(scope_type, id)))
            }
            _ => Ok(None),
        }
    }
}

pub fn grant(store: &StoreLocation, spec: &GrantSpec) -> Result<()> {
    let scope = spec.scope()?;
    let options = GrantOptions {
        assigned_by: spec.by.map(UserId::new),
        is_primary: spec.primary,
        end_date: None,
    };

    let engine = store.open()?;
    let grant = engine
        .assign(UserId::new(spec.user), RoleId::new(spec.role), scope, options)
        .with_context(|| format!("Failed to grant role {} to user {}", spec.role, spec.user))?;
    engine.save()?;

    style::print_success(&format!(
        "Granted role {} to user {}",
        spec.role, spec.user
    ));
    style::print_labeled("assignment", &grant.assignment.id.to_string());
    if let Some(scope) = grant.assignment.scope {
        style::print_labeled("scope", &scope.to_string());
    }
    style::print_labeled("group", &grant.membership.group.code());
    Ok(())
}

pub fn revoke(store: &StoreLocation, assignment: u64) -> Result<()> {
    let engine = store.open()?;
    let revoked = engine.revoke(AssignmentId::new(assignment))?;
    engine.save()?;

    style::print_success(&format!(
        "Revoked assignment {} (user {}, role {})",
        assignment, revoked.assignment.user, revoked.assignment.role
    ));
    match revoked.membership.action {
        MembershipAction::Retain => style::print_hint(&format!(
            "User stays in group {} through another active role",
            revoked.membership.group
        )),
        _ => style::print_labeled("left group", &revoked.membership.group),
    }
    Ok(())
}
