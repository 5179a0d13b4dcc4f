//! Role commands.

use anyhow::{Context, Result};
use hrac::{AccessStore, Capability, Role, RoleId, RoleType};

use super::StoreLocation;
use crate::style::{self, SemanticStyle};

/// Arguments of `role add`.
pub struct RoleSpec {
    pub id: u64,
    pub name: String,
    pub role_type: String,
    pub capabilities: Vec<String>,
    pub level: u32,
    pub group: Option<String>,
}

impl RoleSpec {
    fn to_role(&self) -> Result<Role> {
        let role_type: RoleType = self.role_type.parse()?;
        let capabilities = self
            .capabilities
            .iter()
            .map(|name| name.parse::<Capability>())
            .collect::<Result<Vec<_>, _>>()?;

        let mut role = Role::new(RoleId::new(self.id), &self.name, role_type)
            .with_hierarchy_level(self.level)
            .with_capabilities(capabilities);
        if let Some(group) = &self.group {
            role = role.with_group(group);
        }
        Ok(role)
    }
}

pub fn list(store: &StoreLocation) -> Result<()> {
    let engine = store.open()?;
    let mut roles = engine.store().roles()?;
    roles.sort_by_key(|r| r.id);

    let rows: Vec<Vec<String>> = roles
        .iter()
        .map(|role| {
            vec![
                role.id.to_string(),
                role.name.clone(),
                role.role_type.as_str().to_string(),
                role.hierarchy_level.to_string(),
                role.group.clone(),
                role.capabilities
                    .iter()
                    .map(Capability::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ]
        })
        .collect();

    style::print_list_table(
        &["ID", "Name", "Type", "Level", "Group", "Capabilities"],
        &rows,
        "role",
    );
    Ok(())
}

pub fn add(store: &StoreLocation, spec: &RoleSpec) -> Result<()> {
    let role = spec.to_role()?;
    let name = role.name.clone();
    let high_risk = role.capabilities.has_high_risk_capability();

    let engine = store.open()?;
    let reports = engine
        .save_role(role)
        .with_context(|| format!("Failed to save role {name}"))?;
    engine.save()?;

    style::print_success(&format!("Saved role {}", name.code()));
    for report in &reports {
        style::print_labeled(
            &format!("group {}", report.group),
            &format!("{} permissions", report.applied.len()),
        );
        for code in &report.skipped {
            style::print_warn(&format!("Permission code {} is not registered; skipped", code.code()));
        }
    }
    if high_risk {
        style::print_warn("Role holds high-risk capabilities");
    }
    if reports.iter().any(|r| !r.is_complete()) {
        style::print_hint("Register codes under group_sync.permissions in hrac.toml");
    }
    Ok(())
}

pub fn delete(store: &StoreLocation, id: u64) -> Result<()> {
    let engine = store.open()?;
    let removal = engine.delete_role(RoleId::new(id))?;
    engine.save()?;

    style::print_success(&format!("Deleted role {}", removal.deletion.role.name.code()));
    style::print_labeled("rules removed", &removal.deletion.rules.len().to_string());
    style::print_labeled(
        "assignments removed",
        &removal.deletion.assignments.len().to_string(),
    );
    Ok(())
}
