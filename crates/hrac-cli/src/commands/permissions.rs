//! Effective permission listing.

use anyhow::Result;
use hrac::{PermissionValue, UserAttributes, UserId};

use super::StoreLocation;
use crate::style::{self, SemanticStyle};

pub fn run(store: &StoreLocation, user: u64, json: bool) -> Result<()> {
    let engine = store.open()?;
    let user = UserAttributes::new(UserId::new(user), String::new());
    let permissions = engine.evaluator().try_effective_permissions(&user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&permissions)?);
        return Ok(());
    }

    if permissions.is_empty() {
        println!("{}", format!("User {} holds no permissions.", user.id).muted());
        return Ok(());
    }

    let rows: Vec<(String, String)> = permissions
        .to_map()
        .into_iter()
        .map(|(name, value)| {
            let shown = match value {
                PermissionValue::Flag(flag) => flag.to_string(),
                PermissionValue::Scopes(ids) => ids
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            (name, shown)
        })
        .collect();
    let entries: Vec<(&str, String)> = rows
        .iter()
        .map(|(name, shown)| (name.as_str(), shown.clone()))
        .collect();

    println!("{}", format!("Effective permissions of user {}", user.id).header());
    style::print_info_table(&entries);
    Ok(())
}
