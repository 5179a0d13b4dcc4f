//! JSON snapshots of a [`MemoryStore`](crate::MemoryStore).

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use hrac_abac::AttributeRule;
use hrac_rbac::{Role, UserRoleAssignment};
use hrac_types::UserId;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// Serializable image of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub roles: Vec<Role>,
    pub assignments: Vec<UserRoleAssignment>,
    pub rules: Vec<AttributeRule>,
    pub groups: Vec<GroupState>,
    /// Permission codes known to the platform.
    pub permissions: BTreeSet<String>,
}

/// A group's permission codes and members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupState {
    pub name: String,
    pub permissions: BTreeSet<String>,
    pub members: BTreeSet<UserId>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read(path: &Path) -> StoreResult<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Writes the snapshot next to `path` and renames it into place.
    /// Missing parent directories are created.
    pub fn write(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, self.to_json()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
