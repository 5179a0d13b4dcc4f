#![allow(clippy::match_same_arms)]
//! Capability tokens and capability sets.
//!
//! A capability is a blanket permission that holds independently of any
//! row-level condition. The set of capabilities is closed: adding one is an
//! explicit change to [`Capability`], and a name outside the enumeration is
//! simply not held by anyone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a capability name is not part of the enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

/// Blanket capability that can be granted to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capability {
    // -- Administration --
    ManageUsers,
    ManageDepartments,
    ManageRoles,

    // -- HR modules --
    ManageTrainings,
    ApproveTrainings,
    ManageLeaves,
    ApproveLeaves,
    ManageExaminations,
    ManagePromotions,
    ApprovePromotions,
    ManageTransfers,
    ApproveTransfers,
    ManageEducationalUpgrades,
    ApproveEducationalUpgrades,
    ManageRetirements,

    // -- Task management --
    CreateTasks,
    AssignTasks,
    ViewAllTasks,
    ManageWorkflows,

    // -- File management --
    ManageFiles,
    ViewAllFiles,
    ManageFilePermissions,

    // -- Reports --
    ViewReports,
    CreateReports,
    ExportData,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 25] = [
        Capability::ManageUsers,
        Capability::ManageDepartments,
        Capability::ManageRoles,
        Capability::ManageTrainings,
        Capability::ApproveTrainings,
        Capability::ManageLeaves,
        Capability::ApproveLeaves,
        Capability::ManageExaminations,
        Capability::ManagePromotions,
        Capability::ApprovePromotions,
        Capability::ManageTransfers,
        Capability::ApproveTransfers,
        Capability::ManageEducationalUpgrades,
        Capability::ApproveEducationalUpgrades,
        Capability::ManageRetirements,
        Capability::CreateTasks,
        Capability::AssignTasks,
        Capability::ViewAllTasks,
        Capability::ManageWorkflows,
        Capability::ManageFiles,
        Capability::ViewAllFiles,
        Capability::ManageFilePermissions,
        Capability::ViewReports,
        Capability::CreateReports,
        Capability::ExportData,
    ];

    /// The wire name of the capability (`can_manage_users`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::ManageUsers => "can_manage_users",
            Capability::ManageDepartments => "can_manage_departments",
            Capability::ManageRoles => "can_manage_roles",
            Capability::ManageTrainings => "can_manage_trainings",
            Capability::ApproveTrainings => "can_approve_trainings",
            Capability::ManageLeaves => "can_manage_leaves",
            Capability::ApproveLeaves => "can_approve_leaves",
            Capability::ManageExaminations => "can_manage_examinations",
            Capability::ManagePromotions => "can_manage_promotions",
            Capability::ApprovePromotions => "can_approve_promotions",
            Capability::ManageTransfers => "can_manage_transfers",
            Capability::ApproveTransfers => "can_approve_transfers",
            Capability::ManageEducationalUpgrades => "can_manage_educational_upgrades",
            Capability::ApproveEducationalUpgrades => "can_approve_educational_upgrades",
            Capability::ManageRetirements => "can_manage_retirements",
            Capability::CreateTasks => "can_create_tasks",
            Capability::AssignTasks => "can_assign_tasks",
            Capability::ViewAllTasks => "can_view_all_tasks",
            Capability::ManageWorkflows => "can_manage_workflows",
            Capability::ManageFiles => "can_manage_files",
            Capability::ViewAllFiles => "can_view_all_files",
            Capability::ManageFilePermissions => "can_manage_file_permissions",
            Capability::ViewReports => "can_view_reports",
            Capability::CreateReports => "can_create_reports",
            Capability::ExportData => "can_export_data",
        }
    }

    /// Looks a capability up by wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Returns whether this capability lets its holder change who can do what.
    ///
    /// Grants of roles carrying high-risk capabilities are logged at `warn`.
    pub fn is_high_risk(self) -> bool {
        matches!(
            self,
            Capability::ManageUsers
                | Capability::ManageRoles
                | Capability::ManageFilePermissions
                | Capability::ExportData
        )
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::from_name(s).ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

impl TryFrom<String> for Capability {
    type Error = UnknownCapability;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.as_str().to_string()
    }
}

/// Set of capabilities held by a role (or aggregated across roles).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    capabilities: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether this set contains the given capability.
    pub fn contains(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Returns whether this set contains the capability with the given name.
    ///
    /// Names outside the enumeration are never contained.
    pub fn contains_name(&self, name: &str) -> bool {
        Capability::from_name(name).is_some_and(|c| self.contains(c))
    }

    /// Adds a capability to the set.
    pub fn grant(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    /// Removes a capability from the set.
    pub fn revoke(&mut self, capability: Capability) {
        self.capabilities.remove(&capability);
    }

    /// Adds every capability of `other` to this set.
    pub fn union_with(&mut self, other: &CapabilitySet) {
        self.capabilities.extend(other.capabilities.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.capabilities.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Returns whether any capability in the set is high-risk.
    pub fn has_high_risk_capability(&self) -> bool {
        self.iter().any(Capability::is_high_risk)
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}

// ============================================================================
// Effective permissions
// ============================================================================

/// One entry of the flat permission mapping handed to request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionValue {
    /// A capability is held.
    Flag(bool),
    /// Scope ids accumulated under a `{role}_{scope_type}_scope` key.
    Scopes(Vec<u64>),
}

/// Permissions aggregated across all active role assignments of one user.
///
/// Serializes as the flat mapping callers consume: capability names map to
/// `true`, scope keys map to their list of scope ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    capabilities: CapabilitySet,
    scopes: BTreeMap<String, Vec<u64>>,
}

impl EffectivePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// ORs a role's capabilities into the aggregate.
    pub fn merge_capabilities(&mut self, capabilities: &CapabilitySet) {
        self.capabilities.union_with(capabilities);
    }

    /// Appends a scope id under `key`.
    pub fn add_scope(&mut self, key: impl Into<String>, scope_id: u64) {
        self.scopes.entry(key.into()).or_default().push(scope_id);
    }

    /// Returns whether the named capability is held. Unknown names are false.
    pub fn has(&self, name: &str) -> bool {
        self.capabilities.contains_name(name)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Looks up one entry of the flat mapping.
    pub fn get(&self, key: &str) -> Option<PermissionValue> {
        if self.has(key) {
            return Some(PermissionValue::Flag(true));
        }
        self.scopes
            .get(key)
            .map(|ids| PermissionValue::Scopes(ids.clone()))
    }

    /// Scope ids collected under `key`, or an empty slice.
    pub fn scope_ids(&self, key: &str) -> &[u64] {
        self.scopes.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn scopes(&self) -> &BTreeMap<String, Vec<u64>> {
        &self.scopes
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty() && self.scopes.is_empty()
    }

    /// Flattens into the name → value mapping.
    pub fn to_map(&self) -> BTreeMap<String, PermissionValue> {
        let mut map: BTreeMap<String, PermissionValue> = self
            .capabilities
            .iter()
            .map(|c| (c.as_str().to_string(), PermissionValue::Flag(true)))
            .collect();
        for (key, ids) in &self.scopes {
            map.insert(key.clone(), PermissionValue::Scopes(ids.clone()));
        }
        map
    }
}

impl Serialize for EffectivePermissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map = self.to_map();
        let mut out = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in &map {
            out.serialize_entry(key, value)?;
        }
        out.end()
    }
}
