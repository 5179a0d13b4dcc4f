//! Role definitions.
//!
//! A role is a named bundle of capabilities. Roles are data, not code: the
//! organisation defines as many as it needs, each tagged with one of the
//! [`RoleType`] kinds and a hierarchy level.

use std::fmt::{self, Display};
use std::str::FromStr;

use hrac_types::RoleId;
use serde::{Deserialize, Serialize};

use crate::permissions::{Capability, CapabilitySet};

/// The organisational kind of a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    SysAdmin,
    /// Director General.
    Dg,
    Director,
    ZonalDirector,
    /// Head of Department.
    Hod,
    UnitHead,
    StateCoordinator,
    HrAdmin,
    HrOfficer,
    Employee,
}

impl RoleType {
    pub const ALL: [RoleType; 10] = [
        RoleType::SysAdmin,
        RoleType::Dg,
        RoleType::Director,
        RoleType::ZonalDirector,
        RoleType::Hod,
        RoleType::UnitHead,
        RoleType::StateCoordinator,
        RoleType::HrAdmin,
        RoleType::HrOfficer,
        RoleType::Employee,
    ];

    /// The stored code (`SYS_ADMIN`, `HOD`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            RoleType::SysAdmin => "SYS_ADMIN",
            RoleType::Dg => "DG",
            RoleType::Director => "DIRECTOR",
            RoleType::ZonalDirector => "ZONAL_DIRECTOR",
            RoleType::Hod => "HOD",
            RoleType::UnitHead => "UNIT_HEAD",
            RoleType::StateCoordinator => "STATE_COORDINATOR",
            RoleType::HrAdmin => "HR_ADMIN",
            RoleType::HrOfficer => "HR_OFFICER",
            RoleType::Employee => "EMPLOYEE",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            RoleType::SysAdmin => "System Administrator",
            RoleType::Dg => "Director General",
            RoleType::Director => "Director",
            RoleType::ZonalDirector => "Zonal Director",
            RoleType::Hod => "Head of Department",
            RoleType::UnitHead => "Unit Head",
            RoleType::StateCoordinator => "State Coordinator",
            RoleType::HrAdmin => "HR Administrator",
            RoleType::HrOfficer => "HR Officer",
            RoleType::Employee => "Regular Employee",
        }
    }
}

impl Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for a role type code that names no [`RoleType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role type: {0}")]
pub struct UnknownRoleType(pub String);

impl FromStr for RoleType {
    type Err = UnknownRoleType;

    /// Parses a role type code, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRoleType(s.to_string()))
    }
}

/// A role in the access control system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,

    /// Globally unique name. Also the default name of the linked group.
    pub name: String,

    pub description: Option<String>,

    pub role_type: RoleType,

    /// Higher number means higher authority.
    pub hierarchy_level: u32,

    /// Capabilities held by every user assigned this role.
    pub capabilities: CapabilitySet,

    /// Name of the external group whose permission codes mirror
    /// [`capabilities`](Self::capabilities).
    pub group: String,
}

impl Role {
    /// Creates a role with no capabilities, linked to a group of the same name.
    pub fn new(id: RoleId, name: impl Into<String>, role_type: RoleType) -> Self {
        let name = name.into();
        Self {
            id,
            group: name.clone(),
            name,
            description: None,
            role_type,
            hierarchy_level: 0,
            capabilities: CapabilitySet::empty(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hierarchy_level(mut self, level: u32) -> Self {
        self.hierarchy_level = level;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.grant(capability);
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        for capability in capabilities {
            self.capabilities.grant(capability);
        }
        self
    }

    /// Links the role to a differently named group (several roles may share one).
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Reads a single named capability.
    ///
    /// Unknown names are not an error; they resolve to `false` so callers can
    /// ask about capabilities introduced after this build.
    pub fn has_blanket_capability(&self, capability_name: &str) -> bool {
        self.capabilities.contains_name(capability_name)
    }

    /// Returns whether this role carries more authority than `other`.
    pub fn outranks(&self, other: &Role) -> bool {
        self.hierarchy_level > other.hierarchy_level
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Free-function form of [`Role::has_blanket_capability`].
pub fn has_blanket_capability(role: &Role, capability_name: &str) -> bool {
    role.has_blanket_capability(capability_name)
}
