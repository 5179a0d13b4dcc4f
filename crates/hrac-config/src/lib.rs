//! Configuration management for hrac
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (HRAC_* prefix, `__` between nested keys)
//! 3. hrac.local.toml (gitignored, local overrides)
//! 4. hrac.toml (git-tracked, project config)
//! 5. ~/.config/hrac/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use anyhow::Result;
use hrac_rbac::{Capability, PermissionMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main hrac configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HracConfig {
    pub evaluation: EvaluationConfig,
    pub group_sync: GroupSyncConfig,
    pub sections: SectionsConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Log every access decision at `info`.
    pub audit_decisions: bool,
    /// Let superusers pass every row-level check. Off by default: access
    /// then comes from roles alone.
    pub superuser_bypass: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            audit_decisions: true,
            superuser_bypass: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSyncConfig {
    /// Extra permission codes per capability name, added to the built-in
    /// user and department mappings.
    pub mappings: BTreeMap<String, Vec<String>>,
    /// Permission codes to register with the platform on startup.
    pub permissions: Vec<String>,
}

impl GroupSyncConfig {
    /// Builds the capability → permission-code mapping.
    pub fn permission_mapping(&self) -> Result<PermissionMapping, ConfigError> {
        let mut mapping = PermissionMapping::default();
        for (name, codes) in &self.mappings {
            let capability = parse_capability("group_sync.mappings", name)?;
            mapping = mapping.with_codes(capability, codes.clone());
        }
        Ok(mapping)
    }
}

/// Capability requirements per application section.
///
/// A section is identified by a namespace and a view name
/// (`hr_modules` / `leave_list`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionsConfig {
    /// Prefixes of `namespace:view` names that skip permission checks.
    pub public: Vec<String>,
    /// Required capability per namespace.
    pub required: BTreeMap<String, SectionRequirement>,
}

/// What a namespace requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionRequirement {
    /// One capability for every view in the namespace.
    Capability(String),
    /// A capability per view-name prefix. Views matching no prefix are open.
    ByView(BTreeMap<String, String>),
}

impl SectionRequirement {
    fn capability_names(&self) -> Vec<&str> {
        match self {
            SectionRequirement::Capability(name) => vec![name.as_str()],
            SectionRequirement::ByView(views) => views.values().map(String::as_str).collect(),
        }
    }
}

impl Default for SectionsConfig {
    fn default() -> Self {
        let public = [
            "login",
            "logout",
            "password_reset",
            "password_reset_done",
            "password_reset_confirm",
            "password_reset_complete",
            "static",
            "media",
            "admin:",
        ]
        .map(String::from)
        .to_vec();

        let hr_modules = [
            ("training", "can_manage_trainings"),
            ("leave", "can_manage_leaves"),
            ("examination", "can_manage_examinations"),
            ("promotion", "can_manage_promotions"),
            ("transfer", "can_manage_transfers"),
            ("educational_upgrade", "can_manage_educational_upgrades"),
            ("retirement", "can_manage_retirements"),
        ]
        .into_iter()
        .map(|(view, capability)| (view.to_string(), capability.to_string()))
        .collect();

        let required = BTreeMap::from([
            (
                "hr_modules".to_string(),
                SectionRequirement::ByView(hr_modules),
            ),
            (
                "task_management".to_string(),
                SectionRequirement::Capability("can_create_tasks".to_string()),
            ),
            (
                "file_management".to_string(),
                SectionRequirement::Capability("can_manage_files".to_string()),
            ),
            (
                "admin".to_string(),
                SectionRequirement::Capability("can_manage_users".to_string()),
            ),
        ]);

        Self { public, required }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot of roles, assignments, rules and groups.
    pub snapshot: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot: PathBuf::from(".hrac/store.json"),
        }
    }
}

impl HracConfig {
    /// Load configuration layered over a project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without layering.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every capability name refers to a known capability.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.group_sync.permission_mapping()?;
        for requirement in self.sections.required.values() {
            for name in requirement.capability_names() {
                parse_capability("sections.required", name)?;
            }
        }
        if self.store.snapshot.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.snapshot must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if self.store.snapshot.is_relative() {
            self.store.snapshot = base_dir.as_ref().join(&self.store.snapshot);
        }
    }
}

fn parse_capability(section: &'static str, name: &str) -> Result<Capability, ConfigError> {
    name.parse().map_err(|_| ConfigError::UnknownCapability {
        section,
        name: name.to_string(),
    })
}
