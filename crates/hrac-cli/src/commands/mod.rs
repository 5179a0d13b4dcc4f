//! CLI command implementations.

pub mod access;
pub mod grants;
pub mod permissions;
pub mod roles;
pub mod rules;
pub mod version;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hrac::{AccessControl, DynamicRecord, EntityType, HracConfig, UserAttributes};

/// Where the policy lives, as given on the command line.
pub struct StoreLocation {
    pub project: PathBuf,
    /// A single configuration file replacing the layered sources.
    pub config: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

impl StoreLocation {
    fn load_config(&self) -> Result<HracConfig> {
        let Some(path) = &self.config else {
            return HracConfig::load_from_dir(&self.project).with_context(|| {
                format!("Failed to load configuration from {}", self.project.display())
            });
        };

        let mut config = HracConfig::from_toml_file(path)?;
        let base = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Loads configuration and opens the engine on the snapshot.
    pub fn open(&self) -> Result<AccessControl> {
        let mut config = self.load_config()?;
        if let Some(snapshot) = &self.snapshot {
            config.store.snapshot.clone_from(snapshot);
        }

        AccessControl::open(&config).with_context(|| {
            format!(
                "Failed to open snapshot {}",
                config.store.snapshot.display()
            )
        })
    }
}

/// Reads the acting user from a JSON file.
pub fn read_user(path: &Path) -> Result<UserAttributes> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read user file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid user in {}", path.display()))
}

/// Reads a JSON array of record objects, each with an integer `id`.
pub fn read_records(path: &Path, entity: &EntityType) -> Result<Vec<DynamicRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let Some(items) = json.as_array() else {
        bail!("{} must hold a JSON array of objects", path.display());
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            DynamicRecord::from_json(entity.clone(), item).with_context(|| {
                format!("Record {index} in {} is not an object with an integer id", path.display())
            })
        })
        .collect()
}
