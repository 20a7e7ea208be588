//! Tool settings with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::backup::{BackupStore, DEFAULT_RETENTION};
use crate::core::library::LibraryStore;
use crate::core::project::Project;
use crate::core::view::ViewStore;

/// Settings keys with their descriptions
pub const VALID_KEYS: &[(&str, &str)] = &[
    ("backup_retention", "Number of numbered backups kept per file"),
    ("backup_dir", "Backup directory, relative to the workspace root"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, csv, md, id)",
    ),
    ("confirm_deletes", "Ask before deleting records (true/false)"),
];

/// wkshop settings with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of backups kept per file name
    pub backup_retention: Option<usize>,

    /// Backup directory name
    pub backup_dir: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Ask before deleting records
    pub confirm_deletes: Option<bool>,
}

impl Config {
    /// Load settings from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/wkshop/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.wkshop.yaml)
        if let Some(project) = project {
            if let Some(local) = Self::read_file(&project.settings_path()) {
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Some(retention) = std::env::var("WKSHOP_RETENTION")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.backup_retention = Some(retention);
        }
        if let Ok(format) = std::env::var("WKSHOP_FORMAT") {
            config.default_format = Some(format);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Option<Config>>(&contents) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "wkshop")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.backup_retention.is_some() {
            self.backup_retention = other.backup_retention;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.confirm_deletes.is_some() {
            self.confirm_deletes = other.confirm_deletes;
        }
    }

    pub fn retention(&self) -> usize {
        self.backup_retention.unwrap_or(DEFAULT_RETENTION)
    }

    pub fn confirm_deletes(&self) -> bool {
        self.confirm_deletes.unwrap_or(true)
    }

    /// Effective value of a key, rendered as text
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "backup_retention" => self.backup_retention.map(|v| v.to_string()),
            "backup_dir" => self.backup_dir.clone(),
            "default_format" => self.default_format.clone(),
            "confirm_deletes" => self.confirm_deletes.map(|v| v.to_string()),
            _ => None,
        }
    }

    pub fn backup_store(&self, project: &Project) -> BackupStore {
        BackupStore::new(
            project.backup_dir(self.backup_dir.as_deref()),
            self.retention(),
        )
    }

    pub fn library_store(&self, project: &Project) -> LibraryStore {
        LibraryStore::new(project.library_path(), self.backup_store(project))
    }

    pub fn view_store(&self, project: &Project) -> ViewStore {
        ViewStore::new(project.view_config_path(), self.backup_store(project))
    }
}

/// Convert a raw `config set` value into a typed YAML value for `key`
pub fn typed_value(key: &str, value: &str) -> Result<serde_yml::Value, String> {
    match key {
        "backup_retention" => value
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| serde_yml::Value::Number(n.into()))
            .ok_or_else(|| format!("backup_retention must be a positive number, got '{}'", value)),
        "confirm_deletes" => value
            .parse::<bool>()
            .map(serde_yml::Value::Bool)
            .map_err(|_| format!("confirm_deletes must be true or false, got '{}'", value)),
        "backup_dir" | "default_format" => Ok(serde_yml::Value::String(value.to_string())),
        _ => Err(format!(
            "unknown key '{}' (valid: {})",
            key,
            VALID_KEYS
                .iter()
                .map(|(k, _)| *k)
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
