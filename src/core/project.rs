//! Workspace discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::library::Library;
use crate::core::view::ViewConfig;

/// Library document holding the Items and Tasks sections
pub const LIBRARY_FILE: &str = "data.json";

/// Display configuration document
pub const VIEW_CONFIG_FILE: &str = "config.json";

/// Workspace-level settings overrides
pub const SETTINGS_FILE: &str = ".wkshop.yaml";

/// Default name of the backup directory
pub const BACKUP_DIR: &str = "Backups";

/// Represents a workshop workspace (a directory holding `data.json`)
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the workspace
    root: PathBuf,
}

impl Project {
    /// Find the workspace by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find the workspace by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(LIBRARY_FILE).is_file() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Resolve the workspace from an explicit `--project` path or by discovery
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => {
                let root = path
                    .canonicalize()
                    .map_err(|e| ProjectError::IoError(format!("{}: {}", path.display(), e)))?;
                if !root.join(LIBRARY_FILE).is_file() {
                    return Err(ProjectError::NotFound {
                        searched_from: root,
                    });
                }
                Ok(Self { root })
            }
            None => Self::discover(),
        }
    }

    /// Create a new workspace at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(LIBRARY_FILE).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_skeleton(root)
    }

    /// Initialize even if `data.json` exists, replacing it with an empty library
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_skeleton(root)
    }

    fn write_skeleton(root: PathBuf) -> Result<Self, ProjectError> {
        std::fs::create_dir_all(root.join(BACKUP_DIR))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let library = crate::json::to_pretty_string(&Library::default())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(root.join(LIBRARY_FILE), library)
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let view_path = root.join(VIEW_CONFIG_FILE);
        if !view_path.exists() {
            let view = crate::json::to_pretty_string(&ViewConfig::default())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
            std::fs::write(&view_path, view).map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        let settings_path = root.join(SETTINGS_FILE);
        if !settings_path.exists() {
            std::fs::write(&settings_path, Self::default_settings())
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(Self { root })
    }

    fn default_settings() -> &'static str {
        r#"# wkshop workspace settings
# Values here override the global config (see `wkshop config path`)

# Number of numbered backups kept per file in Backups/
# backup_retention: 10

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# Ask before deleting records
# confirm_deletes: true
"#
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the library document
    pub fn library_path(&self) -> PathBuf {
        self.root.join(LIBRARY_FILE)
    }

    /// Path of the display configuration document
    pub fn view_config_path(&self) -> PathBuf {
        self.root.join(VIEW_CONFIG_FILE)
    }

    /// Path of the workspace settings file
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Backup directory, relative names resolved against the workspace root
    pub fn backup_dir(&self, configured: Option<&str>) -> PathBuf {
        self.root.join(configured.unwrap_or(BACKUP_DIR))
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no data.json found (searched from {searched_from:?}). Run 'wkshop init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("workspace already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.library_path().is_file());
        assert!(project.view_config_path().is_file());
        assert!(project.settings_path().is_file());
        assert!(project.backup_dir(None).is_dir());

        let content = std::fs::read_to_string(project.library_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(value["Items"].as_object().unwrap().is_empty());
        assert!(value["Tasks"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_init_force_keeps_view_config() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.view_config_path(), "{\"title\": \"Mine\"}").unwrap();

        Project::init_force(tmp.path()).unwrap();
        let view = std::fs::read_to_string(project.view_config_path()).unwrap();
        assert!(view.contains("Mine"));
    }

    #[test]
    fn test_discover_walks_up() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_fails_without_library() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_locate_explicit_path() {
        let tmp = tempdir().unwrap();
        assert!(Project::locate(Some(tmp.path())).is_err());
        Project::init(tmp.path()).unwrap();
        assert!(Project::locate(Some(tmp.path())).is_ok());
    }
}
