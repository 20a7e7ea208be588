//! Numbered backup copies with a fixed retention limit
//!
//! Backups live in a single directory and are named `<version>__<file_name>`,
//! where `version` counts up from 1 per file name. After every new backup the
//! oldest versions are removed until at most `retention` remain.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator between version number and original file name
pub const VERSION_SEPARATOR: &str = "__";

/// Number of backups kept per file name unless configured otherwise
pub const DEFAULT_RETENTION: usize = 10;

/// One backup file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub version: u32,
    pub file_name: String,
    pub path: PathBuf,
}

impl BackupEntry {
    /// Size in bytes, if the file is still readable
    pub fn size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|m| m.len())
    }

    /// Last modification time, if available
    pub fn modified(&self) -> Option<chrono::DateTime<chrono::Local>> {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(chrono::DateTime::<chrono::Local>::from)
    }
}

/// Backup directory with version rotation
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    retention: usize,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            dir: dir.into(),
            retention: retention.max(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Path a given version of `file_name` is stored at
    pub fn path_of(&self, file_name: &str, version: u32) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", version, VERSION_SEPARATOR, file_name))
    }

    /// All backups of `file_name`, oldest first
    ///
    /// Files that do not follow the `<version>__<name>` pattern are ignored.
    pub fn entries(&self, file_name: &str) -> Result<Vec<BackupEntry>, BackupError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<BackupEntry> = walkdir::WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let name = e.file_name().to_str()?;
                let (version, original) = parse_backup_name(name)?;
                (original == file_name).then(|| BackupEntry {
                    version,
                    file_name: original.to_string(),
                    path: e.path().to_path_buf(),
                })
            })
            .collect();

        entries.sort_by_key(|e| e.version);
        Ok(entries)
    }

    /// Sorted version numbers of `file_name`
    pub fn versions(&self, file_name: &str) -> Result<Vec<u32>, BackupError> {
        Ok(self.entries(file_name)?.into_iter().map(|e| e.version).collect())
    }

    /// The most recent backup of `file_name`
    pub fn latest(&self, file_name: &str) -> Result<Option<BackupEntry>, BackupError> {
        Ok(self.entries(file_name)?.pop())
    }

    /// A specific version of `file_name`
    pub fn find(&self, file_name: &str, version: u32) -> Result<BackupEntry, BackupError> {
        self.entries(file_name)?
            .into_iter()
            .find(|e| e.version == version)
            .ok_or_else(|| BackupError::VersionNotFound {
                file_name: file_name.to_string(),
                version,
            })
    }

    /// Write `contents` as the next version of `file_name`, then rotate
    pub fn create(&self, file_name: &str, contents: &str) -> Result<BackupEntry, BackupError> {
        fs::create_dir_all(&self.dir).map_err(|source| BackupError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let version = self
            .latest(file_name)?
            .map(|e| e.version + 1)
            .unwrap_or(1);
        let path = self.path_of(file_name, version);

        fs::write(&path, contents).map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), version, "backup written");

        self.prune(file_name)?;

        Ok(BackupEntry {
            version,
            file_name: file_name.to_string(),
            path,
        })
    }

    /// Copy the current state of `source` into the backup directory
    ///
    /// Missing sources are skipped and yield `None`.
    pub fn snapshot(&self, source: &Path) -> Result<Option<BackupEntry>, BackupError> {
        if !source.is_file() {
            return Ok(None);
        }
        let contents = fs::read_to_string(source).map_err(|e| BackupError::Io {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.create(&file_name_of(source)?, &contents).map(Some)
    }

    /// Delete the oldest backups of `file_name` beyond the retention limit
    pub fn prune(&self, file_name: &str) -> Result<Vec<PathBuf>, BackupError> {
        let entries = self.entries(file_name)?;
        let excess = entries.len().saturating_sub(self.retention);
        let mut removed = Vec::with_capacity(excess);

        for entry in entries.into_iter().take(excess) {
            fs::remove_file(&entry.path).map_err(|source| BackupError::Io {
                path: entry.path.clone(),
                source,
            })?;
            tracing::debug!(path = %entry.path.display(), "old backup removed");
            removed.push(entry.path);
        }

        Ok(removed)
    }

    /// Replace `target` with the given backup version
    ///
    /// The current contents of `target` are backed up first, so a restore can
    /// itself be undone.
    pub fn restore(&self, target: &Path, version: u32) -> Result<BackupEntry, BackupError> {
        let file_name = file_name_of(target)?;
        let entry = self.find(&file_name, version)?;
        let contents = fs::read_to_string(&entry.path).map_err(|source| BackupError::Io {
            path: entry.path.clone(),
            source,
        })?;

        self.snapshot(target)?;

        fs::write(target, contents).map_err(|source| BackupError::Io {
            path: target.to_path_buf(),
            source,
        })?;
        tracing::info!(version, target = %target.display(), "backup restored");

        Ok(entry)
    }
}

/// Split `12__data.json` into `(12, "data.json")`
pub fn parse_backup_name(name: &str) -> Option<(u32, &str)> {
    let (version, original) = name.split_once(VERSION_SEPARATOR)?;
    if original.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((version.parse().ok()?, original))
}

fn file_name_of(path: &Path) -> Result<String, BackupError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| BackupError::InvalidFileName(path.to_path_buf()))
}

/// Errors that can occur while managing backups
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no backup version {version} of {file_name}")]
    VersionNotFound { file_name: String, version: u32 },

    #[error("cannot back up {0:?}: file name is not valid UTF-8")]
    InvalidFileName(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_backup_name() {
        assert_eq!(parse_backup_name("3__data.json"), Some((3, "data.json")));
        assert_eq!(parse_backup_name("12__my__data.json"), Some((12, "my__data.json")));
        assert_eq!(parse_backup_name("data.json"), None);
        assert_eq!(parse_backup_name("x__data.json"), None);
        assert_eq!(parse_backup_name("3__"), None);
    }

    #[test]
    fn test_versions_count_up_per_file() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path().join("Backups"), 10);

        assert!(store.versions("data.json").unwrap().is_empty());
        store.create("data.json", "{}").unwrap();
        store.create("data.json", "{}").unwrap();
        store.create("config.json", "{}").unwrap();

        assert_eq!(store.versions("data.json").unwrap(), vec![1, 2]);
        assert_eq!(store.versions("config.json").unwrap(), vec![1]);
        assert!(tmp.path().join("Backups/2__data.json").is_file());
    }

    #[test]
    fn test_rotation_keeps_retention_newest() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path(), 10);

        for i in 0..13 {
            store.create("data.json", &format!("{{\"n\": {}}}", i)).unwrap();
        }

        let versions = store.versions("data.json").unwrap();
        assert_eq!(versions, (4..=13).collect::<Vec<_>>());
        assert!(!tmp.path().join("1__data.json").exists());
        let newest = fs::read_to_string(tmp.path().join("13__data.json")).unwrap();
        assert_eq!(newest, "{\"n\": 12}");
    }

    #[test]
    fn test_ordering_is_numeric_not_lexical() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path(), 50);
        fs::write(tmp.path().join("9__data.json"), "nine").unwrap();
        fs::write(tmp.path().join("10__data.json"), "ten").unwrap();

        let latest = store.latest("data.json").unwrap().unwrap();
        assert_eq!(latest.version, 10);
        assert_eq!(store.create("data.json", "x").unwrap().version, 11);
    }

    #[test]
    fn test_foreign_files_are_ignored() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path(), 10);
        fs::write(tmp.path().join("notes.txt"), "hello").unwrap();
        fs::write(tmp.path().join("1__other.json"), "{}").unwrap();

        assert!(store.entries("data.json").unwrap().is_empty());
    }

    #[test]
    fn test_restore_backs_up_current_first() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("data.json");
        let store = BackupStore::new(tmp.path().join("Backups"), 10);

        fs::write(&target, "old").unwrap();
        store.snapshot(&target).unwrap();
        fs::write(&target, "new").unwrap();

        store.restore(&target, 1).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
        let v2 = store.find("data.json", 2).unwrap();
        assert_eq!(fs::read_to_string(v2.path).unwrap(), "new");
    }

    #[test]
    fn test_restore_missing_version() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path(), 10);
        let err = store.restore(&tmp.path().join("data.json"), 4).unwrap_err();
        assert!(matches!(err, BackupError::VersionNotFound { version: 4, .. }));
    }

    #[test]
    fn test_snapshot_of_missing_file_is_skipped() {
        let tmp = tempdir().unwrap();
        let store = BackupStore::new(tmp.path().join("Backups"), 10);
        assert!(store.snapshot(&tmp.path().join("nope.json")).unwrap().is_none());
        assert!(!store.dir().exists());
    }
}
