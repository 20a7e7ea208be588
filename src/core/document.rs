//! Whole-file JSON documents with backup fallback
//!
//! A document is read and written in one piece. Reading a missing file
//! creates it from the type's default. Reading a broken file falls back to
//! the newest backup that still parses.

use miette::Diagnostic;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::backup::{BackupError, BackupStore};
use crate::json::{to_pretty_string, JsonSyntaxError};

/// Where a loaded document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The file itself
    Primary,
    /// The file did not exist and was created from defaults
    Created,
    /// The file was unreadable; this backup version was used instead
    Backup(u32),
}

/// A parsed document together with its origin
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub source: LoadSource,
}

/// Load `path`, creating or recovering it as needed
pub fn load<T>(path: &Path, backups: &BackupStore) -> Result<Loaded<T>, DocumentError>
where
    T: DeserializeOwned + Serialize + Default,
{
    if !path.exists() {
        let value = T::default();
        save(path, &value)?;
        tracing::info!(path = %path.display(), "created missing document");
        return Ok(Loaded {
            value,
            source: LoadSource::Created,
        });
    }

    let text = read(path)?;
    let err = match serde_json::from_str::<T>(&text) {
        Ok(value) => {
            return Ok(Loaded {
                value,
                source: LoadSource::Primary,
            })
        }
        Err(err) => err,
    };

    let file_name = display_name(path);
    tracing::warn!(path = %path.display(), error = %err, "document is broken, trying backups");

    if let Some((version, value)) = recover::<T>(&file_name, backups)? {
        tracing::warn!(file = %file_name, version, "loaded backup version instead");
        return Ok(Loaded {
            value,
            source: LoadSource::Backup(version),
        });
    }

    if text.trim().is_empty() {
        // An empty file with nothing to recover is treated like a fresh one
        let value = T::default();
        save(path, &value)?;
        return Ok(Loaded {
            value,
            source: LoadSource::Created,
        });
    }

    Err(JsonSyntaxError::from_serde_error(&err, &text, &file_name).into())
}

/// Newest backup of `file_name` that parses as `T`
fn recover<T: DeserializeOwned>(
    file_name: &str,
    backups: &BackupStore,
) -> Result<Option<(u32, T)>, DocumentError> {
    for entry in backups.entries(file_name)?.into_iter().rev() {
        let Ok(text) = fs::read_to_string(&entry.path) else {
            continue;
        };
        match serde_json::from_str::<T>(&text) {
            Ok(value) => return Ok(Some((entry.version, value))),
            Err(e) => {
                tracing::warn!(version = entry.version, error = %e, "backup is broken too");
            }
        }
    }
    Ok(None)
}

/// Overwrite `path` with the pretty-printed document
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), DocumentError> {
    let text = to_pretty_string(value).map_err(DocumentError::Serialize)?;
    fs::write(path, text).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Back up the pre-mutation document, then overwrite `path`
pub fn commit<T: Serialize>(
    path: &Path,
    previous: &T,
    next: &T,
    backups: &BackupStore,
) -> Result<(), DocumentError> {
    let before = to_pretty_string(previous).map_err(DocumentError::Serialize)?;
    let entry = backups.create(&display_name(path), &before)?;
    tracing::debug!(version = entry.version, "pre-write backup stored");
    save(path, next)
}

fn read(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Errors that can occur while reading or writing documents
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] JsonSyntaxError),

    #[error("cannot access {path:?}: {source}")]
    #[diagnostic(code(wkshop::document::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(wkshop::document::backup))]
    Backup(#[from] BackupError),

    #[error("cannot serialize document: {0}")]
    #[diagnostic(code(wkshop::document::serialize))]
    Serialize(#[source] serde_json::Error),
}
