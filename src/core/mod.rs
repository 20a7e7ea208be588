//! Core module - workspace, documents, backups and settings

pub mod backup;
pub mod config;
pub mod document;
pub mod entity;
pub mod library;
pub mod project;
pub mod record_key;
pub mod view;

pub use backup::{BackupEntry, BackupError, BackupStore};
pub use config::Config;
pub use document::{DocumentError, LoadSource};
pub use entity::{Record, SubRecord};
pub use library::{Issue, Library, LibraryError, LibraryStore, Renumbering, Severity, SubKind};
pub use project::{Project, ProjectError};
pub use record_key::{KeyParseError, RecordKey};
pub use view::{Column, ListKind, Section, ViewConfig, ViewStore};
