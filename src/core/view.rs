//! Display configuration (`config.json`)
//!
//! Holds the title, the default list and the column layout of every list the
//! CLI prints. Each column pairs a heading with the JSON field it reads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::backup::BackupStore;
use crate::core::document::{self, DocumentError, LoadSource};

/// Which top-level list is shown by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
pub enum Section {
    #[default]
    Items,
    Tasks,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Items => write!(f, "Items"),
            Section::Tasks => write!(f, "Tasks"),
        }
    }
}

/// A list whose columns can be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListKind {
    Items,
    Tasks,
    Materials,
    WorkMaterials,
    Steps,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListKind::Items => write!(f, "items"),
            ListKind::Tasks => write!(f, "tasks"),
            ListKind::Materials => write!(f, "materials"),
            ListKind::WorkMaterials => write!(f, "work-materials"),
            ListKind::Steps => write!(f, "steps"),
        }
    }
}

/// One table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub heading: String,
    pub field: String,
}

impl Column {
    pub fn new(heading: &str, field: &str) -> Self {
        Self {
            heading: heading.to_string(),
            field: field.to_string(),
        }
    }
}

impl std::str::FromStr for Column {
    type Err = String;

    /// `Heading=field`, or a bare `field` whose heading is derived from it
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (heading, field) = match s.split_once('=') {
            Some((h, f)) => (h.trim().to_string(), f.trim()),
            None => (s.trim().replace('_', " ").to_uppercase(), s.trim()),
        };
        if field.is_empty() || heading.is_empty() {
            return Err(format!("invalid column '{}' (expected HEADING=field or field)", s));
        }
        Ok(Self {
            heading,
            field: field.to_string(),
        })
    }
}

/// Column layout of every list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSets {
    pub items: Vec<Column>,
    pub tasks: Vec<Column>,
    pub materials: Vec<Column>,
    pub work_materials: Vec<Column>,
    pub production_steps: Vec<Column>,
}

impl Default for ColumnSets {
    fn default() -> Self {
        Self {
            items: vec![
                Column::new("ID", "id"),
                Column::new("NAME", "name"),
                Column::new("TIME", "time"),
                Column::new("MATERIAL COST", "material_cost"),
                Column::new("PRICE", "sell_cost"),
            ],
            tasks: vec![
                Column::new("ID", "id"),
                Column::new("NAME", "name"),
                Column::new("ITEM", "item"),
                Column::new("QTY", "quantity"),
                Column::new("DEADLINE", "deadline"),
                Column::new("STATUS", "status"),
            ],
            materials: vec![
                Column::new("ID", "id"),
                Column::new("MATERIAL", "material"),
                Column::new("SIZE", "size"),
                Column::new("COUNT", "number_of"),
                Column::new("TIME", "time_for"),
            ],
            work_materials: vec![
                Column::new("ID", "id"),
                Column::new("MATERIAL", "material"),
                Column::new("SIZE", "size"),
                Column::new("COUNT", "number_of"),
                Column::new("COST", "cost"),
            ],
            production_steps: vec![
                Column::new("ID", "id"),
                Column::new("STEP", "step"),
                Column::new("TIME", "time"),
            ],
        }
    }
}

/// Maximum rows per list; `None` shows everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<usize>,
}

/// Contents of `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub title: String,
    pub default_view: Section,
    pub limits: ListLimits,
    pub columns: ColumnSets,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            title: "Workshop".to_string(),
            default_view: Section::Items,
            limits: ListLimits::default(),
            columns: ColumnSets::default(),
        }
    }
}

impl ViewConfig {
    pub fn columns(&self, kind: ListKind) -> &[Column] {
        match kind {
            ListKind::Items => &self.columns.items,
            ListKind::Tasks => &self.columns.tasks,
            ListKind::Materials => &self.columns.materials,
            ListKind::WorkMaterials => &self.columns.work_materials,
            ListKind::Steps => &self.columns.production_steps,
        }
    }

    pub fn set_columns(&mut self, kind: ListKind, columns: Vec<Column>) {
        let target = match kind {
            ListKind::Items => &mut self.columns.items,
            ListKind::Tasks => &mut self.columns.tasks,
            ListKind::Materials => &mut self.columns.materials,
            ListKind::WorkMaterials => &mut self.columns.work_materials,
            ListKind::Steps => &mut self.columns.production_steps,
        };
        *target = columns;
    }

    /// Restore the built-in layout of one list
    pub fn reset_columns(&mut self, kind: ListKind) {
        let defaults = ViewConfig::default();
        self.set_columns(kind, defaults.columns(kind).to_vec());
    }

    /// Positional column ids `c1..cN`
    pub fn column_ids(&self, kind: ListKind) -> Vec<String> {
        (1..=self.columns(kind).len())
            .map(|n| format!("c{}", n))
            .collect()
    }

    pub fn limit(&self, section: Section) -> Option<usize> {
        match section {
            Section::Items => self.limits.items,
            Section::Tasks => self.limits.tasks,
        }
    }
}

/// Loads and saves `config.json`
#[derive(Debug, Clone)]
pub struct ViewStore {
    path: PathBuf,
    backups: BackupStore,
}

impl ViewStore {
    pub fn new(path: impl Into<PathBuf>, backups: BackupStore) -> Self {
        Self {
            path: path.into(),
            backups,
        }
    }

    pub fn load(&self) -> Result<(ViewConfig, LoadSource), DocumentError> {
        let loaded = document::load::<ViewConfig>(&self.path, &self.backups)?;
        Ok((loaded.value, loaded.source))
    }

    /// Back up the current config, then write `next`
    pub fn save(&self, previous: &ViewConfig, next: &ViewConfig) -> Result<(), DocumentError> {
        document::commit(&self.path, previous, next, &self.backups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_column_parse() {
        let c: Column = "Price=sell_cost".parse().unwrap();
        assert_eq!(c, Column::new("Price", "sell_cost"));

        let c: Column = "material_cost".parse().unwrap();
        assert_eq!(c, Column::new("MATERIAL COST", "material_cost"));

        assert!("Price=".parse::<Column>().is_err());
    }

    #[test]
    fn test_column_ids() {
        let view = ViewConfig::default();
        assert_eq!(view.column_ids(ListKind::Steps), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let view: ViewConfig =
            serde_json::from_str(r#"{"title": "Stolarnia", "limits": {"items": 5}}"#).unwrap();
        assert_eq!(view.title, "Stolarnia");
        assert_eq!(view.limit(Section::Items), Some(5));
        assert_eq!(view.limit(Section::Tasks), None);
        assert_eq!(view.columns(ListKind::Items), ColumnSets::default().items.as_slice());
    }

    #[test]
    fn test_set_and_reset_columns() {
        let mut view = ViewConfig::default();
        view.set_columns(ListKind::Tasks, vec![Column::new("WHO", "customer")]);
        assert_eq!(view.columns(ListKind::Tasks).len(), 1);
        view.reset_columns(ListKind::Tasks);
        assert_eq!(view, ViewConfig::default());
    }

    #[test]
    fn test_store_save_backs_up() {
        let tmp = tempdir().unwrap();
        let store = ViewStore::new(
            tmp.path().join("config.json"),
            BackupStore::new(tmp.path().join("Backups"), 10),
        );
        let (before, source) = store.load().unwrap();
        assert_eq!(source, LoadSource::Created);

        let mut after = before.clone();
        after.title = "Shop".to_string();
        store.save(&before, &after).unwrap();

        assert_eq!(store.load().unwrap().0.title, "Shop");
        assert!(tmp.path().join("Backups/1__config.json").is_file());
    }
}
