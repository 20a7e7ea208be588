//! The ledger document (`data.json`) and its mutations
//!
//! [`Library`] is the in-memory form of the whole document: every operation
//! mutates it in place. [`LibraryStore`] loads it, and commits a mutated copy
//! by backing up the previous state and rewriting the file.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::backup::BackupStore;
use crate::core::document::{self, DocumentError, LoadSource};
use crate::core::entity::{Record, SubRecord};
use crate::core::record_key::RecordKey;
use crate::entities::{
    Item, ItemDraft, ItemPatch, Material, MaterialDraft, MaterialPatch, ProductionStep, StepDraft,
    StepPatch, Task, TaskDraft, TaskPatch, WorkMaterial, WorkMaterialDraft, WorkMaterialPatch,
};

/// Kind of sub-record nested in an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubKind {
    Material,
    WorkMaterial,
    Step,
}

impl SubKind {
    /// JSON key of the nested map inside an item
    pub fn section(&self) -> &'static str {
        match self {
            SubKind::Material => "materials",
            SubKind::WorkMaterial => "work_materials",
            SubKind::Step => "production_steps",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubKind::Material => "material",
            SubKind::WorkMaterial => "work material",
            SubKind::Step => "production step",
        }
    }
}

/// The whole ledger document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    #[serde(rename = "Items", default)]
    pub items: BTreeMap<RecordKey, Item>,

    #[serde(rename = "Tasks", default)]
    pub tasks: BTreeMap<RecordKey, Task>,
}

impl Library {
    // ===== Items =====

    /// Item keys in numeric order
    pub fn item_keys(&self) -> Vec<RecordKey> {
        self.items.keys().copied().collect()
    }

    pub fn item(&self, key: RecordKey) -> Result<&Item, LibraryError> {
        self.items.get(&key).ok_or(LibraryError::ItemNotFound(key))
    }

    fn item_mut(&mut self, key: RecordKey) -> Result<&mut Item, LibraryError> {
        self.items
            .get_mut(&key)
            .ok_or(LibraryError::ItemNotFound(key))
    }

    /// Insert a new item under the next free key
    pub fn add_item(&mut self, draft: ItemDraft) -> Result<RecordKey, LibraryError> {
        let key = RecordKey::next_after(self.items.keys()).ok_or(LibraryError::KeysExhausted {
            section: Item::SECTION,
        })?;
        self.items.insert(key, Item::from_draft(draft));
        Ok(key)
    }

    pub fn update_item(&mut self, key: RecordKey, patch: ItemPatch) -> Result<(), LibraryError> {
        self.item_mut(key)?.apply(patch);
        Ok(())
    }

    /// Remove an item
    ///
    /// Items still referenced by tasks are only removed with `force`.
    pub fn delete_item(&mut self, key: RecordKey, force: bool) -> Result<Item, LibraryError> {
        self.item(key)?;
        let users = self.tasks_for_item(key);
        if !force && !users.is_empty() {
            return Err(LibraryError::ItemInUse { key, tasks: users });
        }
        self.items.remove(&key).ok_or(LibraryError::ItemNotFound(key))
    }

    /// Keys of tasks ordering the given item
    pub fn tasks_for_item(&self, key: RecordKey) -> Vec<RecordKey> {
        self.tasks
            .iter()
            .filter(|(_, t)| t.item == Some(key))
            .map(|(k, _)| *k)
            .collect()
    }

    // ===== Materials =====

    pub fn add_material(&mut self, item: RecordKey, draft: MaterialDraft) -> Result<u32, LibraryError> {
        self.item_mut(item)?
            .add_material(draft)
            .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::Material })
    }

    pub fn add_materials(
        &mut self,
        item: RecordKey,
        drafts: impl IntoIterator<Item = MaterialDraft>,
    ) -> Result<Vec<u32>, LibraryError> {
        let target = self.item_mut(item)?;
        drafts
            .into_iter()
            .map(|d| {
                target
                    .add_material(d)
                    .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::Material })
            })
            .collect()
    }

    pub fn update_material(
        &mut self,
        item: RecordKey,
        id: u32,
        patch: MaterialPatch,
    ) -> Result<(), LibraryError> {
        let target = self.item_mut(item)?;
        patch.apply(sub_mut(&mut target.materials, item, SubKind::Material, id)?);
        Ok(())
    }

    pub fn delete_material(&mut self, item: RecordKey, id: u32) -> Result<Material, LibraryError> {
        let target = self.item_mut(item)?;
        sub_remove(&mut target.materials, item, SubKind::Material, id)
    }

    // ===== Work materials =====

    pub fn add_work_material(
        &mut self,
        item: RecordKey,
        draft: WorkMaterialDraft,
    ) -> Result<u32, LibraryError> {
        self.item_mut(item)?
            .add_work_material(draft)
            .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::WorkMaterial })
    }

    pub fn add_work_materials(
        &mut self,
        item: RecordKey,
        drafts: impl IntoIterator<Item = WorkMaterialDraft>,
    ) -> Result<Vec<u32>, LibraryError> {
        let target = self.item_mut(item)?;
        drafts
            .into_iter()
            .map(|d| {
                target
                    .add_work_material(d)
                    .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::WorkMaterial })
            })
            .collect()
    }

    pub fn update_work_material(
        &mut self,
        item: RecordKey,
        id: u32,
        patch: WorkMaterialPatch,
    ) -> Result<(), LibraryError> {
        let target = self.item_mut(item)?;
        patch.apply(sub_mut(
            &mut target.work_materials,
            item,
            SubKind::WorkMaterial,
            id,
        )?);
        Ok(())
    }

    pub fn delete_work_material(
        &mut self,
        item: RecordKey,
        id: u32,
    ) -> Result<WorkMaterial, LibraryError> {
        let target = self.item_mut(item)?;
        sub_remove(&mut target.work_materials, item, SubKind::WorkMaterial, id)
    }

    // ===== Production steps =====

    pub fn add_step(&mut self, item: RecordKey, draft: StepDraft) -> Result<u32, LibraryError> {
        self.item_mut(item)?
            .add_step(draft)
            .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::Step })
    }

    pub fn add_steps(
        &mut self,
        item: RecordKey,
        drafts: impl IntoIterator<Item = StepDraft>,
    ) -> Result<Vec<u32>, LibraryError> {
        let target = self.item_mut(item)?;
        drafts
            .into_iter()
            .map(|d| {
                target
                    .add_step(d)
                    .ok_or(LibraryError::SubIdsExhausted { item, kind: SubKind::Step })
            })
            .collect()
    }

    pub fn update_step(
        &mut self,
        item: RecordKey,
        id: u32,
        patch: StepPatch,
    ) -> Result<(), LibraryError> {
        let target = self.item_mut(item)?;
        patch.apply(sub_mut(
            &mut target.production_steps,
            item,
            SubKind::Step,
            id,
        )?);
        Ok(())
    }

    pub fn delete_step(&mut self, item: RecordKey, id: u32) -> Result<ProductionStep, LibraryError> {
        let target = self.item_mut(item)?;
        sub_remove(&mut target.production_steps, item, SubKind::Step, id)
    }

    // ===== Tasks =====

    pub fn task_keys(&self) -> Vec<RecordKey> {
        self.tasks.keys().copied().collect()
    }

    pub fn task(&self, key: RecordKey) -> Result<&Task, LibraryError> {
        self.tasks.get(&key).ok_or(LibraryError::TaskNotFound(key))
    }

    /// Insert a new task; a referenced item must exist
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<RecordKey, LibraryError> {
        if let Some(item) = draft.item {
            self.item(item)?;
        }
        let key = RecordKey::next_after(self.tasks.keys()).ok_or(LibraryError::KeysExhausted {
            section: Task::SECTION,
        })?;
        self.tasks.insert(key, Task::from_draft(draft));
        Ok(key)
    }

    /// Change a task; a newly referenced item must exist
    pub fn update_task(&mut self, key: RecordKey, patch: TaskPatch) -> Result<(), LibraryError> {
        if let Some(Some(item)) = patch.item {
            self.item(item)?;
        }
        self.tasks
            .get_mut(&key)
            .ok_or(LibraryError::TaskNotFound(key))?
            .apply(patch);
        Ok(())
    }

    pub fn delete_task(&mut self, key: RecordKey) -> Result<Task, LibraryError> {
        self.tasks.remove(&key).ok_or(LibraryError::TaskNotFound(key))
    }

    // ===== Consistency =====

    /// Report numbering gaps, mismatched sub-record ids and dangling references
    pub fn check(&self) -> Vec<Issue> {
        let mut issues = Vec::new();

        for (section, keys) in [("Items", self.item_keys()), ("Tasks", self.task_keys())] {
            let missing = gaps(keys.iter().map(|k| k.number()), 1);
            if !missing.is_empty() {
                issues.push(Issue::warning(
                    section,
                    format!("keys are not contiguous, missing {}", describe_gaps(&missing)),
                ));
            }
        }

        for (key, item) in &self.items {
            check_sub_ids(&mut issues, *key, SubKind::Material, &item.materials);
            check_sub_ids(&mut issues, *key, SubKind::WorkMaterial, &item.work_materials);
            check_sub_ids(&mut issues, *key, SubKind::Step, &item.production_steps);
        }

        for (key, task) in &self.tasks {
            if let Some(item) = task.item {
                if !self.items.contains_key(&item) {
                    issues.push(Issue::error(
                        format!("Tasks/{}", key),
                        format!("references missing item {}", item),
                    ));
                }
            }
        }

        issues
    }

    /// Renumber all records contiguously and fix task references
    ///
    /// Items and tasks become `id_1..id_n` in their current order; nested
    /// sub-records become `0..k` with their inner `id` rewritten to match.
    pub fn renumber(&mut self) -> Renumbering {
        let mut result = Renumbering::default();

        let mut moved_items = BTreeMap::new();
        let items = std::mem::take(&mut self.items);
        for (new, (old, mut item)) in (1..).map(RecordKey::new).zip(items) {
            result.sub_records += renumber_subs(&mut item.materials);
            result.sub_records += renumber_subs(&mut item.work_materials);
            result.sub_records += renumber_subs(&mut item.production_steps);
            if old != new {
                result.items.push((old, new));
            }
            moved_items.insert(old, new);
            self.items.insert(new, item);
        }

        let tasks = std::mem::take(&mut self.tasks);
        for (new, (old, mut task)) in (1..).map(RecordKey::new).zip(tasks) {
            // A missing item's number may now belong to another item
            if let Some(item) = task.item {
                task.item = moved_items.get(&item).copied();
                if task.item.is_none() {
                    result.detached.push((new, item));
                }
            }
            if old != new {
                result.tasks.push((old, new));
            }
            self.tasks.insert(new, task);
        }

        result
    }
}

fn sub_mut<T>(
    map: &mut BTreeMap<u32, T>,
    item: RecordKey,
    kind: SubKind,
    id: u32,
) -> Result<&mut T, LibraryError> {
    map.get_mut(&id)
        .ok_or(LibraryError::SubRecordNotFound { item, kind, id })
}

fn sub_remove<T>(
    map: &mut BTreeMap<u32, T>,
    item: RecordKey,
    kind: SubKind,
    id: u32,
) -> Result<T, LibraryError> {
    map.remove(&id)
        .ok_or(LibraryError::SubRecordNotFound { item, kind, id })
}

fn renumber_subs<T: SubRecord>(map: &mut BTreeMap<u32, T>) -> usize {
    let mut changed = 0;
    let old = std::mem::take(map);
    for (index, (key, mut record)) in old.into_iter().enumerate() {
        let id = index as u32;
        if key != id || record.id() != id {
            changed += 1;
        }
        record.set_id(id);
        map.insert(id, record);
    }
    changed
}

fn check_sub_ids<T: SubRecord>(
    issues: &mut Vec<Issue>,
    item: RecordKey,
    kind: SubKind,
    map: &BTreeMap<u32, T>,
) {
    for (key, record) in map {
        if record.id() != *key {
            issues.push(Issue::warning(
                format!("Items/{}/{}/{}", item, kind.section(), key),
                format!("inner id {} does not match its key", record.id()),
            ));
        }
    }
    let missing = gaps(map.keys().copied(), 0);
    if !missing.is_empty() {
        issues.push(Issue::warning(
            format!("Items/{}/{}", item, kind.section()),
            format!("{} ids are not contiguous", kind.label()),
        ));
    }
}

/// Inclusive ranges missing from `start..=max` of a sorted sequence
fn gaps(sorted: impl IntoIterator<Item = u32>, start: u32) -> Vec<(u32, u32)> {
    let mut missing = Vec::new();
    let mut expected = Some(start);
    for n in sorted {
        if let Some(e) = expected.filter(|e| *e < n) {
            missing.push((e, n - 1));
        }
        expected = n.checked_add(1);
    }
    missing
}

/// Gap ranges shown in a `check` message
const MAX_LISTED_GAPS: usize = 5;

fn describe_gaps(missing: &[(u32, u32)]) -> String {
    let mut parts: Vec<String> = missing
        .iter()
        .take(MAX_LISTED_GAPS)
        .map(|&(from, to)| {
            if from == to {
                RecordKey::new(from).to_string()
            } else {
                format!("{}..{}", RecordKey::new(from), RecordKey::new(to))
            }
        })
        .collect();
    if missing.len() > MAX_LISTED_GAPS {
        parts.push(format!("and {} more range(s)", missing.len() - MAX_LISTED_GAPS));
    }
    parts.join(", ")
}

/// Severity of a consistency finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A consistency finding reported by [`Library::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub location: String,
    pub message: String,
}

impl Issue {
    fn warning(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location: location.into(),
            message: message.into(),
        }
    }

    fn error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Key changes made by [`Library::renumber`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renumbering {
    pub items: Vec<(RecordKey, RecordKey)>,
    pub tasks: Vec<(RecordKey, RecordKey)>,
    pub sub_records: usize,
    /// Tasks (new key) whose item no longer existed, with the dropped reference
    pub detached: Vec<(RecordKey, RecordKey)>,
}

impl Renumbering {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
            && self.tasks.is_empty()
            && self.sub_records == 0
            && self.detached.is_empty()
    }
}

/// Loads and commits the ledger document
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
    backups: BackupStore,
}

impl LibraryStore {
    pub fn new(path: impl Into<PathBuf>, backups: BackupStore) -> Self {
        Self {
            path: path.into(),
            backups,
        }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Read the document, recovering from backups if it is broken
    pub fn load(&self) -> Result<(Library, LoadSource), LibraryError> {
        let loaded = document::load::<Library>(&self.path, &self.backups)?;
        Ok((loaded.value, loaded.source))
    }

    /// Back up `before`, then write `after`
    pub fn commit(&self, before: &Library, after: &Library) -> Result<(), LibraryError> {
        document::commit(&self.path, before, after, &self.backups)?;
        tracing::info!(path = %self.path.display(), "library written");
        Ok(())
    }

    /// Load, apply `f`, and commit if anything changed
    ///
    /// When the primary file had to be recovered from a backup, the broken
    /// file is kept as a backup of its own before being overwritten.
    pub fn modify<R>(
        &self,
        f: impl FnOnce(&mut Library) -> Result<R, LibraryError>,
    ) -> Result<R, LibraryError> {
        let (before, source) = self.load()?;
        let mut after = before.clone();
        let result = f(&mut after)?;

        if after != before {
            if let LoadSource::Backup(version) = source {
                tracing::warn!(version, "overwriting broken library recovered from backup");
                self.backups
                    .snapshot(&self.path)
                    .map_err(DocumentError::from)?;
            }
            self.commit(&before, &after)?;
        }

        Ok(result)
    }
}

/// Errors that can occur in ledger operations
#[derive(Debug, Error, Diagnostic)]
pub enum LibraryError {
    #[error("no item {0}")]
    #[diagnostic(code(wkshop::library::item_not_found), help("List items with `wkshop item list`"))]
    ItemNotFound(RecordKey),

    #[error("no task {0}")]
    #[diagnostic(code(wkshop::library::task_not_found), help("List tasks with `wkshop task list`"))]
    TaskNotFound(RecordKey),

    #[error("item {item} has no {} with id {id}", .kind.label())]
    #[diagnostic(code(wkshop::library::sub_record_not_found))]
    SubRecordNotFound {
        item: RecordKey,
        kind: SubKind,
        id: u32,
    },

    #[error("item {key} is ordered by {} task(s): {}", .tasks.len(), format_keys(.tasks))]
    #[diagnostic(
        code(wkshop::library::item_in_use),
        help("Use --force to delete anyway, or delete the tasks first")
    )]
    ItemInUse { key: RecordKey, tasks: Vec<RecordKey> },

    #[error("no free key left in {section}")]
    #[diagnostic(
        code(wkshop::library::keys_exhausted),
        help("`wkshop renumber` compacts the keys")
    )]
    KeysExhausted { section: &'static str },

    #[error("item {item} has no free {} id left", .kind.label())]
    #[diagnostic(
        code(wkshop::library::sub_ids_exhausted),
        help("`wkshop renumber` compacts the ids")
    )]
    SubIdsExhausted { item: RecordKey, kind: SubKind },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}

fn format_keys(keys: &[RecordKey]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn draft(name: &str) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn key(n: u32) -> RecordKey {
        RecordKey::new(n)
    }

    #[test]
    fn test_document_layout() {
        let mut lib = Library::default();
        lib.add_item(draft("Stool")).unwrap();
        let value = serde_json::to_value(&lib).unwrap();
        assert_eq!(value["Items"]["id_1"]["name"], "Stool");
        assert!(value["Tasks"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_keys_follow_highest_not_count() {
        let mut lib = Library::default();
        for n in 1..=10 {
            lib.add_item(draft(&format!("item {}", n))).unwrap();
        }
        lib.delete_item(key(3), false).unwrap();
        assert_eq!(lib.add_item(draft("eleventh")).unwrap(), key(11));
        assert_eq!(lib.item_keys().last(), Some(&key(11)));
        assert_eq!(lib.item_keys().len(), 10);
    }

    #[test]
    fn test_missing_keys_are_errors() {
        let mut lib = Library::default();
        assert!(matches!(
            lib.update_item(key(4), ItemPatch::default()),
            Err(LibraryError::ItemNotFound(_))
        ));
        assert!(matches!(lib.delete_task(key(1)), Err(LibraryError::TaskNotFound(_))));

        let k = lib.add_item(draft("Box")).unwrap();
        assert!(matches!(
            lib.delete_material(k, 0),
            Err(LibraryError::SubRecordNotFound {
                kind: SubKind::Material,
                ..
            })
        ));
    }

    #[test]
    fn test_sub_record_lifecycle() {
        let mut lib = Library::default();
        let k = lib.add_item(draft("Box")).unwrap();

        let ids = lib
            .add_materials(
                k,
                vec!["oak:1x1:5".parse().unwrap(), "pine:2x2:7:3".parse().unwrap()],
            )
            .unwrap();
        assert_eq!(ids, vec![0, 1]);

        lib.update_material(
            k,
            1,
            MaterialPatch {
                number_of: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(lib.item(k).unwrap().materials[&1].number_of, 0);
        assert_eq!(lib.item(k).unwrap().materials[&1].material, "pine");

        let removed = lib.delete_material(k, 0).unwrap();
        assert_eq!(removed.material, "oak");
        assert_eq!(lib.add_material(k, "ash:3x3:1".parse().unwrap()).unwrap(), 2);

        let step = lib.add_step(k, "cut:10".parse().unwrap()).unwrap();
        lib.update_step(
            k,
            step,
            StepPatch {
                time: Some(12),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(lib.item(k).unwrap().production_steps[&step].time, 12);

        let w = lib.add_work_material(k, "screw:3x20:10:0.1".parse().unwrap()).unwrap();
        lib.delete_work_material(k, w).unwrap();
        assert!(lib.item(k).unwrap().work_materials.is_empty());
    }

    #[test]
    fn test_task_requires_existing_item() {
        let mut lib = Library::default();
        let err = lib
            .add_task(TaskDraft {
                name: "Order".to_string(),
                item: Some(key(1)),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, LibraryError::ItemNotFound(_)));
    }

    #[test]
    fn test_delete_item_in_use() {
        let mut lib = Library::default();
        let k = lib.add_item(draft("Chair")).unwrap();
        let t = lib
            .add_task(TaskDraft {
                name: "Cafe".to_string(),
                item: Some(k),
                ..Default::default()
            })
            .unwrap();

        let err = lib.delete_item(k, false).unwrap_err();
        assert!(matches!(err, LibraryError::ItemInUse { ref tasks, .. } if tasks == &vec![t]));
        assert!(lib.delete_item(k, true).is_ok());
        assert_eq!(lib.check().len(), 1);
    }

    #[test]
    fn test_gaps() {
        assert_eq!(gaps(vec![1, 2, 5], 1), vec![(3, 4)]);
        assert_eq!(gaps(vec![0, 1, 2], 0), Vec::new());
        assert_eq!(gaps(vec![2], 0), vec![(0, 1)]);
        assert_eq!(gaps(vec![1, 3, 7], 0), vec![(0, 0), (2, 2), (4, 6)]);
        assert_eq!(gaps(vec![u32::MAX], u32::MAX), Vec::new());
        assert_eq!(gaps(Vec::new(), 1), Vec::new());
    }

    #[test]
    fn test_check_summarises_wide_gaps() {
        let mut lib = Library::default();
        lib.items.insert(key(20_000_000), Item::from_draft(draft("Far")));
        let issues = lib.check();
        let gap = issues.iter().find(|i| i.location == "Items").unwrap();
        assert_eq!(gap.message, "keys are not contiguous, missing id_1..id_19999999");

        let spread: Vec<u32> = (1..=8).map(|n| n * 2).collect();
        let message = describe_gaps(&gaps(spread, 1));
        assert!(message.starts_with("id_1, id_3, id_5"));
        assert!(message.ends_with("and 3 more range(s)"));
    }

    #[test]
    fn test_keys_exhausted() {
        let mut lib = Library::default();
        lib.items.insert(key(u32::MAX), Item::from_draft(draft("Last")));
        assert!(matches!(
            lib.add_item(draft("Next")),
            Err(LibraryError::KeysExhausted { section: "Items" })
        ));
        assert_eq!(lib.item_keys(), vec![key(u32::MAX)]);

        lib.tasks.insert(
            key(u32::MAX),
            Task::from_draft(TaskDraft {
                name: "last".to_string(),
                ..Default::default()
            }),
        );
        assert!(matches!(
            lib.add_task(TaskDraft::default()),
            Err(LibraryError::KeysExhausted { section: "Tasks" })
        ));
    }

    #[test]
    fn test_sub_ids_exhausted() {
        let mut lib = Library::default();
        let k = lib.add_item(draft("Box")).unwrap();
        let step: StepDraft = "cut:1".parse().unwrap();
        lib.add_step(k, step.clone()).unwrap();
        let steps = &mut lib.items.get_mut(&k).unwrap().production_steps;
        let mut last = steps.remove(&0).unwrap();
        last.id = u32::MAX;
        steps.insert(u32::MAX, last);

        assert!(matches!(
            lib.add_step(k, step.clone()),
            Err(LibraryError::SubIdsExhausted { kind: SubKind::Step, .. })
        ));
        assert!(lib.add_steps(k, vec![step]).is_err());
        assert_eq!(lib.item(k).unwrap().production_steps.len(), 1);
    }

    #[test]
    fn test_check_reports_gaps_and_mismatches() {
        let mut lib = Library::default();
        let a = lib.add_item(draft("A")).unwrap();
        lib.add_item(draft("B")).unwrap();
        let c = lib.add_item(draft("C")).unwrap();
        lib.delete_item(key(2), false).unwrap();
        lib.add_step(a, "cut:1".parse().unwrap()).unwrap();
        lib.items.get_mut(&a).unwrap().production_steps.get_mut(&0).unwrap().id = 7;
        lib.add_step(c, "x:1".parse().unwrap()).unwrap();
        lib.add_step(c, "y:1".parse().unwrap()).unwrap();
        lib.delete_step(c, 0).unwrap();

        let issues = lib.check();
        assert!(issues
            .iter()
            .any(|i| i.location == "Items" && i.message.contains("id_2")));
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.location == "Items/id_1/production_steps/0"));
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.location == "Items/id_3/production_steps"));
    }

    #[test]
    fn test_renumber_compacts_and_fixes_references() {
        let mut lib = Library::default();
        for n in 1..=4 {
            lib.add_item(draft(&format!("item {}", n))).unwrap();
        }
        lib.delete_item(key(1), false).unwrap();
        lib.delete_item(key(3), false).unwrap();
        lib.add_step(key(4), "a:1".parse().unwrap()).unwrap();
        lib.add_step(key(4), "b:1".parse().unwrap()).unwrap();
        lib.delete_step(key(4), 0).unwrap();
        lib.add_task(TaskDraft {
            name: "order".to_string(),
            item: Some(key(4)),
            ..Default::default()
        })
        .unwrap();

        let result = lib.renumber();
        assert_eq!(result.items, vec![(key(2), key(1)), (key(4), key(2))]);
        assert!(result.tasks.is_empty());
        assert_eq!(result.sub_records, 1);

        assert_eq!(lib.item(key(2)).unwrap().name, "item 4");
        assert_eq!(lib.item(key(2)).unwrap().production_steps[&0].step, "b");
        assert_eq!(lib.item(key(2)).unwrap().production_steps[&0].id, 0);
        assert_eq!(lib.task(key(1)).unwrap().item, Some(key(2)));
        assert!(lib.check().is_empty());
        assert!(lib.renumber().is_empty());
    }

    #[test]
    fn test_renumber_clears_references_to_deleted_items() {
        let mut lib = Library::default();
        for name in ["A", "B", "C"] {
            lib.add_item(draft(name)).unwrap();
        }
        lib.add_task(TaskDraft {
            name: "for A".to_string(),
            item: Some(key(1)),
            ..Default::default()
        })
        .unwrap();
        lib.add_task(TaskDraft {
            name: "for C".to_string(),
            item: Some(key(3)),
            ..Default::default()
        })
        .unwrap();
        lib.delete_item(key(1), true).unwrap();

        let result = lib.renumber();
        assert_eq!(result.detached, vec![(key(1), key(1))]);
        assert!(!result.is_empty());

        // id_1 now belongs to "B" and must not be picked up by the task
        assert_eq!(lib.item(key(1)).unwrap().name, "B");
        assert_eq!(lib.task(key(1)).unwrap().item, None);
        assert_eq!(lib.task(key(2)).unwrap().item, Some(key(2)));
        assert!(lib.check().is_empty());
    }

    #[test]
    fn test_store_modify_commits_with_backup() {
        let tmp = tempdir().unwrap();
        let store = LibraryStore::new(
            tmp.path().join("data.json"),
            BackupStore::new(tmp.path().join("Backups"), 10),
        );

        let k = store.modify(|lib| lib.add_item(draft("Stool"))).unwrap();
        assert_eq!(k, key(1));
        // The load created the file; the commit backed up the empty library
        assert_eq!(store.backups().versions("data.json").unwrap(), vec![1]);

        let (lib, source) = store.load().unwrap();
        assert_eq!(source, LoadSource::Primary);
        assert_eq!(lib.item(k).unwrap().name, "Stool");
    }

    #[test]
    fn test_store_modify_without_change_skips_write() {
        let tmp = tempdir().unwrap();
        let store = LibraryStore::new(
            tmp.path().join("data.json"),
            BackupStore::new(tmp.path().join("Backups"), 10),
        );
        store.modify(|lib| Ok(lib.item_keys())).unwrap();
        assert!(store.backups().versions("data.json").unwrap().is_empty());
    }

    #[test]
    fn test_store_modify_keeps_broken_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        let store = LibraryStore::new(&path, BackupStore::new(tmp.path().join("Backups"), 10));

        store.modify(|lib| lib.add_item(draft("Stool"))).unwrap();
        fs::write(&path, "{ broken").unwrap();

        // Recovery uses the newest backup, which holds the state before "Stool"
        store.modify(|lib| lib.add_item(draft("Bench"))).unwrap();
        let (lib, _) = store.load().unwrap();
        assert_eq!(lib.item_keys(), vec![key(1)]);
        assert_eq!(lib.item(key(1)).unwrap().name, "Bench");

        let broken = store.backups().find("data.json", 2).unwrap();
        assert_eq!(fs::read_to_string(broken.path).unwrap(), "{ broken");
    }

    #[test]
    fn test_store_loads_records_with_missing_fields() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("data.json");
        let store = LibraryStore::new(&path, BackupStore::new(tmp.path().join("Backups"), 10));
        store.modify(|lib| lib.add_item(draft("Older"))).unwrap();

        fs::write(
            &path,
            r#"{
    "Items": {
        "id_1": {
            "name": "Shelf",
            "materials": {"3": {"material": "oak", "size": "1x1", "number_of": 2, "time_for": 5}},
            "production_steps": {"0": {"id": 0, "time": 15}}
        }
    },
    "Tasks": {"id_1": {"item": "id_1"}}
}"#,
        )
        .unwrap();

        let (lib, source) = store.load().unwrap();
        assert_eq!(source, LoadSource::Primary);
        let item = lib.item(key(1)).unwrap();
        assert_eq!(item.name, "Shelf");
        assert_eq!(item.materials[&3].id, 3);
        assert_eq!(item.production_steps[&0].step, "N/A");
        assert_eq!(lib.task(key(1)).unwrap().name, "N/A");
    }
}
