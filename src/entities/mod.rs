//! Record types stored in the ledger

pub mod item;
pub mod task;

pub use item::{
    Item, ItemDraft, ItemPatch, Material, MaterialDraft, MaterialPatch, ProductionStep, StepDraft,
    StepPatch, WorkMaterial, WorkMaterialDraft, WorkMaterialPatch,
};
pub use task::{Task, TaskDraft, TaskPatch, TaskStatus};
