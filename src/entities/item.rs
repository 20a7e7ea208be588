//! Item entity type - a workshop product with its bill of materials

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::entity::{
    format_amount, json_field, keyed_sub_records, not_available, Record, SubRecord,
};
use crate::core::record_key::next_sub_id;

/// A raw material consumed by an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: u32,

    #[serde(default = "not_available")]
    pub material: String,

    #[serde(default = "not_available")]
    pub size: String,

    #[serde(default)]
    pub number_of: u32,

    /// Minutes spent working this material
    #[serde(default)]
    pub time_for: u32,
}

/// A purchased consumable or fitting used by an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkMaterial {
    pub id: u32,

    #[serde(default = "not_available")]
    pub material: String,

    #[serde(default = "not_available")]
    pub size: String,

    #[serde(default)]
    pub number_of: u32,

    /// Unit cost
    #[serde(default)]
    pub cost: f64,
}

/// One step of the production sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionStep {
    pub id: u32,

    #[serde(default = "not_available")]
    pub step: String,

    /// Minutes spent on this step
    #[serde(default)]
    pub time: u32,
}

impl SubRecord for Material {
    fn id(&self) -> u32 {
        self.id
    }
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl SubRecord for WorkMaterial {
    fn id(&self) -> u32 {
        self.id
    }
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl SubRecord for ProductionStep {
    fn id(&self) -> u32 {
        self.id
    }
    fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl Material {
    fn new(id: u32, draft: MaterialDraft) -> Self {
        Material {
            id,
            material: draft.material,
            size: draft.size,
            number_of: draft.number_of.unwrap_or_default(),
            time_for: draft.time_for,
        }
    }
}

impl WorkMaterial {
    fn new(id: u32, draft: WorkMaterialDraft) -> Self {
        WorkMaterial {
            id,
            material: draft.material,
            size: draft.size,
            number_of: draft.number_of.unwrap_or_default(),
            cost: draft.cost.unwrap_or_default(),
        }
    }
}

impl ProductionStep {
    fn new(id: u32, draft: StepDraft) -> Self {
        ProductionStep {
            id,
            step: draft.step,
            time: draft.time,
        }
    }
}

/// A workshop product
///
/// Field order matches the on-disk layout of `data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default = "not_available")]
    pub name: String,

    /// Free-form production time ("2h", "3 days")
    #[serde(default = "not_available")]
    pub time: String,

    #[serde(default, deserialize_with = "keyed_sub_records")]
    pub work_materials: BTreeMap<u32, WorkMaterial>,

    #[serde(default, deserialize_with = "keyed_sub_records")]
    pub materials: BTreeMap<u32, Material>,

    #[serde(default)]
    pub material_cost: f64,

    /// Selling price
    #[serde(default)]
    pub sell_cost: f64,

    #[serde(default, deserialize_with = "keyed_sub_records")]
    pub production_steps: BTreeMap<u32, ProductionStep>,

    #[serde(default = "not_available")]
    pub ad_info: String,
}

impl Record for Item {
    const SECTION: &'static str = "Items";
    const LABEL: &'static str = "item";

    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self, key: &str) -> Option<String> {
        match key {
            "work_material_cost" => Some(format_amount(self.work_material_cost())),
            "total_cost" => Some(format_amount(self.total_cost())),
            "margin" => Some(format_amount(self.margin())),
            "total_time" => Some(self.total_time().to_string()),
            _ => json_field(self, key),
        }
    }
}

impl Item {
    /// Build a new item, assigning sub-record ids from 0
    pub fn from_draft(draft: ItemDraft) -> Self {
        Item {
            name: draft.name,
            time: draft.time.unwrap_or_else(not_available),
            work_materials: (0..)
                .zip(draft.work_materials)
                .map(|(id, d)| (id, WorkMaterial::new(id, d)))
                .collect(),
            materials: (0..)
                .zip(draft.materials)
                .map(|(id, d)| (id, Material::new(id, d)))
                .collect(),
            material_cost: draft.material_cost.unwrap_or_default(),
            sell_cost: draft.sell_cost.unwrap_or_default(),
            production_steps: (0..)
                .zip(draft.steps)
                .map(|(id, d)| (id, ProductionStep::new(id, d)))
                .collect(),
            ad_info: draft.ad_info.unwrap_or_else(not_available),
        }
    }

    /// Apply a patch; `None` fields keep their stored value
    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(cost) = patch.material_cost {
            self.material_cost = cost;
        }
        if let Some(cost) = patch.sell_cost {
            self.sell_cost = cost;
        }
        if let Some(info) = patch.ad_info {
            self.ad_info = info;
        }
    }

    /// Add a material under the next free id; `None` when ids are exhausted
    pub fn add_material(&mut self, draft: MaterialDraft) -> Option<u32> {
        let id = next_sub_id(self.materials.keys())?;
        self.materials.insert(id, Material::new(id, draft));
        Some(id)
    }

    pub fn add_work_material(&mut self, draft: WorkMaterialDraft) -> Option<u32> {
        let id = next_sub_id(self.work_materials.keys())?;
        self.work_materials.insert(id, WorkMaterial::new(id, draft));
        Some(id)
    }

    pub fn add_step(&mut self, draft: StepDraft) -> Option<u32> {
        let id = next_sub_id(self.production_steps.keys())?;
        self.production_steps.insert(id, ProductionStep::new(id, draft));
        Some(id)
    }

    /// Cost of all work materials (`number_of × cost`)
    pub fn work_material_cost(&self) -> f64 {
        self.work_materials
            .values()
            .map(|w| w.number_of as f64 * w.cost)
            .sum()
    }

    /// Material cost plus work material cost
    pub fn total_cost(&self) -> f64 {
        self.material_cost + self.work_material_cost()
    }

    /// Selling price minus total cost
    pub fn margin(&self) -> f64 {
        self.sell_cost - self.total_cost()
    }

    /// Minutes spent on materials and production steps
    pub fn total_time(&self) -> u64 {
        let materials: u64 = self.materials.values().map(|m| u64::from(m.time_for)).sum();
        let steps: u64 = self.production_steps.values().map(|s| u64::from(s.time)).sum();
        materials + steps
    }
}

/// Values for a new item
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub time: Option<String>,
    pub material_cost: Option<f64>,
    pub sell_cost: Option<f64>,
    pub ad_info: Option<String>,
    pub materials: Vec<MaterialDraft>,
    pub work_materials: Vec<WorkMaterialDraft>,
    pub steps: Vec<StepDraft>,
}

/// Changes to an existing item's scalar fields
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub time: Option<String>,
    pub material_cost: Option<f64>,
    pub sell_cost: Option<f64>,
    pub ad_info: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.time.is_none()
            && self.material_cost.is_none()
            && self.sell_cost.is_none()
            && self.ad_info.is_none()
    }
}

/// Values for a new material, parsed from `material:size:time_for[:number_of]`
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDraft {
    pub material: String,
    pub size: String,
    pub time_for: u32,
    pub number_of: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialPatch {
    pub material: Option<String>,
    pub size: Option<String>,
    pub time_for: Option<u32>,
    pub number_of: Option<u32>,
}

impl MaterialPatch {
    pub fn is_empty(&self) -> bool {
        self.material.is_none()
            && self.size.is_none()
            && self.time_for.is_none()
            && self.number_of.is_none()
    }

    pub fn apply(self, target: &mut Material) {
        if let Some(v) = self.material {
            target.material = v;
        }
        if let Some(v) = self.size {
            target.size = v;
        }
        if let Some(v) = self.time_for {
            target.time_for = v;
        }
        if let Some(v) = self.number_of {
            target.number_of = v;
        }
    }
}

/// Values for a new work material, parsed from `material:size[:number_of[:cost]]`
#[derive(Debug, Clone, PartialEq)]
pub struct WorkMaterialDraft {
    pub material: String,
    pub size: String,
    pub number_of: Option<u32>,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkMaterialPatch {
    pub material: Option<String>,
    pub size: Option<String>,
    pub number_of: Option<u32>,
    pub cost: Option<f64>,
}

impl WorkMaterialPatch {
    pub fn is_empty(&self) -> bool {
        self.material.is_none()
            && self.size.is_none()
            && self.number_of.is_none()
            && self.cost.is_none()
    }

    pub fn apply(self, target: &mut WorkMaterial) {
        if let Some(v) = self.material {
            target.material = v;
        }
        if let Some(v) = self.size {
            target.size = v;
        }
        if let Some(v) = self.number_of {
            target.number_of = v;
        }
        if let Some(v) = self.cost {
            target.cost = v;
        }
    }
}

/// Values for a new production step, parsed from `step:time`
#[derive(Debug, Clone, PartialEq)]
pub struct StepDraft {
    pub step: String,
    pub time: u32,
}

#[derive(Debug, Clone, Default)]
pub struct StepPatch {
    pub step: Option<String>,
    pub time: Option<u32>,
}

impl StepPatch {
    pub fn is_empty(&self) -> bool {
        self.step.is_none() && self.time.is_none()
    }

    pub fn apply(self, target: &mut ProductionStep) {
        if let Some(v) = self.step {
            target.step = v;
        }
        if let Some(v) = self.time {
            target.time = v;
        }
    }
}

fn split_spec<'a>(s: &'a str, what: &str, min: usize, max: usize) -> Result<Vec<&'a str>, String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    if parts.len() < min || parts.len() > max || parts[0].is_empty() {
        return Err(format!("invalid {} '{}'", what, s));
    }
    Ok(parts)
}

fn parse_num<T: FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", field, value))
}

impl FromStr for MaterialDraft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_spec(s, "material (expected material:size:time_for[:number_of])", 3, 4)?;
        Ok(Self {
            material: parts[0].to_string(),
            size: parts[1].to_string(),
            time_for: parse_num(parts[2], "time_for")?,
            number_of: parts.get(3).map(|v| parse_num(v, "number_of")).transpose()?,
        })
    }
}

impl FromStr for WorkMaterialDraft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_spec(
            s,
            "work material (expected material:size[:number_of[:cost]])",
            2,
            4,
        )?;
        Ok(Self {
            material: parts[0].to_string(),
            size: parts[1].to_string(),
            number_of: parts.get(2).map(|v| parse_num(v, "number_of")).transpose()?,
            cost: parts.get(3).map(|v| parse_num(v, "cost")).transpose()?,
        })
    }
}

impl FromStr for StepDraft {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = split_spec(s, "step (expected step:time)", 2, 2)?;
        Ok(Self {
            step: parts[0].to_string(),
            time: parse_num(parts[1], "time")?,
        })
    }
}
