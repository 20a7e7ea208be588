//! `wkshop mat`, `wkshop wmat` and `wkshop step` commands
//!
//! Sub-records nested inside an item. Each is addressed by the item key and
//! its numeric id within the item.

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::cli::helpers::{success, Workspace};
use crate::cli::table::{print_structured, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::json_field;
use crate::core::library::SubKind;
use crate::core::record_key::RecordKey;
use crate::core::view::ListKind;
use crate::entities::{
    MaterialDraft, MaterialPatch, StepDraft, StepPatch, WorkMaterialDraft, WorkMaterialPatch,
};

#[derive(Subcommand, Debug)]
pub enum MatCommands {
    /// List the materials of an item
    List(SubListArgs),

    /// Add one or more materials
    Add(MatAddArgs),

    /// Change fields of a material
    Edit(MatEditArgs),

    /// Remove a material
    Delete(SubDeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum WmatCommands {
    /// List the work materials of an item
    List(SubListArgs),

    /// Add one or more work materials
    Add(WmatAddArgs),

    /// Change fields of a work material
    Edit(WmatEditArgs),

    /// Remove a work material
    Delete(SubDeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum StepCommands {
    /// List the production steps of an item
    List(SubListArgs),

    /// Add one or more production steps
    Add(StepAddArgs),

    /// Change fields of a production step
    Edit(StepEditArgs),

    /// Remove a production step
    Delete(SubDeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct SubListArgs {
    /// Item key
    pub item: RecordKey,
}

#[derive(clap::Args, Debug)]
pub struct SubDeleteArgs {
    /// Item key
    pub item: RecordKey,

    /// Id within the item
    pub id: u32,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct MatAddArgs {
    /// Item key
    pub item: RecordKey,

    /// material:size:time_for[:number_of]
    #[arg(required = true, value_name = "SPEC")]
    pub specs: Vec<MaterialDraft>,
}

#[derive(clap::Args, Debug)]
pub struct MatEditArgs {
    /// Item key
    pub item: RecordKey,

    /// Material id within the item
    pub id: u32,

    #[arg(long)]
    pub material: Option<String>,

    #[arg(long)]
    pub size: Option<String>,

    /// Time needed for this material
    #[arg(long)]
    pub time_for: Option<u32>,

    /// Number of pieces
    #[arg(long)]
    pub number_of: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct WmatAddArgs {
    /// Item key
    pub item: RecordKey,

    /// material:size[:number_of[:cost]]
    #[arg(required = true, value_name = "SPEC")]
    pub specs: Vec<WorkMaterialDraft>,
}

#[derive(clap::Args, Debug)]
pub struct WmatEditArgs {
    /// Item key
    pub item: RecordKey,

    /// Work material id within the item
    pub id: u32,

    #[arg(long)]
    pub material: Option<String>,

    #[arg(long)]
    pub size: Option<String>,

    /// Number of pieces
    #[arg(long)]
    pub number_of: Option<u32>,

    /// Cost per piece
    #[arg(long)]
    pub cost: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct StepAddArgs {
    /// Item key
    pub item: RecordKey,

    /// step:time
    #[arg(required = true, value_name = "SPEC")]
    pub specs: Vec<StepDraft>,
}

#[derive(clap::Args, Debug)]
pub struct StepEditArgs {
    /// Item key
    pub item: RecordKey,

    /// Step id within the item
    pub id: u32,

    /// Step description
    #[arg(long)]
    pub step: Option<String>,

    /// Time the step takes
    #[arg(long)]
    pub time: Option<u32>,
}

pub fn run_mat(cmd: MatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        MatCommands::List(args) => run_list(args, SubKind::Material, global),
        MatCommands::Add(args) => {
            let ws = Workspace::open(global)?;
            let ids = ws.modify(|lib| lib.add_materials(args.item, args.specs))?;
            report_added(global, SubKind::Material, args.item, &ids);
            Ok(())
        }
        MatCommands::Edit(args) => {
            let patch = MaterialPatch {
                material: args.material,
                size: args.size,
                time_for: args.time_for,
                number_of: args.number_of,
            };
            if patch.is_empty() {
                return Err(nothing_to_change("--material, --size, --time-for, --number-of"));
            }
            let ws = Workspace::open(global)?;
            ws.modify(|lib| lib.update_material(args.item, args.id, patch))?;
            report_updated(global, SubKind::Material, args.item, args.id);
            Ok(())
        }
        MatCommands::Delete(args) => run_delete(args, SubKind::Material, global),
    }
}

pub fn run_wmat(cmd: WmatCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        WmatCommands::List(args) => run_list(args, SubKind::WorkMaterial, global),
        WmatCommands::Add(args) => {
            let ws = Workspace::open(global)?;
            let ids = ws.modify(|lib| lib.add_work_materials(args.item, args.specs))?;
            report_added(global, SubKind::WorkMaterial, args.item, &ids);
            Ok(())
        }
        WmatCommands::Edit(args) => {
            let patch = WorkMaterialPatch {
                material: args.material,
                size: args.size,
                number_of: args.number_of,
                cost: args.cost,
            };
            if patch.is_empty() {
                return Err(nothing_to_change("--material, --size, --number-of, --cost"));
            }
            let ws = Workspace::open(global)?;
            ws.modify(|lib| lib.update_work_material(args.item, args.id, patch))?;
            report_updated(global, SubKind::WorkMaterial, args.item, args.id);
            Ok(())
        }
        WmatCommands::Delete(args) => run_delete(args, SubKind::WorkMaterial, global),
    }
}

pub fn run_step(cmd: StepCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        StepCommands::List(args) => run_list(args, SubKind::Step, global),
        StepCommands::Add(args) => {
            let ws = Workspace::open(global)?;
            let ids = ws.modify(|lib| lib.add_steps(args.item, args.specs))?;
            report_added(global, SubKind::Step, args.item, &ids);
            Ok(())
        }
        StepCommands::Edit(args) => {
            let patch = StepPatch {
                step: args.step,
                time: args.time,
            };
            if patch.is_empty() {
                return Err(nothing_to_change("--step, --time"));
            }
            let ws = Workspace::open(global)?;
            ws.modify(|lib| lib.update_step(args.item, args.id, patch))?;
            report_updated(global, SubKind::Step, args.item, args.id);
            Ok(())
        }
        StepCommands::Delete(args) => run_delete(args, SubKind::Step, global),
    }
}

fn run_list(args: SubListArgs, kind: SubKind, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let view = ws.load_view()?;
    let item = library.item(args.item)?;
    let format = ws.format(global, OutputFormat::Tsv);

    match kind {
        SubKind::Material => output(&item.materials, view.columns(ListKind::Materials), "material", format),
        SubKind::WorkMaterial => output(
            &item.work_materials,
            view.columns(ListKind::WorkMaterials),
            "work material",
            format,
        ),
        SubKind::Step => output(
            &item.production_steps,
            view.columns(ListKind::Steps),
            "production step",
            format,
        ),
    }
}

fn output<T: Serialize>(
    records: &BTreeMap<u32, T>,
    columns: &[crate::core::view::Column],
    label: &'static str,
    format: OutputFormat,
) -> Result<()> {
    if print_structured(records, format)? {
        return Ok(());
    }
    let rows: Vec<TableRow> = records
        .iter()
        .map(|(id, r)| TableRow::build(id, r, columns, |r, f| json_field(r, f)))
        .collect();
    TableFormatter::new(columns, label).output(&rows, format)
}

fn run_delete(args: SubDeleteArgs, kind: SubKind, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let what = format!("{} {} of item {}", kind.label(), args.id, args.item);
    if !ws.confirm_delete(&what, args.yes)? {
        return Ok(());
    }

    ws.modify(|lib| match kind {
        SubKind::Material => lib.delete_material(args.item, args.id).map(|_| ()),
        SubKind::WorkMaterial => lib.delete_work_material(args.item, args.id).map(|_| ()),
        SubKind::Step => lib.delete_step(args.item, args.id).map(|_| ()),
    })?;
    success(global, format!("Deleted {}", what));
    Ok(())
}

fn report_added(global: &GlobalOpts, kind: SubKind, item: RecordKey, ids: &[u32]) {
    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    success(
        global,
        format!(
            "Added {} {} to item {}",
            kind.label(),
            style(ids).cyan(),
            style(item).cyan()
        ),
    );
}

fn report_updated(global: &GlobalOpts, kind: SubKind, item: RecordKey, id: u32) {
    success(
        global,
        format!(
            "Updated {} {} of item {}",
            kind.label(),
            style(id).cyan(),
            style(item).cyan()
        ),
    );
}

fn nothing_to_change(flags: &str) -> miette::Report {
    miette::miette!(help = format!("Pass at least one of {}", flags), "Nothing to change")
}
