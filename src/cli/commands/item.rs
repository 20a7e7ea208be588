//! `wkshop item` command - Item management

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{IntoDiagnostic, Result};
use std::collections::BTreeMap;

use crate::cli::helpers::{success, Workspace};
use crate::cli::table::{compare_cells, print_structured, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::{format_amount, json_field, Record};
use crate::core::record_key::RecordKey;
use crate::core::view::{Column, ListKind, Section, ViewConfig};
use crate::entities::{
    Item, ItemDraft, ItemPatch, MaterialDraft, StepDraft, WorkMaterialDraft,
};

#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// List items
    List(ListArgs),

    /// Show an item with its materials and production steps
    Show(ShowArgs),

    /// Create a new item
    New(NewArgs),

    /// Change fields of an item
    Edit(EditArgs),

    /// Delete an item
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only items whose name contains this text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Sort by field (default: key order)
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit output to N items (overrides config.json)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Ignore the configured row limit
    #[arg(long)]
    pub all: bool,

    /// Columns to display, as HEADING=field or field (overrides config.json)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<Column>,

    /// Show count only, not the items
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Item key (id_3, 3 or @3)
    pub key: RecordKey,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Item name
    pub name: Option<String>,

    /// Production time description
    #[arg(long)]
    pub time: Option<String>,

    /// Cost of materials
    #[arg(long)]
    pub material_cost: Option<f64>,

    /// Selling price
    #[arg(long, alias = "price")]
    pub sell_cost: Option<f64>,

    /// Additional information
    #[arg(long)]
    pub info: Option<String>,

    /// Material as material:size:time_for[:number_of] (repeatable)
    #[arg(long = "material", short = 'm', value_name = "SPEC")]
    pub materials: Vec<MaterialDraft>,

    /// Work material as material:size[:number_of[:cost]] (repeatable)
    #[arg(long = "work-material", short = 'w', value_name = "SPEC")]
    pub work_materials: Vec<WorkMaterialDraft>,

    /// Production step as step:time (repeatable)
    #[arg(long = "step", value_name = "SPEC")]
    pub steps: Vec<StepDraft>,

    /// Prompt for the fields
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Item key
    pub key: RecordKey,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New production time description
    #[arg(long)]
    pub time: Option<String>,

    /// New cost of materials
    #[arg(long)]
    pub material_cost: Option<f64>,

    /// New selling price
    #[arg(long, alias = "price")]
    pub sell_cost: Option<f64>,

    /// New additional information
    #[arg(long)]
    pub info: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Item key
    pub key: RecordKey,

    /// Delete even if tasks still reference the item
    #[arg(long)]
    pub force: bool,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: ItemCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ItemCommands::List(args) => run_list(args, global),
        ItemCommands::Show(args) => run_show(args, global),
        ItemCommands::New(args) => run_new(args, global),
        ItemCommands::Edit(args) => run_edit(args, global),
        ItemCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let view = ws.load_view()?;

    let mut items: Vec<(RecordKey, &Item)> = library.items.iter().map(|(k, v)| (*k, v)).collect();

    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        items.retain(|(_, item)| item.name.to_lowercase().contains(&needle));
    }

    if let Some(ref field) = args.sort {
        items.sort_by(|(ka, a), (kb, b)| {
            let a = sort_value(*ka, *a, field);
            let b = sort_value(*kb, *b, field);
            compare_cells(&a, &b)
        });
    }
    if args.reverse {
        items.reverse();
    }

    let limit = args
        .limit
        .or_else(|| (!args.all).then(|| view.limit(Section::Items)).flatten());
    if let Some(n) = limit {
        items.truncate(n);
    }

    if args.count {
        println!("{}", items.len());
        return Ok(());
    }

    let format = ws.format(global, OutputFormat::Tsv);

    if items.is_empty() {
        match format {
            OutputFormat::Json => println!("{{}}"),
            OutputFormat::Yaml => println!("{{}}"),
            _ => {
                println!("No items found.");
                println!();
                println!("Create one with: {}", style("wkshop item new").yellow());
            }
        }
        return Ok(());
    }

    // Structured output is keyed, so it always comes out in key order
    let selected: BTreeMap<RecordKey, &Item> = items.iter().map(|(k, v)| (*k, *v)).collect();
    if print_structured(&selected, format)? {
        return Ok(());
    }

    let columns = if args.columns.is_empty() {
        view.columns(ListKind::Items).to_vec()
    } else {
        args.columns
    };
    let rows: Vec<TableRow> = items
        .iter()
        .map(|(key, item)| TableRow::build(key, *item, &columns, |r, f| r.field(f)))
        .collect();

    TableFormatter::new(&columns, Item::LABEL).output(&rows, format)
}

fn sort_value(key: RecordKey, item: &Item, field: &str) -> String {
    if field == crate::cli::table::KEY_FIELD {
        key.number().to_string()
    } else {
        item.field(field).unwrap_or_default()
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let item = library.item(args.key)?;

    let format = ws.format(global, OutputFormat::Auto);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_structured(item, format)?;
        }
        OutputFormat::Id => println!("{}", args.key),
        _ => {
            let view = ws.load_view()?;
            print_item(args.key, item, &view)?;

            let tasks = library.tasks_for_item(args.key);
            if !tasks.is_empty() {
                println!();
                println!("{}", style("Ordered by:").bold());
                for key in tasks {
                    if let Ok(task) = library.task(key) {
                        println!(
                            "  {} {} ({} × {})",
                            style(key).cyan(),
                            task.name,
                            task.quantity,
                            task.status
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_item(key: RecordKey, item: &Item, view: &ViewConfig) -> Result<()> {
    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(key).cyan());
    println!("{}: {}", style("Name").bold(), style(&item.name).yellow());
    println!("{}: {}", style("Time").bold(), item.time);
    println!(
        "{}: {}",
        style("Material cost").bold(),
        format_amount(item.material_cost)
    );
    println!(
        "{}: {}",
        style("Selling price").bold(),
        format_amount(item.sell_cost)
    );
    println!("{}", style("─".repeat(60)).dim());

    print_section(
        "Materials",
        view.columns(ListKind::Materials),
        item.materials.iter().map(|(id, m)| TableRow::build(id, m, view.columns(ListKind::Materials), |r, f| json_field(r, f))),
    )?;
    print_section(
        "Work materials",
        view.columns(ListKind::WorkMaterials),
        item.work_materials.iter().map(|(id, m)| {
            TableRow::build(id, m, view.columns(ListKind::WorkMaterials), |r, f| json_field(r, f))
        }),
    )?;
    print_section(
        "Production steps",
        view.columns(ListKind::Steps),
        item.production_steps.iter().map(|(id, s)| {
            TableRow::build(id, s, view.columns(ListKind::Steps), |r, f| json_field(r, f))
        }),
    )?;

    if item.ad_info != crate::core::entity::NOT_AVAILABLE {
        println!();
        println!("{}", style("Additional information:").bold());
        println!("{}", item.ad_info);
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} | {}: {} | {}: {} | {}: {}",
        style("Work materials").dim(),
        format_amount(item.work_material_cost()),
        style("Total cost").dim(),
        format_amount(item.total_cost()),
        style("Margin").dim(),
        format_amount(item.margin()),
        style("Total time").dim(),
        item.total_time()
    );
    Ok(())
}

fn print_section(
    title: &str,
    columns: &[Column],
    rows: impl Iterator<Item = TableRow>,
) -> Result<()> {
    let rows: Vec<TableRow> = rows.collect();
    if rows.is_empty() {
        return Ok(());
    }
    println!();
    println!("{}", style(format!("{}:", title)).bold());
    TableFormatter::new(columns, "record")
        .without_summary()
        .output(&rows, OutputFormat::Tsv)
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;

    let draft = if args.interactive {
        prompt_draft(args)?
    } else {
        let name = args
            .name
            .ok_or_else(|| miette::miette!("Name is required (pass NAME or use -i for interactive)"))?;
        ItemDraft {
            name,
            time: args.time,
            material_cost: args.material_cost,
            sell_cost: args.sell_cost,
            ad_info: args.info,
            materials: args.materials,
            work_materials: args.work_materials,
            steps: args.steps,
        }
    };

    let name = draft.name.clone();
    let key = ws.modify(|lib| lib.add_item(draft))?;

    if global.quiet {
        println!("{}", key);
    } else {
        success(
            global,
            format!("Created item {} {}", style(key).cyan(), style(name).yellow()),
        );
    }
    Ok(())
}

fn prompt_draft(args: NewArgs) -> Result<ItemDraft> {
    let theme = ColorfulTheme::default();

    let name: String = Input::with_theme(&theme)
        .with_prompt("Name")
        .with_initial_text(args.name.unwrap_or_default())
        .interact_text()
        .into_diagnostic()?;
    let time: String = Input::with_theme(&theme)
        .with_prompt("Production time")
        .default(args.time.unwrap_or_else(|| "N/A".to_string()))
        .interact_text()
        .into_diagnostic()?;
    let material_cost: f64 = Input::with_theme(&theme)
        .with_prompt("Material cost")
        .default(args.material_cost.unwrap_or(0.0))
        .interact_text()
        .into_diagnostic()?;
    let sell_cost: f64 = Input::with_theme(&theme)
        .with_prompt("Selling price")
        .default(args.sell_cost.unwrap_or(0.0))
        .interact_text()
        .into_diagnostic()?;

    Ok(ItemDraft {
        name,
        time: Some(time),
        material_cost: Some(material_cost),
        sell_cost: Some(sell_cost),
        ad_info: args.info,
        materials: args.materials,
        work_materials: args.work_materials,
        steps: args.steps,
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let patch = ItemPatch {
        name: args.name,
        time: args.time,
        material_cost: args.material_cost,
        sell_cost: args.sell_cost,
        ad_info: args.info,
    };
    if patch.is_empty() {
        return Err(miette::miette!(
            help = "Pass at least one of --name, --time, --material-cost, --sell-cost, --info",
            "Nothing to change"
        ));
    }

    let ws = Workspace::open(global)?;
    ws.modify(|lib| lib.update_item(args.key, patch))?;
    success(global, format!("Updated item {}", style(args.key).cyan()));
    Ok(())
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let item = library.item(args.key)?;

    if !ws.confirm_delete(&format!("item {} ({})", args.key, item.name), args.yes)? {
        return Ok(());
    }

    let removed = ws.modify(|lib| lib.delete_item(args.key, args.force))?;
    success(
        global,
        format!(
            "Deleted item {} {}",
            style(args.key).cyan(),
            style(removed.name).dim()
        ),
    );
    Ok(())
}
