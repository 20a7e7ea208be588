//! `wkshop task` command - Task (order) management

use chrono::{Local, NaiveDate};
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;
use std::collections::BTreeMap;

use crate::cli::helpers::{success, Workspace};
use crate::cli::table::{compare_cells, print_structured, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::{format_amount, Record, NOT_AVAILABLE};
use crate::core::record_key::RecordKey;
use crate::core::view::{Column, ListKind, Section};
use crate::entities::{Task, TaskDraft, TaskPatch, TaskStatus};

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks with filtering
    List(ListArgs),

    /// Show a task's details
    Show(ShowArgs),

    /// Record a new task
    New(NewArgs),

    /// Change fields of a task
    Edit(EditArgs),

    /// Delete a task
    Delete(DeleteArgs),
}

/// Status filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Open,
    InProgress,
    Done,
    Cancelled,
    /// Open or in progress
    Active,
    /// All statuses
    All,
}

impl StatusFilter {
    fn matches(self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::Open => status == TaskStatus::Open,
            StatusFilter::InProgress => status == TaskStatus::InProgress,
            StatusFilter::Done => status == TaskStatus::Done,
            StatusFilter::Cancelled => status == TaskStatus::Cancelled,
            StatusFilter::Active => status.is_active(),
            StatusFilter::All => true,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only tasks for this item
    #[arg(long)]
    pub item: Option<RecordKey>,

    /// Only active tasks past their deadline
    #[arg(long)]
    pub overdue: bool,

    /// Search in name and customer (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    /// Sort by field (default: key order)
    #[arg(long)]
    pub sort: Option<String>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit output to N tasks (overrides config.json)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Ignore the configured row limit
    #[arg(long)]
    pub all: bool,

    /// Columns to display, as HEADING=field or field (overrides config.json)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<Column>,

    /// Show count only, not the tasks
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Task key (id_3, 3 or @3)
    pub key: RecordKey,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Task name
    pub name: String,

    /// Item being ordered
    #[arg(long)]
    pub item: Option<RecordKey>,

    /// Number of pieces (default: 1)
    #[arg(long, short = 'n')]
    pub quantity: Option<u32>,

    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long, short = 'd')]
    pub deadline: Option<NaiveDate>,

    /// Initial status (default: open)
    #[arg(long, short = 's')]
    pub status: Option<TaskStatus>,

    /// Agreed price
    #[arg(long)]
    pub price: Option<f64>,

    /// Additional information
    #[arg(long)]
    pub info: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Task key
    pub key: RecordKey,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub item: Option<RecordKey>,

    #[arg(long, short = 'n')]
    pub quantity: Option<u32>,

    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long, short = 'd')]
    pub deadline: Option<NaiveDate>,

    /// open, in_progress, done or cancelled
    #[arg(long, short = 's')]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub info: Option<String>,

    /// Remove the item reference
    #[arg(long, conflicts_with = "item")]
    pub clear_item: bool,

    /// Remove the customer
    #[arg(long, conflicts_with = "customer")]
    pub clear_customer: bool,

    /// Remove the deadline
    #[arg(long, conflicts_with = "deadline")]
    pub clear_deadline: bool,

    /// Remove the agreed price
    #[arg(long, conflicts_with = "price")]
    pub clear_price: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Task key
    pub key: RecordKey,

    /// Do not ask for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: TaskCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TaskCommands::List(args) => run_list(args, global),
        TaskCommands::Show(args) => run_show(args, global),
        TaskCommands::New(args) => run_new(args, global),
        TaskCommands::Edit(args) => run_edit(args, global),
        TaskCommands::Delete(args) => run_delete(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let view = ws.load_view()?;
    let today = Local::now().date_naive();

    let mut tasks: Vec<(RecordKey, &Task)> = library.tasks.iter().map(|(k, v)| (*k, v)).collect();

    tasks.retain(|(_, t)| args.status.matches(t.status));
    if let Some(item) = args.item {
        tasks.retain(|(_, t)| t.item == Some(item));
    }
    if args.overdue {
        tasks.retain(|(_, t)| t.is_overdue(today));
    }
    if let Some(ref search) = args.search {
        let needle = search.to_lowercase();
        tasks.retain(|(_, t)| {
            t.name.to_lowercase().contains(&needle)
                || t
                    .customer
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
        });
    }

    if let Some(ref field) = args.sort {
        tasks.sort_by(|(ka, a), (kb, b)| {
            compare_cells(&sort_value(*ka, a, field), &sort_value(*kb, b, field))
        });
    }
    if args.reverse {
        tasks.reverse();
    }

    let limit = args
        .limit
        .or_else(|| (!args.all).then(|| view.limit(Section::Tasks)).flatten());
    if let Some(n) = limit {
        tasks.truncate(n);
    }

    if args.count {
        println!("{}", tasks.len());
        return Ok(());
    }

    let format = ws.format(global, OutputFormat::Tsv);

    if tasks.is_empty() {
        match format {
            OutputFormat::Json => println!("{{}}"),
            OutputFormat::Yaml => println!("{{}}"),
            _ => {
                println!("No tasks found.");
                println!();
                println!("Create one with: {}", style("wkshop task new").yellow());
            }
        }
        return Ok(());
    }

    let selected: BTreeMap<RecordKey, &Task> = tasks.iter().map(|(k, v)| (*k, *v)).collect();
    if print_structured(&selected, format)? {
        return Ok(());
    }

    let columns = if args.columns.is_empty() {
        view.columns(ListKind::Tasks).to_vec()
    } else {
        args.columns
    };
    let rows: Vec<TableRow> = tasks
        .iter()
        .map(|(key, task)| TableRow::build(key, *task, &columns, |r, f| r.field(f)))
        .collect();

    TableFormatter::new(&columns, Task::LABEL).output(&rows, format)
}

fn sort_value(key: RecordKey, task: &Task, field: &str) -> String {
    if field == crate::cli::table::KEY_FIELD {
        key.number().to_string()
    } else {
        task.field(field).unwrap_or_default()
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let task = library.task(args.key)?;

    let format = ws.format(global, OutputFormat::Auto);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => {
            print_structured(task, format)?;
        }
        OutputFormat::Id => println!("{}", args.key),
        _ => {
            let today = Local::now().date_naive();
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(args.key).cyan());
            println!("{}: {}", style("Name").bold(), style(&task.name).yellow());
            println!("{}: {}", style("Status").bold(), task.status);
            match task.item {
                Some(key) => {
                    let name = library
                        .item(key)
                        .map(|i| i.name.clone())
                        .unwrap_or_else(|_| style("missing").red().to_string());
                    println!("{}: {} ({})", style("Item").bold(), style(key).cyan(), name);
                }
                None => println!("{}: -", style("Item").bold()),
            }
            println!("{}: {}", style("Quantity").bold(), task.quantity);
            if let Some(ref customer) = task.customer {
                println!("{}: {}", style("Customer").bold(), customer);
            }
            if let Some(deadline) = task.deadline {
                let text = deadline.format("%Y-%m-%d").to_string();
                if task.is_overdue(today) {
                    println!("{}: {} {}", style("Deadline").bold(), style(text).red(), style("(overdue)").red());
                } else {
                    println!("{}: {}", style("Deadline").bold(), text);
                }
            }
            if let Some(price) = task.price {
                println!("{}: {}", style("Price").bold(), format_amount(price));
            }
            println!("{}", style("─".repeat(60)).dim());
            if task.ad_info != NOT_AVAILABLE {
                println!();
                println!("{}", task.ad_info);
                println!();
                println!("{}", style("─".repeat(60)).dim());
            }
            println!(
                "{}: {}",
                style("Created").dim(),
                task.created.format("%Y-%m-%d %H:%M")
            );
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let draft = TaskDraft {
        name: args.name,
        item: args.item,
        quantity: args.quantity,
        customer: args.customer,
        deadline: args.deadline,
        status: args.status,
        price: args.price,
        ad_info: args.info,
    };
    let name = draft.name.clone();
    let key = ws.modify(|lib| lib.add_task(draft))?;

    if global.quiet {
        println!("{}", key);
    } else {
        success(
            global,
            format!("Created task {} {}", style(key).cyan(), style(name).yellow()),
        );
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let patch = TaskPatch {
        name: args.name,
        item: clearable(args.item, args.clear_item),
        quantity: args.quantity,
        customer: clearable(args.customer, args.clear_customer),
        deadline: clearable(args.deadline, args.clear_deadline),
        status: args.status,
        price: clearable(args.price, args.clear_price),
        ad_info: args.info,
    };
    if patch.is_empty() {
        return Err(miette::miette!(
            help = "Pass at least one field to change, e.g. --status done",
            "Nothing to change"
        ));
    }

    let ws = Workspace::open(global)?;
    ws.modify(|lib| lib.update_task(args.key, patch))?;
    success(global, format!("Updated task {}", style(args.key).cyan()));
    Ok(())
}

/// `--clear-<field>` wins over an unset value flag
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let task = library.task(args.key)?;

    if !ws.confirm_delete(&format!("task {} ({})", args.key, task.name), args.yes)? {
        return Ok(());
    }

    let removed = ws.modify(|lib| lib.delete_task(args.key))?;
    success(
        global,
        format!(
            "Deleted task {} {}",
            style(args.key).cyan(),
            style(removed.name).dim()
        ),
    );
    Ok(())
}
