//! `wkshop config` command - Settings and display configuration
//!
//! Settings (`.wkshop.yaml` and the global config file) control tool
//! behaviour. Display configuration (`config.json`) controls titles, row
//! limits and table columns, and is edited through the backup store.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::{success, Workspace};
use crate::cli::table::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::{typed_value, VALID_KEYS};
use crate::core::project::Project;
use crate::core::view::{Column, ListKind, Section};
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current settings
    Show(ShowArgs),

    /// Set a setting
    Set(SetArgs),

    /// Unset (remove) a setting
    Unset(UnsetArgs),

    /// Show paths to settings files
    Path,

    /// List all available setting keys
    Keys,

    /// Show or change the columns of a list
    Columns(ColumnsArgs),

    /// Show or change the title, default list and row limits
    View(ViewArgs),
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Setting key (see `wkshop config keys`)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) settings instead of the workspace
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Setting key to remove
    pub key: String,

    /// Remove from global (user) settings instead of the workspace
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct ColumnsArgs {
    /// List whose columns to show or change
    pub list: ListKind,

    /// New columns, as HEADING=field or field
    pub columns: Vec<Column>,

    /// Restore the built-in columns
    #[arg(long, conflicts_with = "columns")]
    pub reset: bool,
}

#[derive(clap::Args, Debug)]
pub struct ViewArgs {
    /// Workshop title
    #[arg(long)]
    pub title: Option<String>,

    /// List shown by default
    #[arg(long)]
    pub default_view: Option<Section>,

    /// Maximum rows in item lists (0 = no limit)
    #[arg(long)]
    pub items_limit: Option<usize>,

    /// Maximum rows in task lists (0 = no limit)
    #[arg(long)]
    pub tasks_limit: Option<usize>,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
        ConfigCommands::Columns(args) => run_columns(args, global),
        ConfigCommands::View(args) => run_view(args, global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = Project::locate(global.project.as_deref()).ok();
    let config = Config::load(project.as_ref());

    // If a specific key is requested, show just that value
    if let Some(key) = &args.key {
        return match config.get(key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Settings").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, config.get(key).as_deref());
    }
    println!();
    println!("  {} {}", style("effective retention:").dim(), config.retention());

    println!();
    println!("{}", style("Settings Sources (in priority order):").dim());
    println!("  1. Environment variables (WKSHOP_RETENTION, WKSHOP_FORMAT)");
    println!("  2. Workspace settings (.wkshop.yaml)");
    println!("  3. Global settings (~/.config/wkshop/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let value = typed_value(&args.key, &args.value).map_err(|e| miette::miette!("{}", e))?;
    let config_path = settings_path(args.global, global)?;

    let mut config_map = read_mapping(&config_path)?;
    if let serde_yml::Value::Mapping(map) = &mut config_map {
        map.insert(serde_yml::Value::String(args.key.clone()), value);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    success(
        global,
        format!(
            "Set {} {} {} in {} settings",
            style(&args.key).cyan(),
            style("→").dim(),
            style(&args.value).yellow(),
            scope
        ),
    );
    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = settings_path(args.global, global)?;
    if !config_path.exists() {
        return Err(miette::miette!(
            "Settings file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };
    if !removed {
        return Err(miette::miette!("Key '{}' not found in settings", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "workspace" };
    success(
        global,
        format!("Removed {} from {} settings", style(&args.key).cyan(), scope),
    );
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = global_settings_path()?;

    println!("{}", style("Settings file paths:").bold());
    println!();
    print_path("Global:", &global_path);

    match Project::locate(global.project.as_deref()) {
        Ok(project) => {
            print_path("Workspace:", &project.settings_path());
            print_path("Display:", &project.view_config_path());
        }
        Err(_) => {
            println!(
                "  {} {}",
                style("Workspace:").cyan(),
                style("(not in a workshop workspace)").dim()
            );
        }
    }
    Ok(())
}

fn print_path(label: &str, path: &std::path::Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available setting keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'wkshop config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

fn run_columns(args: ColumnsArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let before = ws.load_view()?;

    if !args.reset && args.columns.is_empty() {
        let columns = before.columns(args.list);
        let format = ws.format(global, OutputFormat::Tsv);
        if print_structured(columns, format)? {
            return Ok(());
        }
        let ids = before.column_ids(args.list);
        for (id, column) in ids.iter().zip(columns) {
            println!(
                "{:<4} {:<24} {}",
                style(id).dim(),
                style(&column.heading).bold(),
                style(&column.field).cyan()
            );
        }
        return Ok(());
    }

    let mut after = before.clone();
    if args.reset {
        after.reset_columns(args.list);
    } else {
        after.set_columns(args.list, args.columns);
    }
    if after == before {
        success(global, format!("Columns of {} unchanged", args.list));
        return Ok(());
    }

    ws.view.save(&before, &after)?;
    success(
        global,
        format!(
            "Set {} column(s) for {}",
            style(after.columns(args.list).len()).cyan(),
            style(args.list).cyan()
        ),
    );
    Ok(())
}

fn run_view(args: ViewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let before = ws.load_view()?;

    let mut after = before.clone();
    if let Some(title) = args.title {
        after.title = title;
    }
    if let Some(section) = args.default_view {
        after.default_view = section;
    }
    if let Some(n) = args.items_limit {
        after.limits.items = (n > 0).then_some(n);
    }
    if let Some(n) = args.tasks_limit {
        after.limits.tasks = (n > 0).then_some(n);
    }

    if after == before {
        let limit = |n: Option<usize>| n.map_or("none".to_string(), |n| n.to_string());
        println!("  {}: {}", style("title").cyan(), style(&after.title).yellow());
        println!("  {}: {}", style("default_view").cyan(), after.default_view);
        println!("  {}: {}", style("items limit").cyan(), limit(after.limit(Section::Items)));
        println!("  {}: {}", style("tasks limit").cyan(), limit(after.limit(Section::Tasks)));
        return Ok(());
    }

    ws.view.save(&before, &after)?;
    success(global, "Updated display configuration");
    Ok(())
}

// Helper functions

fn global_settings_path() -> Result<PathBuf> {
    Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn settings_path(global_scope: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if global_scope {
        global_settings_path()
    } else {
        let project =
            Project::locate(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))?;
        Ok(project.settings_path())
    }
}

/// Read a settings file as a YAML mapping; empty or commented-out files yield an empty one
fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    let parsed: serde_yml::Value =
        serde_yml::from_str(&content).unwrap_or(serde_yml::Value::Mapping(Default::default()));
    if parsed.is_mapping() {
        Ok(parsed)
    } else {
        Ok(serde_yml::Value::Mapping(Default::default()))
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}
