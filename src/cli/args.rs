//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    backup::BackupCommands,
    check::{CheckArgs, RenumberArgs},
    completions::CompletionsArgs,
    config::ConfigCommands,
    init::InitArgs,
    item::ItemCommands,
    material::{MatCommands, StepCommands, WmatCommands},
    report::ReportCommands,
    task::TaskCommands,
};

#[derive(Parser)]
#[command(name = "wkshop")]
#[command(author, version, about = "Workshop ledger")]
#[command(long_about = "Track the items a workshop makes and the tasks ordered from it, stored in a single JSON file with rotating backups.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding data.json)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace
    Init(InitArgs),

    /// Item management (products and their bill of materials)
    #[command(subcommand)]
    Item(ItemCommands),

    /// Materials of an item
    #[command(subcommand)]
    Mat(MatCommands),

    /// Work materials (consumables) of an item
    #[command(subcommand)]
    Wmat(WmatCommands),

    /// Production steps of an item
    #[command(subcommand)]
    Step(StepCommands),

    /// Task management (orders)
    #[command(subcommand)]
    Task(TaskCommands),

    /// List, create and restore numbered backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Check the ledger for numbering gaps and dangling references
    Check(CheckArgs),

    /// Renumber records contiguously
    Renumber(RenumberArgs),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Settings and display configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `auto`, first against the configured default, then `fallback`
    pub fn resolve(self, configured: Option<&str>, fallback: OutputFormat) -> OutputFormat {
        if self != OutputFormat::Auto {
            return self;
        }
        configured
            .and_then(|name| OutputFormat::from_str(name, true).ok())
            .filter(|f| *f != OutputFormat::Auto)
            .unwrap_or(fallback)
    }
}
