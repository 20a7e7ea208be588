//! `wkshop backup` command - Numbered backups of the workspace documents

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::helpers::{success, Workspace};
use crate::cli::table::{print_structured, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::view::Column;
use crate::core::LoadSource;

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// List stored backups
    List(ListArgs),

    /// Back up the current documents now
    Create(CreateArgs),

    /// Replace a document with one of its backups
    Restore(RestoreArgs),
}

/// Which workspace document a backup belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    /// data.json (items and tasks)
    Data,
    /// config.json (display settings)
    Config,
}

impl DocumentKind {
    fn path(self, ws: &Workspace) -> PathBuf {
        match self {
            DocumentKind::Data => ws.project.library_path(),
            DocumentKind::Config => ws.project.view_config_path(),
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Data => crate::core::project::LIBRARY_FILE,
            DocumentKind::Config => crate::core::project::VIEW_CONFIG_FILE,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only backups of this document (default: both)
    #[arg(long)]
    pub file: Option<DocumentKind>,
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Only back up this document (default: both)
    #[arg(long)]
    pub file: Option<DocumentKind>,
}

#[derive(clap::Args, Debug)]
pub struct RestoreArgs {
    /// Backup version to restore
    #[arg(id = "backup_version", value_name = "VERSION")]
    pub version: u32,

    /// Document to restore
    #[arg(long, default_value = "data")]
    pub file: DocumentKind,
}

/// One line of `backup list`
#[derive(Debug, Serialize)]
struct BackupListing {
    version: u32,
    file: String,
    size: Option<u64>,
    modified: Option<String>,
}

pub fn run(cmd: BackupCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        BackupCommands::List(args) => run_list(args, global),
        BackupCommands::Create(args) => run_create(args, global),
        BackupCommands::Restore(args) => run_restore(args, global),
    }
}

fn selected(file: Option<DocumentKind>) -> Vec<DocumentKind> {
    match file {
        Some(kind) => vec![kind],
        None => vec![DocumentKind::Data, DocumentKind::Config],
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let store = ws.config.backup_store(&ws.project);

    let mut listings = Vec::new();
    for kind in selected(args.file) {
        for entry in store.entries(kind.file_name()).into_diagnostic()? {
            listings.push(BackupListing {
                version: entry.version,
                size: entry.size(),
                modified: entry.modified().map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string()),
                file: entry.file_name,
            });
        }
    }

    let format = ws.format(global, OutputFormat::Tsv);
    if print_structured(&listings, format)? {
        return Ok(());
    }

    if listings.is_empty() {
        println!("No backups found in {}", style(store.dir().display()).cyan());
        return Ok(());
    }

    let columns = vec![
        Column::new("VERSION", "version"),
        Column::new("FILE", "file"),
        Column::new("SIZE", "size"),
        Column::new("MODIFIED", "modified"),
    ];
    let rows: Vec<TableRow> = listings
        .iter()
        .map(|l| {
            TableRow::build(format!("{}__{}", l.version, l.file), l, &columns, |r, f| {
                crate::core::entity::json_field(r, f)
            })
        })
        .collect();
    TableFormatter::new(&columns, "backup").output(&rows, format)?;

    if !global.quiet && format == OutputFormat::Tsv {
        println!(
            "Keeping the newest {} per file in {}",
            style(store.retention()).cyan(),
            style(store.dir().display()).dim()
        );
    }
    Ok(())
}

fn run_create(args: CreateArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let store = ws.config.backup_store(&ws.project);

    for kind in selected(args.file) {
        match store.snapshot(&kind.path(&ws)).into_diagnostic()? {
            Some(entry) => success(
                global,
                format!(
                    "Backed up {} as version {}",
                    style(kind.file_name()).cyan(),
                    style(entry.version).yellow()
                ),
            ),
            None => {
                if !global.quiet {
                    println!(
                        "{} {} does not exist, skipped",
                        style("!").yellow(),
                        kind.file_name()
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_restore(args: RestoreArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let store = ws.config.backup_store(&ws.project);
    let target = args.file.path(&ws);

    let entry = store.restore(&target, args.version).into_diagnostic()?;
    success(
        global,
        format!(
            "Restored {} from version {}",
            style(args.file.file_name()).cyan(),
            style(entry.version).yellow()
        ),
    );

    // Warn when the restored file itself does not parse
    let source = match args.file {
        DocumentKind::Data => ws.library.load()?.1,
        DocumentKind::Config => ws.view.load()?.1,
    };
    if let LoadSource::Backup(version) = source {
        eprintln!(
            "{} Restored file does not parse; reads will fall back to version {}",
            style("!").yellow(),
            version
        );
    }
    Ok(())
}
