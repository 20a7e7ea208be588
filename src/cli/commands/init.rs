//! `wkshop init` command - Initialize a new workspace

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::project::{Project, ProjectError, LIBRARY_FILE};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Reinitialize even if data.json already exists (the old file is backed up)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    // Create directory if it doesn't exist
    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        backup_existing(&path)?;
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized workshop ledger at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created workspace structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Add your first item",
                style("wkshop item new \"Oak stool\"").yellow()
            );
            println!(
                "  {} Record an order",
                style("wkshop task new \"Cafe chairs\" --item 1").yellow()
            );
            println!("  {} List items", style("wkshop item list").yellow());
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Workshop ledger already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to reinitialize",
                style("wkshop init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

/// Keep a numbered copy of a library that `--force` is about to replace
fn backup_existing(path: &Path) -> Result<()> {
    let library = path.join(LIBRARY_FILE);
    if !library.is_file() {
        return Ok(());
    }

    let project = Project::locate(Some(path)).map_err(|e| miette::miette!("{}", e))?;
    let config = Config::load(Some(&project));
    if let Some(entry) = config.backup_store(&project).snapshot(&library).into_diagnostic()? {
        println!(
            "{} Backed up existing {} as {}",
            style("✓").green(),
            LIBRARY_FILE,
            style(entry.path.display()).dim()
        );
    }
    Ok(())
}

fn print_structure(root: &Path) {
    let entries = ["data.json", "config.json", ".wkshop.yaml", "Backups/"];

    for entry in entries {
        let full_path = root.join(entry);
        if full_path.exists() {
            let prefix = if entry.ends_with('/') { "📁" } else { "📄" };
            println!("  {} {}", prefix, style(entry).dim());
        }
    }
}
