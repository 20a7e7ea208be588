//! `wkshop check` and `wkshop renumber` commands

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{confirm, success, Workspace};
use crate::cli::table::print_structured;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::library::{Issue, Severity};

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Exit with an error on warnings too
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct RenumberArgs {
    /// Apply without asking for confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Only show what would change
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct IssueListing<'a> {
    severity: String,
    location: &'a str,
    message: &'a str,
}

pub fn run_check(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let issues = library.check();

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = issues.len() - errors;

    let format = ws.format(global, OutputFormat::Auto);
    let listings: Vec<IssueListing> = issues
        .iter()
        .map(|i| IssueListing {
            severity: i.severity.to_string(),
            location: &i.location,
            message: &i.message,
        })
        .collect();
    if !print_structured(&listings, format)? {
        print_issues(&issues, global);
    }

    if errors > 0 || (args.strict && warnings > 0) {
        return Err(miette::miette!(
            help = "`wkshop renumber` fixes numbering gaps and mismatched ids",
            "{} error(s), {} warning(s)",
            errors,
            warnings
        ));
    }
    Ok(())
}

fn print_issues(issues: &[Issue], global: &GlobalOpts) {
    if issues.is_empty() {
        success(global, "No problems found");
        return;
    }

    for issue in issues {
        let marker = match issue.severity {
            Severity::Error => style("✗").red(),
            Severity::Warning => style("!").yellow(),
        };
        println!(
            "{} {} {}",
            marker,
            style(&issue.location).cyan(),
            issue.message
        );
    }
    println!();
    println!("{} problem(s) found", style(issues.len()).cyan());
}

pub fn run_renumber(args: RenumberArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut preview = ws.load_library()?;
    let plan = preview.renumber();

    if plan.is_empty() {
        success(global, "Keys are already contiguous");
        return Ok(());
    }

    if !global.quiet {
        println!("{}", style("Planned changes:").bold());
        for (old, new) in &plan.items {
            println!("  Items {} {} {}", style(old).cyan(), style("→").dim(), style(new).cyan());
        }
        for (old, new) in &plan.tasks {
            println!("  Tasks {} {} {}", style(old).cyan(), style("→").dim(), style(new).cyan());
        }
        if plan.sub_records > 0 {
            println!("  {} sub-record id(s) renumbered", style(plan.sub_records).cyan());
        }
        for (task, item) in &plan.detached {
            println!(
                "  Tasks {} {} reference to missing {} cleared",
                style(task).cyan(),
                style("→").dim(),
                style(item).yellow()
            );
        }
        println!();
    }

    if args.dry_run {
        return Ok(());
    }
    if !args.yes && !confirm("Apply renumbering?")? {
        return Ok(());
    }

    let applied = ws.modify(|lib| Ok(lib.renumber()))?;
    tracing::info!(
        items = applied.items.len(),
        tasks = applied.tasks.len(),
        sub_records = applied.sub_records,
        detached = applied.detached.len(),
        "renumbered library"
    );
    success(global, "Renumbered records (previous state kept as a backup)");
    Ok(())
}
