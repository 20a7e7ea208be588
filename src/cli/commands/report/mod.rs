//! `wkshop report` command - Generate markdown reports

mod costs;
mod schedule;

use clap::Subcommand;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::cli::GlobalOpts;

pub use costs::CostsArgs;
pub use schedule::ScheduleArgs;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Cost and margin breakdown per item
    Costs(CostsArgs),

    /// Active tasks ordered by deadline
    Schedule(ScheduleArgs),
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Costs(args) => costs::run(args, global),
        ReportCommands::Schedule(args) => schedule::run(args, global),
    }
}

/// Write report output to a file or stdout
pub(crate) fn write_output(content: &str, output_path: Option<PathBuf>) -> Result<()> {
    match output_path {
        Some(path) => {
            let file = File::create(&path).into_diagnostic()?;
            let mut writer = BufWriter::new(file);
            writer.write_all(content.as_bytes()).into_diagnostic()?;
            writer.flush().into_diagnostic()?;
            println!("Report written to: {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
