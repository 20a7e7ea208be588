//! Schedule of active tasks by deadline

use chrono::Local;
use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{truncate_str, Workspace};
use crate::cli::GlobalOpts;
use crate::core::entity::format_amount;

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct ScheduleArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn run(args: ScheduleArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;
    let today = Local::now().date_naive();

    let mut tasks: Vec<_> = library
        .tasks
        .iter()
        .filter(|(_, t)| t.status.is_active())
        .collect();
    // Undated tasks go last
    tasks.sort_by_key(|(key, t)| (t.deadline.is_none(), t.deadline, **key));

    let mut output = String::new();
    output.push_str("# Schedule\n\n");

    let mut builder = Builder::default();
    builder.push_record(["ID", "Task", "Item", "Qty", "Customer", "Deadline", "Status", "Price"]);

    let mut overdue = 0;
    for (key, task) in &tasks {
        let item = task
            .item
            .map(|k| match library.item(k) {
                Ok(item) => format!("{} ({})", k, truncate_str(&item.name, 20)),
                Err(_) => format!("{} (missing)", k),
            })
            .unwrap_or_else(|| "-".to_string());
        let deadline = match task.deadline {
            Some(d) if task.is_overdue(today) => {
                overdue += 1;
                format!("**{}**", d.format("%Y-%m-%d"))
            }
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => "-".to_string(),
        };
        builder.push_record([
            key.to_string(),
            truncate_str(&task.name, 30),
            item,
            task.quantity.to_string(),
            task.customer.clone().unwrap_or_else(|| "-".to_string()),
            deadline,
            task.status.to_string(),
            task.price.map(format_amount).unwrap_or_else(|| "-".to_string()),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());

    output.push_str("\n\n## Summary\n\n");
    output.push_str(&format!("- **Active Tasks:** {}\n", tasks.len()));
    output.push_str(&format!("- **Overdue:** {}\n", overdue));
    let booked: f64 = tasks.iter().filter_map(|(_, t)| t.price).sum();
    output.push_str(&format!("- **Booked Value:** {}\n", format_amount(booked)));

    write_output(&output, args.output)
}
