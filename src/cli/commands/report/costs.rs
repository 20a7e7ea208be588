//! Cost and margin report

use miette::Result;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{truncate_str, Workspace};
use crate::cli::GlobalOpts;
use crate::core::entity::format_amount;

use super::write_output;

#[derive(clap::Args, Debug)]
pub struct CostsArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Only items sold below cost
    #[arg(long)]
    pub losses_only: bool,
}

pub fn run(args: CostsArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    let library = ws.load_library()?;

    let mut items: Vec<_> = library.items.iter().collect();
    if args.losses_only {
        items.retain(|(_, item)| item.margin() < 0.0);
    }

    let mut output = String::new();
    output.push_str("# Cost Report\n\n");

    let mut builder = Builder::default();
    builder.push_record([
        "ID",
        "Name",
        "Materials",
        "Work Materials",
        "Total Cost",
        "Price",
        "Margin",
        "Margin %",
        "Time",
    ]);

    let mut total_cost = 0.0;
    let mut total_price = 0.0;
    for (key, item) in &items {
        total_cost += item.total_cost();
        total_price += item.sell_cost;

        let margin_pct = if item.sell_cost > 0.0 {
            format!("{:.1}%", item.margin() / item.sell_cost * 100.0)
        } else {
            "-".to_string()
        };
        builder.push_record([
            key.to_string(),
            truncate_str(&item.name, 30),
            format_amount(item.material_cost),
            format_amount(item.work_material_cost()),
            format_amount(item.total_cost()),
            format_amount(item.sell_cost),
            format_amount(item.margin()),
            margin_pct,
            item.total_time().to_string(),
        ]);
    }
    output.push_str(&builder.build().with(Style::markdown()).to_string());

    // Summary
    output.push_str("\n\n## Summary\n\n");
    output.push_str(&format!("- **Items:** {}\n", items.len()));
    output.push_str(&format!("- **Total Cost:** {}\n", format_amount(total_cost)));
    output.push_str(&format!("- **Total Price:** {}\n", format_amount(total_price)));
    output.push_str(&format!(
        "- **Total Margin:** {}\n",
        format_amount(total_price - total_cost)
    ));
    let losses = items.iter().filter(|(_, i)| i.margin() < 0.0).count();
    output.push_str(&format!("- **Sold Below Cost:** {}\n", losses));

    write_output(&output, args.output)
}
