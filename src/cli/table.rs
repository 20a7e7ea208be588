//! Table formatting for CLI list commands
//!
//! Columns come from `config.json`: each pairs a heading with the JSON field
//! it reads. The pseudo-field `id` is the record's key.

use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::core::view::Column;

/// Widest a TSV column may grow before its cells are truncated
const MAX_COLUMN_WIDTH: usize = 40;

/// Field name that resolves to the record key instead of a JSON field
pub const KEY_FIELD: &str = "id";

/// A row of rendered cells
#[derive(Debug, Clone)]
pub struct TableRow {
    pub key: String,
    pub cells: Vec<String>,
}

impl TableRow {
    /// Render `columns` for one record, looking fields up with `field`
    pub fn build<T: ?Sized>(
        key: impl ToString,
        record: &T,
        columns: &[Column],
        field: impl Fn(&T, &str) -> Option<String>,
    ) -> Self {
        let key = key.to_string();
        let cells = columns
            .iter()
            .map(|c| {
                if c.field == KEY_FIELD {
                    key.clone()
                } else {
                    field(record, &c.field).unwrap_or_else(|| "-".to_string())
                }
            })
            .collect();
        Self { key, cells }
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [Column],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [Column], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    /// Omit the "N item(s) found" footer
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    ///
    /// Structured formats (JSON, YAML) are the caller's job since they
    /// serialize whole records rather than columns.
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => self.output_csv(rows),
            OutputFormat::Md => {
                print!("{}", self.to_markdown(rows));
                Ok(())
            }
            OutputFormat::Id => {
                for row in rows {
                    println!("{}", row.key);
                }
                Ok(())
            }
            _ => {
                self.output_tsv(rows);
                Ok(())
            }
        }
    }

    /// Dynamic column widths based on content, capped at [`MAX_COLUMN_WIDTH`]
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let content = rows
                    .iter()
                    .filter_map(|r| r.cells.get(i))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0);
                col.heading.chars().count().max(content).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(&col.heading).bold(), width = *w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .zip(&widths)
                .zip(self.columns)
                .map(|((cell, w), col)| {
                    let text = truncate_str(cell, *w);
                    if col.field == KEY_FIELD {
                        format!("{:<width$}", style(text).cyan(), width = *w)
                    } else {
                        format!("{:<width$}", text, width = *w)
                    }
                })
                .collect();
            println!("{}", cells.join(" ").trim_end());
        }

        if self.show_summary {
            println!();
            println!("{} {}(s) found", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_csv(&self, rows: &[TableRow]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        writer
            .write_record(self.columns.iter().map(|c| c.field.as_str()))
            .into_diagnostic()?;
        for row in rows {
            writer.write_record(&row.cells).into_diagnostic()?;
        }
        writer.flush().into_diagnostic()
    }

    /// Render rows as a markdown table
    pub fn to_markdown(&self, rows: &[TableRow]) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.heading.clone()));
        for row in rows {
            builder.push_record(row.cells.iter().map(|c| c.replace('|', "\\|")));
        }
        let mut table = builder.build().with(Style::markdown()).to_string();
        table.push('\n');
        table
    }
}

/// Order two rendered cells, numerically when both are numbers
pub fn compare_cells(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Print a serializable value as JSON or YAML
///
/// Returns `false` for formats that are not structured so the caller can
/// fall back to its own rendering.
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::json_field;
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![Column::new("ID", "id"), Column::new("NAME", "name"), Column::new("QTY", "qty")]
    }

    #[test]
    fn test_row_uses_key_for_id_field() {
        let record = json!({"name": "Stool", "id": 99});
        let row = TableRow::build("id_3", &record, &columns(), |r, k| json_field(r, k));
        assert_eq!(row.cells, vec!["id_3", "Stool", "-"]);
    }

    #[test]
    fn test_widths_capped() {
        let cols = columns();
        let formatter = TableFormatter::new(&cols, "item");
        let rows = vec![TableRow {
            key: "id_1".to_string(),
            cells: vec!["id_1".to_string(), "x".repeat(80), "2".to_string()],
        }];
        assert_eq!(formatter.calculate_widths(&rows), vec![4, MAX_COLUMN_WIDTH, 3]);
    }

    #[test]
    fn test_compare_cells() {
        use std::cmp::Ordering;
        assert_eq!(compare_cells("9.50", "10.00"), Ordering::Less);
        assert_eq!(compare_cells("oak", "Ash"), Ordering::Greater);
        assert_eq!(compare_cells("-", "-"), Ordering::Equal);
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let cols = columns();
        let formatter = TableFormatter::new(&cols, "item");
        let rows = vec![TableRow {
            key: "id_1".to_string(),
            cells: vec!["id_1".to_string(), "a|b".to_string(), "1".to_string()],
        }];
        let md = formatter.to_markdown(&rows);
        assert!(md.contains("| ID "));
        assert!(md.contains("a\\|b"));
    }
}
