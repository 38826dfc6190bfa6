//! Output formatting for CLI

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Print rows as JSON, a table, or one line per row
pub fn print_rows<T, F>(rows: Vec<T>, format: &str, line: F) -> anyhow::Result<()>
where
    T: Serialize + Tabled,
    F: Fn(&T) -> String,
{
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("(none)");
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("(none)");
            }
            for row in &rows {
                println!("{}", line(row));
            }
        }
    }
    Ok(())
}

/// Print a single value; text and table formats use the given rendering
pub fn print_value<T: Serialize>(value: &T, format: &str, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table | OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// Whether decorations (progress bars, headings) should be shown
pub fn is_interactive(format: &str) -> bool {
    !matches!(OutputFormat::from(format), OutputFormat::Json)
}
