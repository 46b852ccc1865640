//! Output formatting for CLI
//!
//! Rows (phase reports, resource classification) go through `print_rows`,
//! readiness results through `print_structured`. Progress lines carry a
//! coloured mark and are only printed in table mode.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Table,
        }
    }

    pub fn is_table(self) -> bool {
        self == OutputFormat::Table
    }
}

/// Progress mark in front of a status line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mark {
    /// A phase was applied or deployments became ready
    Done,
    /// Resources that no phase will apply
    Skipped,
    Failed,
}

impl Mark {
    fn paint(self, message: &str) -> (ColoredString, ColoredString) {
        match self {
            Mark::Done => ("✓".green().bold(), message.green()),
            Mark::Skipped => ("⚠".yellow().bold(), message.yellow()),
            Mark::Failed => ("✗".red().bold(), message.red()),
        }
    }
}

/// Print a status line. Failures go to stderr.
pub fn print_mark(mark: Mark, message: &str) {
    let (symbol, text) = mark.paint(message);
    match mark {
        Mark::Failed => eprintln!("{} {}", symbol, text),
        Mark::Done | Mark::Skipped => println!("{} {}", symbol, text),
    }
}

/// Print rows as a table, or as a JSON/YAML list. `empty` is shown instead
/// of an empty table.
pub fn print_rows<T: Tabled + Serialize>(
    rows: Vec<T>,
    format: OutputFormat,
    empty: &str,
) -> anyhow::Result<()> {
    if !format.is_table() {
        return print_structured(&rows, format);
    }

    if rows.is_empty() {
        println!("{}", empty.yellow());
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

/// Print a serializable value as YAML, or as pretty JSON for every other format
pub fn print_structured<T: Serialize + ?Sized>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Table | OutputFormat::Json => serde_json::to_string_pretty(data)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yml"), OutputFormat::Yaml);
        assert_eq!(OutputFormat::parse("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::parse("wide"), OutputFormat::Table);
        assert!(OutputFormat::parse("").is_table());
    }

    #[test]
    fn test_marks_keep_message_text() {
        colored::control::set_override(false);
        for mark in [Mark::Done, Mark::Skipped, Mark::Failed] {
            let (_, text) = mark.paint("crds phase applied (3 resources)");
            assert_eq!(text.to_string(), "crds phase applied (3 resources)");
        }
        colored::control::unset_override();
    }
}
