//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use provision_lib::policy::{StatusColor, StatusDisplay};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default); artifacts are printed raw
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to encode JSON: {}", e)),
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message; stdout stays reserved for artifacts
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message; stdout stays reserved for artifacts
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Colorize a status label with its display color
pub fn color_status(display: StatusDisplay) -> String {
    let label = display.label;
    match display.color {
        StatusColor::Green => label.green().to_string(),
        StatusColor::Yellow => label.yellow().to_string(),
        StatusColor::Red => label.red().to_string(),
        StatusColor::Blue => label.blue().to_string(),
        StatusColor::Gray => label.dimmed().to_string(),
    }
}

/// Format an optional percentage reading
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v),
        None => "-".to_string(),
    }
}

/// Format an optional temperature reading
pub fn format_celsius(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}°C", v),
        None => "-".to_string(),
    }
}

/// Color an uptime percentage by band
pub fn color_uptime(percent: f64) -> String {
    let formatted = format!("{:.1}%", percent);
    if percent >= 99.0 {
        formatted.green().to_string()
    } else if percent >= 90.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_readings() {
        assert_eq!(format_percent(Some(42.25)), "42.2%");
        assert_eq!(format_percent(None), "-");
        assert_eq!(format_celsius(Some(71.6)), "72°C");
        assert_eq!(format_celsius(None), "-");
    }

    #[test]
    fn test_color_keeps_label() {
        colored::control::set_override(false);
        let display = StatusDisplay {
            label: "Running",
            color: StatusColor::Green,
        };
        assert_eq!(color_status(display), "Running");
        assert_eq!(color_uptime(50.0), "50.0%");
    }
}
