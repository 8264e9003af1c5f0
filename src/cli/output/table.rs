//! Table output formatting for shutdown reports
//!
//! Key/value tables rendered with comfy-table. Colors are dropped when
//! `NO_COLOR` is set or the terminal is dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{EngineReport, FilterReport};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self { use_colors, max_width }
    }

    /// Format the final report of a selection engine run
    pub fn format_engine_report(&self, report: &EngineReport) -> String {
        let mut table = self.create_base_table();
        let stats = &report.stats;

        table.add_row(vec![self.label("Strategy"), Cell::new(report.strategy)]);
        table.add_row(vec![self.label("State"), Cell::new(report.state.as_str())]);
        table.add_row(vec![self.label("Received"), Cell::new(stats.received)]);
        table.add_row(vec![
            self.label("Forwarded"),
            self.highlight(format!("{} ({:.2}%)", stats.forwarded, report.forwarded_pct), Color::Green),
        ]);
        table.add_row(vec![self.label("Timeouts"), self.counter(stats.timeouts)]);
        table.add_row(vec![self.label("Send failures"), self.counter(stats.send_failures)]);
        table.add_row(vec![self.label("Malformed"), self.counter(stats.malformed)]);
        table.add_row(vec![
            self.label("End marker forwarded"),
            Cell::new(if stats.end_marker_forwarded { "yes" } else { "no" }),
        ]);
        table.add_row(vec![
            self.label("Elapsed"),
            Cell::new(format!("{:.3}s", report.elapsed.as_secs_f64())),
        ]);

        table.to_string()
    }

    /// Format the final report of a blacklist filter run
    pub fn format_filter_report(&self, report: &FilterReport) -> String {
        let mut table = self.create_base_table();

        table.add_row(vec![self.label("Received"), Cell::new(report.received)]);
        table.add_row(vec![self.label("Matched"), self.highlight(report.matched, Color::Red)]);
        table.add_row(vec![self.label("Unmatched"), Cell::new(report.unmatched)]);
        table.add_row(vec![self.label("Timeouts"), self.counter(report.timeouts)]);
        table.add_row(vec![self.label("Malformed"), self.counter(report.malformed)]);

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }

    fn label(&self, text: &str) -> Cell {
        Cell::new(text).add_attribute(Attribute::Bold)
    }

    fn highlight<T: ToString>(&self, value: T, color: Color) -> Cell {
        if self.use_colors {
            Cell::new(value).fg(color)
        } else {
            Cell::new(value)
        }
    }

    /// Non-zero error counters stand out
    fn counter(&self, value: u64) -> Cell {
        if value > 0 {
            self.highlight(value, Color::Yellow)
        } else {
            Cell::new(value)
        }
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if terminal supports colors
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    console::colors_enabled_stderr()
}
