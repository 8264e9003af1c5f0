//! Output formatting utilities for the CLI.
//!
//! Everything here writes to stderr: stdout may carry framed records.

pub mod table;

pub use table::TableFormatter;

use serde::Serialize;

use crate::domain::models::{EngineReport, FilterReport};

/// Result printable as a table or as JSON
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` to stderr in the requested format
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        eprintln!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        eprintln!("{}", result.to_human());
    }
}

impl CommandOutput for EngineReport {
    fn to_human(&self) -> String {
        TableFormatter::new().format_engine_report(self)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl CommandOutput for FilterReport {
    fn to_human(&self) -> String {
        TableFormatter::new().format_filter_report(self)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
