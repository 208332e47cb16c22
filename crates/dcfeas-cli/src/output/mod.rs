pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The headline number of a status-tagged value such as an IRR solution
/// (`rate` / `best_estimate`) or a payback (`years`).
pub(crate) fn tagged_scalar(map: &Map<String, Value>) -> Option<&Value> {
    if !map.contains_key("status") {
        return None;
    }
    ["rate", "best_estimate", "years"]
        .iter()
        .find_map(|k| map.get(*k))
        .or_else(|| map.get("status"))
}
