use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use dcfeas_core::overrides::merge::{apply_overrides, CellOverride};
use dcfeas_core::projection::cashflow::{self, ProjectAssumptions};

use crate::input;

/// Arguments for the cell override merge
#[derive(Args)]
pub struct OverridesArgs {
    /// Path to a JSON or YAML file with `project` and `overrides` sections
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverridesDocument {
    project: ProjectAssumptions,
    overrides: Vec<CellOverride>,
}

pub fn run_overrides(args: OverridesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: OverridesDocument = input::stdin::read_typed(args.input.as_deref())?
        .ok_or("--input <file> or stdin required (project + overrides)")?;

    let projection = cashflow::project(&doc.project)?;
    let rows = apply_overrides(
        &projection,
        doc.project.total_capex,
        doc.project.discount_rate,
        &doc.overrides,
    )?;
    Ok(serde_json::to_value(rows)?)
}
