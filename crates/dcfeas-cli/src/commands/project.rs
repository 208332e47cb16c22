use clap::Args;
use serde_json::Value;

use dcfeas_core::projection::cashflow::{self, ProjectAssumptions};

use crate::input;

/// Arguments for the unlevered projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to a JSON or YAML file with project assumptions (or pipe to stdin)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions: ProjectAssumptions = input::stdin::read_typed(args.input.as_deref())?
        .ok_or("--input <file> or stdin required for the projection")?;
    let result = cashflow::analyze_project(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}
