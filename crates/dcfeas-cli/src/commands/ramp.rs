use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcfeas_core::projection::ramp::{self, LinearRampInput};

/// Arguments for the occupancy ramp generator
#[derive(Args)]
pub struct RampArgs {
    /// Occupancy in year 1
    #[arg(long)]
    pub start: Decimal,

    /// Occupancy reached at the end of the ramp
    #[arg(long)]
    pub target: Decimal,

    /// Year in which the target is first reached
    #[arg(long)]
    pub ramp_years: u32,

    /// Project life in years
    #[arg(long)]
    pub life: u32,
}

pub fn run_ramp(args: RampArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let occupancy = ramp::linear_ramp(&LinearRampInput {
        start_occupancy: args.start,
        target_occupancy: args.target,
        ramp_years: args.ramp_years,
        project_life_years: args.life,
    })?;

    let rows: Vec<Value> = occupancy
        .iter()
        .enumerate()
        .map(|(idx, occ)| serde_json::json!({ "year": idx + 1, "occupancy": occ }))
        .collect();
    Ok(Value::Array(rows))
}
