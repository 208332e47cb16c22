use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use dcfeas_core::capital_structure::engine;
use dcfeas_core::capital_structure::financing::FinancingAssumptions;
use dcfeas_core::projection::cashflow::{self, ProjectAssumptions};

use crate::input;

/// Project assumptions plus the financing layered on them.
#[derive(Debug, Deserialize)]
pub struct DealInput {
    pub project: ProjectAssumptions,
    pub financing: FinancingAssumptions,
}

/// Arguments for the capital structure analysis
#[derive(Args)]
pub struct InvestArgs {
    /// Path to a JSON or YAML file with `project` and `financing` sections
    #[arg(long)]
    pub input: Option<String>,

    /// Override the debt ratio from the input file
    #[arg(long)]
    pub debt_ratio: Option<Decimal>,

    /// Override the exit EV/EBITDA multiple from the input file
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,
}

pub fn read_deal(path: Option<&str>) -> Result<DealInput, Box<dyn std::error::Error>> {
    let deal: DealInput = input::stdin::read_typed(path)?
        .ok_or("--input <file> or stdin required (project + financing)")?;
    Ok(deal)
}

pub fn run_invest(args: InvestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut deal = read_deal(args.input.as_deref())?;
    if let Some(dr) = args.debt_ratio {
        deal.financing.debt_ratio = dr;
    }
    if let Some(m) = args.exit_multiple {
        deal.financing.exit_ebitda_multiple = m;
    }

    let projection = cashflow::project(&deal.project)?;
    let result = engine::analyze_investment(&deal.project, &projection, &deal.financing)?;
    Ok(serde_json::to_value(result)?)
}
