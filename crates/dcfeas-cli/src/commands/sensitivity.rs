use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use dcfeas_core::capital_structure::sensitivity::build_sensitivity_matrix;
use dcfeas_core::projection::cashflow;

use super::invest::read_deal;

/// Arguments for the debt ratio x exit multiple sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML file with `project` and `financing` sections
    #[arg(long)]
    pub input: Option<String>,

    /// Exit multiples to sweep (comma-separated, e.g. "14,16,18")
    #[arg(long, value_delimiter = ',')]
    pub exit_multiples: Option<Vec<Decimal>>,
}

#[derive(Debug, Serialize)]
struct SensitivityOutput {
    debt_ratios: Vec<Decimal>,
    exit_multiples: Vec<Decimal>,
    results: Vec<SensitivityRow>,
}

#[derive(Debug, Serialize)]
struct SensitivityRow {
    debt_ratio: Decimal,
    exit_multiple: Decimal,
    equity_irr: Option<Decimal>,
    converged: bool,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut deal = read_deal(args.input.as_deref())?;
    if let Some(multiples) = args.exit_multiples {
        deal.financing.sensitivity_grid.exit_multiples = multiples;
    }

    let projection = cashflow::project(&deal.project)?;
    let matrix = build_sensitivity_matrix(&deal.project, &projection, &deal.financing)?;

    let results = matrix
        .cells
        .iter()
        .map(|c| SensitivityRow {
            debt_ratio: c.debt_ratio,
            exit_multiple: c.exit_multiple,
            equity_irr: c.equity_irr.best_estimate(),
            converged: c.equity_irr.is_converged(),
        })
        .collect();

    let output = SensitivityOutput {
        debt_ratios: matrix.debt_ratios,
        exit_multiples: matrix.exit_multiples,
        results,
    };
    Ok(serde_json::to_value(output)?)
}
