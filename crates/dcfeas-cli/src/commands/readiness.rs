use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dcfeas_core::readiness::scoring::{self, ReadinessCriteria, ReadinessInputs};

use crate::input;

/// Arguments for readiness scoring
#[derive(Args)]
pub struct ReadinessArgs {
    /// Path to a JSON or YAML file with `metrics` and optional `criteria`
    #[arg(long)]
    pub input: Option<String>,

    /// Equity IRR as a decimal (omit if undefined)
    #[arg(long, allow_hyphen_values = true)]
    pub equity_irr: Option<Decimal>,

    /// Minimum DSCR across debt-service years
    #[arg(long)]
    pub min_dscr: Option<Decimal>,

    /// Multiple on invested capital
    #[arg(long)]
    pub moic: Option<Decimal>,

    /// Undiscounted payback in years (omit if never reached)
    #[arg(long)]
    pub payback_years: Option<Decimal>,

    /// Project NPV
    #[arg(long, allow_hyphen_values = true)]
    pub npv: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReadinessDocument {
    metrics: ReadinessInputs,
    #[serde(default)]
    criteria: ReadinessCriteria,
}

pub fn run_readiness(args: ReadinessArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: ReadinessDocument = match input::stdin::read_typed(args.input.as_deref())? {
        Some(doc) => doc,
        None => ReadinessDocument {
            metrics: ReadinessInputs {
                equity_irr: args.equity_irr,
                min_dscr: args
                    .min_dscr
                    .ok_or("--min-dscr is required (or provide --input)")?,
                moic: args.moic,
                payback_years: args.payback_years,
                npv: args.npv.ok_or("--npv is required (or provide --input)")?,
            },
            criteria: ReadinessCriteria::default(),
        },
    };

    doc.criteria.validate()?;
    let assessment = scoring::score_readiness(&doc.metrics, &doc.criteria);
    Ok(serde_json::json!({ "result": assessment }))
}
