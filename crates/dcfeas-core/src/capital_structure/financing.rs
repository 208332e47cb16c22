use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::sensitivity::SensitivityGrid;
use crate::error::FeasibilityError;
use crate::readiness::scoring::ReadinessCriteria;
use crate::types::{Multiple, Rate};
use crate::FeasibilityResult;

/// Debt/equity structure and exit assumptions layered on the projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingAssumptions {
    /// Share of total capex funded with debt (0-1)
    pub debt_ratio: Rate,
    /// Annual interest rate on the term loan
    pub debt_cost_annual: Rate,
    /// Amortization period; may be shorter or longer than the project life
    pub debt_term_years: u32,
    /// Required return on equity, used for WACC
    pub equity_cost_of_capital: Rate,
    /// Year in which the facility is sold (1-based)
    pub exit_year: u32,
    /// EV/EBITDA multiple applied at exit
    pub exit_ebitda_multiple: Multiple,
    /// Cap rate for the income-capitalization cross-check
    pub terminal_cap_rate: Rate,
    /// Uplift for a controlling-stake or IPO price
    #[serde(default)]
    pub control_premium_pct: Rate,
    /// Debt ratio x exit multiple grid for the sensitivity matrix
    #[serde(default)]
    pub sensitivity_grid: SensitivityGrid,
    /// Candidate EV/EBITDA multiples for the acquisition table
    #[serde(default = "default_acquisition_multiples")]
    pub acquisition_multiples: Vec<Multiple>,
    /// Checklist thresholds and weights for the readiness score
    #[serde(default)]
    pub readiness_criteria: ReadinessCriteria,
}

/// 10x to 30x in 2x steps.
pub fn default_acquisition_multiples() -> Vec<Multiple> {
    (0..=10)
        .map(|i| dec!(10) + dec!(2) * Decimal::from(i))
        .collect()
}

/// Reject financing inputs that cannot be modeled. Runs before any
/// computation; nothing is clamped.
pub fn validate_financing(f: &FinancingAssumptions, projection_years: usize) -> FeasibilityResult<()> {
    if f.debt_ratio < Decimal::ZERO || f.debt_ratio > Decimal::ONE {
        return Err(FeasibilityError::financing(
            "debt_ratio",
            "Debt ratio must be between 0 and 1",
        ));
    }
    if f.debt_term_years == 0 {
        return Err(FeasibilityError::financing(
            "debt_term_years",
            "Debt term must be at least 1 year",
        ));
    }
    if f.debt_cost_annual <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::financing(
            "debt_cost_annual",
            "Debt cost must be greater than -100%",
        ));
    }
    if f.exit_year == 0 || f.exit_year as usize > projection_years {
        return Err(FeasibilityError::financing(
            "exit_year",
            format!("Exit year must be between 1 and {projection_years}"),
        ));
    }
    if f.exit_ebitda_multiple <= Decimal::ZERO {
        return Err(FeasibilityError::financing(
            "exit_ebitda_multiple",
            "Exit multiple must be positive",
        ));
    }
    if f.terminal_cap_rate <= Decimal::ZERO {
        return Err(FeasibilityError::financing(
            "terminal_cap_rate",
            "Terminal cap rate must be positive",
        ));
    }
    if f.control_premium_pct <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::financing(
            "control_premium_pct",
            "Control premium must be greater than -100%",
        ));
    }
    if let Some(m) = f.acquisition_multiples.iter().find(|m| **m <= Decimal::ZERO) {
        return Err(FeasibilityError::financing(
            "acquisition_multiples",
            format!("Acquisition multiple {m} must be positive"),
        ));
    }
    f.sensitivity_grid.validate()?;
    f.readiness_criteria.validate()
}
