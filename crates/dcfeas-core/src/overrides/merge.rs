use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::projection::cashflow::{AnnualCashflow, FinancialResult};
use crate::types::{Money, Rate};
use crate::FeasibilityResult;

/// Editable column of a projected year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashflowField {
    Revenue,
    Opex,
    Ebitda,
    Tax,
    Cashflow,
}

/// A hand-entered value replacing one projected cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellOverride {
    pub year: u32,
    pub field: CashflowField,
    pub value: Money,
}

/// Merge manual cell overrides into a copy of the projected rows.
///
/// Within a year, fields are applied top-down: revenue and opex re-derive
/// EBITDA, EBITDA and tax re-derive the cash flow, and an explicit cash flow
/// wins over everything. When the same cell is overridden twice the later
/// entry wins. Discounted and cumulative columns are rebuilt for every year
/// afterwards, so an override in year 2 moves the running totals of years
/// 2..N. `result` is left untouched.
pub fn apply_overrides(
    result: &FinancialResult,
    total_capex: Money,
    discount_rate: Rate,
    overrides: &[CellOverride],
) -> FeasibilityResult<Vec<AnnualCashflow>> {
    if discount_rate <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::assumption(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    if let Some(o) = overrides
        .iter()
        .find(|o| result.cashflow_for_year(o.year).is_none())
    {
        return Err(FeasibilityError::InvalidOverride {
            year: o.year,
            reason: format!(
                "Year is outside the {}-year projection",
                result.cashflows.len()
            ),
        });
    }

    let mut rows = result.cashflows.clone();
    for row in rows.iter_mut() {
        let edits: Vec<&CellOverride> = overrides.iter().filter(|o| o.year == row.year).collect();
        if edits.is_empty() {
            continue;
        }
        let pick = |field: CashflowField| {
            edits
                .iter()
                .rev()
                .find(|o| o.field == field)
                .map(|o| o.value)
        };

        let revenue = pick(CashflowField::Revenue);
        let opex = pick(CashflowField::Opex);
        if revenue.is_some() || opex.is_some() {
            row.revenue = revenue.unwrap_or(row.revenue);
            row.opex = opex.unwrap_or(row.opex);
            row.ebitda = row.revenue - row.opex;
        }
        if let Some(ebitda) = pick(CashflowField::Ebitda) {
            row.ebitda = ebitda;
        }
        if let Some(tax) = pick(CashflowField::Tax) {
            row.tax = tax;
        }
        row.net_income = row.ebitda - row.tax;
        row.cashflow = pick(CashflowField::Cashflow).unwrap_or(row.net_income);
    }

    // ── Rebuild running columns ──────────────────────────────────────
    let one_plus_r = Decimal::ONE + discount_rate;
    let mut discount = Decimal::ONE;
    let mut cumulative = -total_capex;
    let mut cumulative_discounted = -total_capex;
    for row in rows.iter_mut() {
        discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
            FeasibilityError::assumption(
                "discount_rate",
                format!("Discount factor overflows decimal range by year {}", row.year),
            )
        })?;
        row.discounted_cashflow = row.cashflow / discount;
        cumulative += row.cashflow;
        cumulative_discounted += row.discounted_cashflow;
        row.cumulative_cashflow = cumulative;
        row.cumulative_discounted_cashflow = cumulative_discounted;
    }

    tracing::debug!(
        overrides = overrides.len(),
        years = rows.len(),
        "cell overrides merged"
    );

    Ok(rows)
}
