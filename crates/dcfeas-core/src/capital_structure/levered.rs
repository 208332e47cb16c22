use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::debt_schedule::DebtSchedule;
use crate::projection::cashflow::AnnualCashflow;
use crate::types::{to_pct, Money, Multiple};

/// DSCR reported for years with no debt service. Such years are excluded
/// from the minimum DSCR.
pub const DSCR_NO_DEBT_SERVICE: Multiple = dec!(99);

/// One year of equity-level cash flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeveredCashflowRow {
    pub year: u32,
    pub unlevered_fcf: Money,
    pub ebitda: Money,
    pub debt_service: Money,
    pub levered_fcf: Money,
    /// Running total starting from -total_equity
    pub cumulative_levered: Money,
    /// levered_fcf / total_equity * 100; `None` without equity
    pub cash_on_cash_pct: Option<Decimal>,
    /// ebitda / debt_service, or `DSCR_NO_DEBT_SERVICE`
    pub dscr: Multiple,
}

/// Layer the debt schedule onto the unlevered cash flows.
pub fn build_levered_table(
    cashflows: &[AnnualCashflow],
    schedule: &DebtSchedule,
    total_equity: Money,
) -> Vec<LeveredCashflowRow> {
    let mut cumulative = -total_equity;

    cashflows
        .iter()
        .zip(schedule.rows.iter())
        .map(|(cf, debt)| {
            let debt_service = debt.payment;
            let levered_fcf = cf.cashflow - debt_service;
            cumulative += levered_fcf;

            let cash_on_cash_pct = if total_equity > Decimal::ZERO {
                Some(to_pct(levered_fcf / total_equity))
            } else {
                None
            };
            let dscr = if debt_service.is_zero() {
                DSCR_NO_DEBT_SERVICE
            } else {
                cf.ebitda / debt_service
            };

            LeveredCashflowRow {
                year: cf.year,
                unlevered_fcf: cf.cashflow,
                ebitda: cf.ebitda,
                debt_service,
                levered_fcf,
                cumulative_levered: cumulative,
                cash_on_cash_pct,
                dscr,
            }
        })
        .collect()
}

/// Lowest DSCR among years that actually service debt; the sentinel when
/// no year does.
pub fn min_dscr(rows: &[LeveredCashflowRow]) -> Multiple {
    rows.iter()
        .filter(|r| !r.debt_service.is_zero())
        .map(|r| r.dscr)
        .min()
        .unwrap_or(DSCR_NO_DEBT_SERVICE)
}
