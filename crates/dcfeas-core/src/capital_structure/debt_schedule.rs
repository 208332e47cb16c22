use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time_value;
use crate::types::*;
use crate::FeasibilityResult;

/// A single year of the level-payment term loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtScheduleRow {
    pub year: u32,
    pub opening_balance: Money,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Full amortization schedule over the projection horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSchedule {
    pub rows: Vec<DebtScheduleRow>,
    pub annual_payment: Money,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    /// Closing balance in the last projected year; nonzero when the term
    /// runs past the projection
    pub balance_at_horizon: Money,
}

impl DebtSchedule {
    /// Closing balance at the end of `year`, zero outside the schedule.
    pub fn closing_balance_at(&self, year: u32) -> Money {
        self.rows
            .iter()
            .find(|r| r.year == year)
            .map(|r| r.closing_balance)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Build a year-by-year level-payment schedule for `horizon_years`.
///
/// Rows past `term_years` carry no payment and a zero balance. The final
/// amortization year retires the exact opening balance so principal sums to
/// `total_debt`. A term longer than the horizon simply keeps amortizing;
/// nothing balloons at the last projected year.
pub fn build_debt_schedule(
    total_debt: Money,
    rate: Rate,
    term_years: u32,
    horizon_years: u32,
) -> FeasibilityResult<DebtSchedule> {
    let annual_payment = time_value::level_payment(total_debt, rate, term_years)?;

    let mut rows = Vec::with_capacity(horizon_years as usize);
    let mut balance = total_debt;
    let mut total_interest_paid = Decimal::ZERO;
    let mut total_principal_paid = Decimal::ZERO;

    for year in 1..=horizon_years {
        if year > term_years || balance <= Decimal::ZERO {
            rows.push(DebtScheduleRow {
                year,
                opening_balance: Decimal::ZERO,
                payment: Decimal::ZERO,
                interest: Decimal::ZERO,
                principal: Decimal::ZERO,
                closing_balance: Decimal::ZERO,
            });
            continue;
        }

        let opening = balance;
        let interest = opening * rate;
        let (principal, payment) = if year == term_years {
            (opening, interest + opening)
        } else {
            (annual_payment - interest, annual_payment)
        };

        balance = (opening - principal).max(Decimal::ZERO);
        total_interest_paid += interest;
        total_principal_paid += principal;

        rows.push(DebtScheduleRow {
            year,
            opening_balance: opening,
            payment,
            interest,
            principal,
            closing_balance: balance,
        });
    }

    let balance_at_horizon = rows
        .last()
        .map(|r| r.closing_balance)
        .unwrap_or(total_debt);

    Ok(DebtSchedule {
        rows,
        annual_payment,
        total_interest_paid,
        total_principal_paid,
        balance_at_horizon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_level_schedule_retires_debt() {
        let sched = build_debt_schedule(dec!(1000), dec!(0.05), 5, 5).unwrap();
        assert_eq!(sched.rows.len(), 5);
        assert_eq!(sched.rows[4].closing_balance, Decimal::ZERO);
        assert!((sched.total_principal_paid - dec!(1000)).abs() < dec!(0.000001));
        // Year 1: interest 50, payment ~230.97
        assert_eq!(sched.rows[0].interest, dec!(50));
        assert!((sched.rows[0].payment - dec!(230.97)).abs() < dec!(0.01));
        assert!((sched.rows[0].principal - dec!(180.97)).abs() < dec!(0.01));
    }

    #[test]
    fn test_rows_after_term_are_zero() {
        let sched = build_debt_schedule(dec!(1000), dec!(0.05), 3, 6).unwrap();
        for row in &sched.rows[3..] {
            assert_eq!(row.payment, Decimal::ZERO);
            assert_eq!(row.opening_balance, Decimal::ZERO);
            assert_eq!(row.closing_balance, Decimal::ZERO);
        }
        assert_eq!(sched.balance_at_horizon, Decimal::ZERO);
    }

    #[test]
    fn test_term_longer_than_horizon_keeps_amortizing() {
        let sched = build_debt_schedule(dec!(1000), dec!(0.06), 20, 10).unwrap();
        assert_eq!(sched.rows.len(), 10);
        // Same level payment in the last projected year, no balloon
        assert_eq!(sched.rows[9].payment, sched.annual_payment);
        assert!(sched.balance_at_horizon > Decimal::ZERO);
        assert_eq!(sched.closing_balance_at(10), sched.balance_at_horizon);
    }

    #[test]
    fn test_zero_rate_straight_line() {
        let sched = build_debt_schedule(dec!(1200), Decimal::ZERO, 4, 4).unwrap();
        for row in &sched.rows {
            assert_eq!(row.principal, dec!(300));
            assert_eq!(row.interest, Decimal::ZERO);
        }
        assert_eq!(sched.total_interest_paid, Decimal::ZERO);
    }

    #[test]
    fn test_no_debt() {
        let sched = build_debt_schedule(Decimal::ZERO, dec!(0.07), 10, 5).unwrap();
        assert!(sched.rows.iter().all(|r| r.payment.is_zero()));
        assert_eq!(sched.annual_payment, Decimal::ZERO);
    }

    #[test]
    fn test_zero_term_error() {
        assert!(build_debt_schedule(dec!(1000), dec!(0.05), 0, 5).is_err());
    }
}
