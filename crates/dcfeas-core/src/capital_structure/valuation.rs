use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::{Money, Multiple, Rate};
use crate::FeasibilityResult;

/// Stabilized-year value under two independent methods. The methods are
/// reported side by side and never reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    /// stabilized EBITDA x exit multiple
    pub ev_ebitda: Money,
    /// stabilized NOI / terminal cap rate
    pub cap_rate_value: Money,
    /// cap_rate_value per capacity unit
    pub per_kw_value: Money,
    /// ev_ebitda per capacity unit
    pub dollar_per_kw: Money,
}

/// Proceeds to equity when the facility is sold in the exit year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitWaterfall {
    pub exit_year: u32,
    pub exit_ev: Money,
    /// Closing debt balance at the end of the exit year
    pub exit_remaining_debt: Money,
    /// exit_ev - exit_remaining_debt; negative when debt exceeds value
    pub exit_equity_value: Money,
    /// exit_ev with the control premium applied
    pub ipo_price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRow {
    pub multiple: Multiple,
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub implied_dollar_per_kw: Money,
}

pub fn value_stabilized(
    stabilized_ebitda: Money,
    stabilized_noi: Money,
    exit_multiple: Multiple,
    terminal_cap_rate: Rate,
    capacity_units: Decimal,
) -> FeasibilityResult<Valuation> {
    if terminal_cap_rate.is_zero() {
        return Err(FeasibilityError::DivisionByZero {
            context: "cap rate valuation".into(),
        });
    }
    if capacity_units.is_zero() {
        return Err(FeasibilityError::DivisionByZero {
            context: "per-kW valuation".into(),
        });
    }

    let ev_ebitda = stabilized_ebitda * exit_multiple;
    let cap_rate_value = stabilized_noi / terminal_cap_rate;

    Ok(Valuation {
        ev_ebitda,
        cap_rate_value,
        per_kw_value: cap_rate_value / capacity_units,
        dollar_per_kw: ev_ebitda / capacity_units,
    })
}

pub fn exit_waterfall(
    exit_year: u32,
    exit_ev: Money,
    exit_remaining_debt: Money,
    control_premium_pct: Rate,
) -> ExitWaterfall {
    ExitWaterfall {
        exit_year,
        exit_ev,
        exit_remaining_debt,
        exit_equity_value: exit_ev - exit_remaining_debt,
        ipo_price: exit_ev * (Decimal::ONE + control_premium_pct),
    }
}

/// What a buyer would pay at each candidate multiple, net of the debt still
/// outstanding at exit.
pub fn acquisition_table(
    stabilized_ebitda: Money,
    exit_remaining_debt: Money,
    capacity_units: Decimal,
    multiples: &[Multiple],
) -> FeasibilityResult<Vec<AcquisitionRow>> {
    if capacity_units.is_zero() {
        return Err(FeasibilityError::DivisionByZero {
            context: "acquisition table per-kW value".into(),
        });
    }

    Ok(multiples
        .iter()
        .map(|&multiple| {
            let enterprise_value = stabilized_ebitda * multiple;
            AcquisitionRow {
                multiple,
                enterprise_value,
                equity_value: enterprise_value - exit_remaining_debt,
                implied_dollar_per_kw: enterprise_value / capacity_units,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_methods_side_by_side() {
        let v = value_stabilized(dec!(1_000_000), dec!(1_000_000), dec!(18), dec!(0.08), dec!(1000))
            .unwrap();
        assert_eq!(v.ev_ebitda, dec!(18_000_000));
        assert_eq!(v.cap_rate_value, dec!(12_500_000));
        assert_eq!(v.dollar_per_kw, dec!(18_000));
        assert_eq!(v.per_kw_value, dec!(12_500));
    }

    #[test]
    fn test_zero_cap_rate_is_division_error() {
        let err = value_stabilized(dec!(1), dec!(1), dec!(10), Decimal::ZERO, dec!(1)).unwrap_err();
        assert!(matches!(err, FeasibilityError::DivisionByZero { .. }));
    }

    #[test]
    fn test_exit_waterfall_negative_equity_kept() {
        let w = exit_waterfall(5, dec!(4_000_000), dec!(5_000_000), dec!(0.25));
        assert_eq!(w.exit_equity_value, dec!(-1_000_000));
        assert_eq!(w.ipo_price, dec!(5_000_000));
    }

    #[test]
    fn test_acquisition_table_rows() {
        let rows = acquisition_table(
            dec!(2_000_000),
            dec!(6_000_000),
            dec!(2000),
            &[dec!(10), dec!(12)],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].enterprise_value, dec!(20_000_000));
        assert_eq!(rows[0].equity_value, dec!(14_000_000));
        assert_eq!(rows[1].implied_dollar_per_kw, dec!(12_000));
    }
}
