use dcfeas_core::overrides::merge::{apply_overrides, CashflowField, CellOverride};
use dcfeas_core::projection::cashflow::{analyze_project, project, ProjectAssumptions};
use dcfeas_core::projection::ramp::{linear_ramp, LinearRampInput};
use dcfeas_core::time_value::{self, IrrSolution, Payback};
use dcfeas_core::FeasibilityError;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

fn reference_ramp() -> Vec<Decimal> {
    vec![
        dec!(0.3),
        dec!(0.5),
        dec!(0.7),
        dec!(0.85),
        dec!(0.95),
        dec!(1),
        dec!(1),
        dec!(1),
        dec!(1),
        dec!(1),
    ]
}

/// 10 MW-class build at $150/kW-month with flat prices.
fn reference_scenario() -> ProjectAssumptions {
    ProjectAssumptions {
        total_capex: dec!(10_000_000),
        annual_opex_year1: dec!(1_200_000),
        revenue_per_unit_month: dec!(150),
        capacity_units: dec!(1000),
        discount_rate: dec!(0.10),
        project_life_years: 10,
        revenue_escalation_rate: Decimal::ZERO,
        opex_escalation_rate: Decimal::ZERO,
        occupancy_ramp: reference_ramp(),
        tax_rate: dec!(0.25),
        depreciation_years: 15,
    }
}

/// Same facility priced at $400/kW-month with escalators.
fn profitable_scenario() -> ProjectAssumptions {
    ProjectAssumptions {
        revenue_per_unit_month: dec!(400),
        revenue_escalation_rate: dec!(0.02),
        opex_escalation_rate: dec!(0.03),
        ..reference_scenario()
    }
}

// ===========================================================================
// Reference scenario: validated against the formulas
// ===========================================================================

#[test]
fn test_reference_scenario_formula_values() {
    let result = project(&reference_scenario()).unwrap();

    assert_eq!(result.cashflows[0].ebitda, dec!(-660_000));
    assert!(result.cashflows.iter().all(|c| c.tax.is_zero()));
    assert_eq!(result.total_tax, Decimal::ZERO);

    let be = result.break_even_occupancy.unwrap();
    assert!((be - dec!(2) / dec!(3)).abs() < dec!(0.0000001));

    // Sum of cash flows is 2.94M against a 10M outlay
    assert_eq!(result.total_profit, dec!(-7_060_000));
    assert_eq!(result.payback_period_years, Payback::BeyondHorizon);
    assert!(
        (result.npv - dec!(-8_850_000)).abs() < dec!(10_000),
        "NPV was {}",
        result.npv
    );

    let irr = result.irr.rate().unwrap();
    assert!((irr - dec!(-0.1315)).abs() < dec!(0.001), "IRR was {irr}");
}

#[test]
fn test_reference_scenario_warns_about_recovery() {
    let out = analyze_project(&reference_scenario()).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("not recovered")));
    assert!(out.warnings.iter().any(|w| w.contains("Negative EBITDA")));
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

// ===========================================================================
// Invariants
// ===========================================================================

#[test]
fn test_npv_at_irr_is_zero() {
    let a = profitable_scenario();
    let result = project(&a).unwrap();
    let irr = result.irr.rate().unwrap();
    let residual = time_value::npv(irr, &result.irr_cash_flows(a.total_capex)).unwrap();
    assert!(
        residual.abs() < a.total_capex * dec!(0.0001),
        "NPV at IRR was {residual}"
    );
}

#[test]
fn test_profitable_scenario_returns() {
    let result = project(&profitable_scenario()).unwrap();
    assert!((result.npv - dec!(3_418_028)).abs() < dec!(1));
    let irr = result.irr.rate().unwrap();
    assert!((irr - dec!(0.1568)).abs() < dec!(0.001), "IRR was {irr}");

    let payback = result.payback_period_years.years().unwrap();
    assert!((payback - dec!(5.505)).abs() < dec!(0.001), "payback was {payback}");
    let discounted = result.discounted_payback_years.years().unwrap();
    assert!(discounted > payback);
    assert!(result.profitability_index > Decimal::ONE);
}

#[test]
fn test_cumulative_cashflow_recurrence() {
    let a = profitable_scenario();
    let result = project(&a).unwrap();
    let mut previous = -a.total_capex;
    for row in &result.cashflows {
        assert_eq!(row.cumulative_cashflow, previous + row.cashflow);
        previous = row.cumulative_cashflow;
    }
}

#[test]
fn test_projection_is_deterministic() {
    let a = profitable_scenario();
    assert_eq!(project(&a).unwrap(), project(&a).unwrap());
}

#[test]
fn test_ramp_helper_feeds_projection() {
    let ramp = linear_ramp(&LinearRampInput {
        start_occupancy: dec!(0.3),
        target_occupancy: dec!(1),
        ramp_years: 6,
        project_life_years: 10,
    })
    .unwrap();
    let a = ProjectAssumptions {
        occupancy_ramp: ramp,
        ..profitable_scenario()
    };
    let result = project(&a).unwrap();
    assert_eq!(result.stabilized_year, 6);
    assert_eq!(result.cashflows[5].occupancy, Decimal::ONE);
}

#[test]
fn test_all_negative_flows_have_no_irr() {
    let a = ProjectAssumptions {
        revenue_per_unit_month: dec!(10),
        ..reference_scenario()
    };
    let result = project(&a).unwrap();
    assert_eq!(result.irr, IrrSolution::NoSignChange);
    match result.irr.require("project IRR").unwrap_err() {
        FeasibilityError::NoIrrSolution { context, .. } => assert_eq!(context, "project IRR"),
        other => panic!("Expected NoIrrSolution, got: {other:?}"),
    }
}

#[test]
fn test_life_above_thirty_years_rejected() {
    let a = ProjectAssumptions {
        project_life_years: 31,
        occupancy_ramp: vec![Decimal::ONE; 31],
        ..reference_scenario()
    };
    assert!(matches!(
        project(&a).unwrap_err(),
        FeasibilityError::InvalidAssumption { .. }
    ));
}

// ===========================================================================
// Overrides
// ===========================================================================

#[test]
fn test_override_shifts_npv_by_discounted_delta() {
    let a = profitable_scenario();
    let result = project(&a).unwrap();
    let rows = apply_overrides(
        &result,
        a.total_capex,
        a.discount_rate,
        &[CellOverride {
            year: 10,
            field: CashflowField::Cashflow,
            value: result.cashflows[9].cashflow + dec!(1_000_000),
        }],
    )
    .unwrap();

    let new_npv = rows.last().unwrap().cumulative_discounted_cashflow;
    let old_npv = result.cashflows[9].cumulative_discounted_cashflow;
    let expected = dec!(1_000_000) / dec!(1.1).powu(10);
    assert!((new_npv - old_npv - expected).abs() < dec!(0.0001));
    assert!((old_npv - result.npv).abs() < dec!(0.000001));
}
