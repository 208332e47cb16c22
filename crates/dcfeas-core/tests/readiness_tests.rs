use dcfeas_core::capital_structure::engine::invest;
use dcfeas_core::capital_structure::financing::{default_acquisition_multiples, FinancingAssumptions};
use dcfeas_core::capital_structure::sensitivity::SensitivityGrid;
use dcfeas_core::projection::cashflow::{project, ProjectAssumptions};
use dcfeas_core::readiness::scoring::{ReadinessCriteria, ReadinessLabel};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn facility(price: Decimal) -> ProjectAssumptions {
    ProjectAssumptions {
        total_capex: dec!(10_000_000),
        annual_opex_year1: dec!(1_200_000),
        revenue_per_unit_month: price,
        capacity_units: dec!(1000),
        discount_rate: dec!(0.10),
        project_life_years: 10,
        revenue_escalation_rate: dec!(0.02),
        opex_escalation_rate: dec!(0.03),
        occupancy_ramp: vec![
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
        ],
        tax_rate: dec!(0.25),
        depreciation_years: 15,
    }
}

fn financing(debt_ratio: Decimal) -> FinancingAssumptions {
    FinancingAssumptions {
        debt_ratio,
        debt_cost_annual: dec!(0.07),
        debt_term_years: 12,
        equity_cost_of_capital: dec!(0.14),
        exit_year: 7,
        exit_ebitda_multiple: dec!(18),
        terminal_cap_rate: dec!(0.065),
        control_premium_pct: Decimal::ZERO,
        sensitivity_grid: SensitivityGrid::default(),
        acquisition_multiples: default_acquisition_multiples(),
        readiness_criteria: ReadinessCriteria::default(),
    }
}

#[test]
fn test_levered_project_fails_only_coverage() {
    let p = facility(dec!(400));
    let proj = project(&p).unwrap();
    let r = invest(&p, &proj, &financing(dec!(0.6))).unwrap();

    // Year-1 EBITDA cannot cover debt service; everything else passes.
    assert_eq!(r.readiness.score, dec!(75));
    assert_eq!(r.readiness.label, ReadinessLabel::Conditional);
    let failing: Vec<&str> = r
        .readiness
        .checks
        .iter()
        .filter(|c| !c.pass)
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(failing, vec!["Minimum DSCR"]);
}

#[test]
fn test_unlevered_project_is_ready() {
    let p = facility(dec!(400));
    let proj = project(&p).unwrap();
    let r = invest(&p, &proj, &financing(Decimal::ZERO)).unwrap();
    // No debt service: DSCR check passes on the sentinel.
    assert_eq!(r.readiness.score, dec!(100));
    assert_eq!(r.readiness.label, ReadinessLabel::Ready);
}

#[test]
fn test_loss_making_project_is_not_ready() {
    let p = ProjectAssumptions {
        revenue_escalation_rate: Decimal::ZERO,
        opex_escalation_rate: Decimal::ZERO,
        ..facility(dec!(150))
    };
    let proj = project(&p).unwrap();
    let r = invest(&p, &proj, &financing(dec!(0.6))).unwrap();
    assert_eq!(r.readiness.label, ReadinessLabel::NotReady);
    assert!(r.readiness.score < dec!(50));
}

#[test]
fn test_custom_criteria_change_the_score() {
    let p = facility(dec!(400));
    let proj = project(&p).unwrap();
    let mut f = financing(dec!(0.6));
    f.readiness_criteria.min_dscr = dec!(0.25);
    let r = invest(&p, &proj, &f).unwrap();
    assert_eq!(r.readiness.score, dec!(100));
}
