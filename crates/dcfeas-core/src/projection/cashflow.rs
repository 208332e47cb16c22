use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::ramp;
use crate::error::FeasibilityError;
use crate::time_value::{self, IrrSolution, Payback};
use crate::types::{to_pct, with_metadata, ComputationOutput, Money, Rate};
use crate::FeasibilityResult;

/// Longest projection the engine accepts.
pub const MAX_PROJECT_LIFE_YEARS: u32 = 30;
/// Shorter projections are allowed but flagged.
pub const MIN_TYPICAL_PROJECT_LIFE_YEARS: u32 = 3;
const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Facility cost, revenue and operating assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssumptions {
    /// All-in capital cost, spent at year 0
    pub total_capex: Money,
    /// Operating cost in year 1, before escalation
    pub annual_opex_year1: Money,
    /// Price per capacity unit per month (e.g. $/kW-month)
    pub revenue_per_unit_month: Money,
    /// Sellable capacity (e.g. kW of IT load)
    pub capacity_units: Decimal,
    /// Discount rate for NPV (decimal)
    pub discount_rate: Rate,
    /// Number of operating years
    pub project_life_years: u32,
    /// Annual price escalation
    #[serde(default)]
    pub revenue_escalation_rate: Rate,
    /// Annual opex escalation
    #[serde(default)]
    pub opex_escalation_rate: Rate,
    /// Fraction of capacity sold in each year, one entry per year
    pub occupancy_ramp: Vec<Rate>,
    /// Corporate tax rate
    pub tax_rate: Rate,
    /// Straight-line depreciation period for the capex
    pub depreciation_years: u32,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One projected operating year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualCashflow {
    pub year: u32,
    pub occupancy: Rate,
    pub revenue: Money,
    pub opex: Money,
    /// revenue - opex
    pub ebitda: Money,
    pub depreciation: Money,
    /// max(0, ebitda - depreciation); losses are not carried forward
    pub taxable_income: Money,
    pub tax: Money,
    /// After-tax income with depreciation added back (= ebitda - tax)
    pub net_income: Money,
    /// Unlevered free cash flow for the year
    pub cashflow: Money,
    pub discounted_cashflow: Money,
    pub cumulative_cashflow: Money,
    pub cumulative_discounted_cashflow: Money,
}

/// Project-level (unlevered) returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    /// Sum of discounted cash flows less capex
    pub npv: Money,
    pub irr: IrrSolution,
    pub payback_period_years: Payback,
    pub discounted_payback_years: Payback,
    /// total_profit / total_capex * 100
    pub roi_pct: Decimal,
    /// Sum of discounted cash flows / capex
    pub profitability_index: Decimal,
    /// Occupancy at which EBITDA is zero in the stabilized year
    pub break_even_occupancy: Option<Rate>,
    /// Representative steady-state year (first year at peak occupancy)
    pub stabilized_year: u32,
    pub total_revenue: Money,
    pub total_opex: Money,
    pub total_tax: Money,
    /// Sum of cash flows less capex
    pub total_profit: Money,
    pub cashflows: Vec<AnnualCashflow>,
}

impl FinancialResult {
    /// Unlevered free cash flow per year, year 1 first.
    pub fn unlevered_cashflows(&self) -> Vec<Money> {
        self.cashflows.iter().map(|cf| cf.cashflow).collect()
    }

    /// `[-capex, cf1, ..., cfN]` as used for the project IRR.
    pub fn irr_cash_flows(&self, total_capex: Money) -> Vec<Money> {
        std::iter::once(-total_capex)
            .chain(self.cashflows.iter().map(|cf| cf.cashflow))
            .collect()
    }

    pub fn cashflow_for_year(&self, year: u32) -> Option<&AnnualCashflow> {
        self.cashflows.iter().find(|cf| cf.year == year)
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Project the unlevered cash flows of a facility and derive NPV, IRR,
/// payback, ROI, profitability index and break-even occupancy.
///
/// Pure: identical assumptions always give an identical result.
pub fn project(assumptions: &ProjectAssumptions) -> FeasibilityResult<FinancialResult> {
    let mut warnings = Vec::new();
    build_projection(assumptions, &mut warnings)
}

/// `project` wrapped in the computation envelope with advisory warnings.
pub fn analyze_project(
    assumptions: &ProjectAssumptions,
) -> FeasibilityResult<ComputationOutput<FinancialResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = build_projection(assumptions, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Unlevered cashflow projection (end-of-year discounting, no loss carryforward)",
        assumptions,
        warnings,
        elapsed,
        result,
    ))
}

fn checked_total(mut values: impl Iterator<Item = Money>, field: &str) -> FeasibilityResult<Money> {
    values
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| FeasibilityError::assumption(field, "Lifetime total overflows decimal range"))
}

fn build_projection(
    a: &ProjectAssumptions,
    warnings: &mut Vec<String>,
) -> FeasibilityResult<FinancialResult> {
    validate_assumptions(a)?;

    if a.project_life_years < MIN_TYPICAL_PROJECT_LIFE_YEARS {
        warnings.push(format!(
            "Project life of {} years is shorter than the usual {MIN_TYPICAL_PROJECT_LIFE_YEARS}-year minimum",
            a.project_life_years
        ));
    }
    if !ramp::is_non_decreasing(&a.occupancy_ramp) {
        warnings.push("Occupancy ramp decreases in at least one year".into());
    }

    let years = a.project_life_years;
    let full_occupancy_revenue = a
        .capacity_units
        .checked_mul(a.revenue_per_unit_month)
        .and_then(|r| r.checked_mul(MONTHS_PER_YEAR))
        .ok_or_else(|| {
            FeasibilityError::assumption(
                "revenue_per_unit_month",
                "Full-occupancy revenue overflows decimal range",
            )
        })?;
    let revenue_factors = ramp::escalation_factors(a.revenue_escalation_rate, years)?;
    let opex_factors = ramp::escalation_factors(a.opex_escalation_rate, years)?;
    let annual_depreciation = a.total_capex / Decimal::from(a.depreciation_years);
    let one_plus_r = Decimal::ONE + a.discount_rate;

    let mut cashflows: Vec<AnnualCashflow> = Vec::with_capacity(years as usize);
    let mut discount = Decimal::ONE;
    let mut cumulative = -a.total_capex;
    let mut cumulative_discounted = -a.total_capex;

    for year in 1..=years {
        let idx = (year - 1) as usize;
        let occupancy = a.occupancy_ramp[idx];

        let revenue = (full_occupancy_revenue * occupancy)
            .checked_mul(revenue_factors[idx])
            .ok_or_else(|| {
                FeasibilityError::assumption(
                    "revenue_escalation_rate",
                    format!("Escalated revenue overflows decimal range by year {year}"),
                )
            })?;
        let opex = a
            .annual_opex_year1
            .checked_mul(opex_factors[idx])
            .ok_or_else(|| {
                FeasibilityError::assumption(
                    "opex_escalation_rate",
                    format!("Escalated opex overflows decimal range by year {year}"),
                )
            })?;
        let ebitda = revenue - opex;

        let depreciation = if year <= a.depreciation_years {
            annual_depreciation
        } else {
            Decimal::ZERO
        };
        let taxable_income = (ebitda - depreciation).max(Decimal::ZERO);
        let tax = taxable_income * a.tax_rate;
        let net_income = ebitda - tax;
        let cashflow = net_income;

        discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
            FeasibilityError::assumption(
                "discount_rate",
                format!("Discount factor overflows decimal range by year {year}"),
            )
        })?;
        let discounted_cashflow = cashflow / discount;

        cumulative = cumulative.checked_add(cashflow).ok_or_else(|| {
            FeasibilityError::assumption(
                "revenue_escalation_rate",
                format!("Cumulative cash flow overflows decimal range by year {year}"),
            )
        })?;
        cumulative_discounted += discounted_cashflow;

        cashflows.push(AnnualCashflow {
            year,
            occupancy,
            revenue,
            opex,
            ebitda,
            depreciation,
            taxable_income,
            tax,
            net_income,
            cashflow,
            discounted_cashflow,
            cumulative_cashflow: cumulative,
            cumulative_discounted_cashflow: cumulative_discounted,
        });
    }

    // ── Summary metrics ──────────────────────────────────────────────
    let total_revenue = checked_total(cashflows.iter().map(|c| c.revenue), "revenue_escalation_rate")?;
    let total_opex = checked_total(cashflows.iter().map(|c| c.opex), "opex_escalation_rate")?;
    let total_tax: Money = cashflows.iter().map(|c| c.tax).sum();
    let sum_cashflow: Money = cashflows.iter().map(|c| c.cashflow).sum();
    let sum_discounted: Money = cashflows.iter().map(|c| c.discounted_cashflow).sum();

    let npv = sum_discounted - a.total_capex;
    let total_profit = sum_cashflow - a.total_capex;
    let roi_pct = to_pct(total_profit / a.total_capex);
    let profitability_index = sum_discounted / a.total_capex;

    let flows: Vec<Money> = cashflows.iter().map(|c| c.cashflow).collect();
    let discounted: Vec<Money> = cashflows.iter().map(|c| c.discounted_cashflow).collect();
    let payback_period_years = time_value::payback(-a.total_capex, &flows);
    let discounted_payback_years = time_value::payback(-a.total_capex, &discounted);

    let mut irr_flows = Vec::with_capacity(flows.len() + 1);
    irr_flows.push(-a.total_capex);
    irr_flows.extend_from_slice(&flows);
    let irr = time_value::solve_irr(&irr_flows);

    let stabilized_year = ramp::stabilized_year(&a.occupancy_ramp).unwrap_or(years);
    let break_even_occupancy = break_even_occupancy(
        full_occupancy_revenue * revenue_factors[(stabilized_year - 1) as usize],
        a.annual_opex_year1 * opex_factors[(stabilized_year - 1) as usize],
    );

    // ── Warnings ─────────────────────────────────────────────────────
    match irr {
        IrrSolution::Converged { .. } => {}
        IrrSolution::NoSignChange => warnings.push(
            "Project IRR undefined: cash flows never change the sign of NPV".into(),
        ),
        IrrSolution::MaxIterationsExceeded { best_estimate, .. } => warnings.push(format!(
            "Project IRR low confidence: best estimate {best_estimate} did not converge"
        )),
    }
    if payback_period_years == Payback::BeyondHorizon {
        warnings.push(format!(
            "Capex is not recovered within the {years}-year projection"
        ));
    }
    match break_even_occupancy {
        None => warnings.push(format!(
            "Break-even occupancy undefined: no revenue capacity in year {stabilized_year}"
        )),
        Some(be) if be > Decimal::ONE => warnings.push(format!(
            "Break-even occupancy of {be} exceeds full occupancy in year {stabilized_year}"
        )),
        Some(_) => {}
    }
    if cashflows.iter().any(|c| c.ebitda < Decimal::ZERO) {
        warnings.push(
            "Negative EBITDA in at least one year; losses are not carried forward for tax".into(),
        );
    }

    tracing::debug!(
        years,
        npv = %npv,
        irr = ?irr,
        stabilized_year,
        "unlevered projection complete"
    );

    Ok(FinancialResult {
        npv,
        irr,
        payback_period_years,
        discounted_payback_years,
        roi_pct,
        profitability_index,
        break_even_occupancy,
        stabilized_year,
        total_revenue,
        total_opex,
        total_tax,
        total_profit,
        cashflows,
    })
}

/// Occupancy x with revenue(x) = opex. Revenue is linear in occupancy, so
/// this is a direct solve.
fn break_even_occupancy(full_occupancy_revenue: Money, opex: Money) -> Option<Rate> {
    if full_occupancy_revenue <= Decimal::ZERO {
        return None;
    }
    Some(opex / full_occupancy_revenue)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Validate all input constraints before any computation.
pub fn validate_assumptions(a: &ProjectAssumptions) -> FeasibilityResult<()> {
    if a.total_capex <= Decimal::ZERO {
        return Err(FeasibilityError::assumption(
            "total_capex",
            "Total capex must be positive",
        ));
    }
    if a.project_life_years < 1 || a.project_life_years > MAX_PROJECT_LIFE_YEARS {
        return Err(FeasibilityError::assumption(
            "project_life_years",
            format!("Project life must be between 1 and {MAX_PROJECT_LIFE_YEARS} years"),
        ));
    }
    if a.capacity_units <= Decimal::ZERO {
        return Err(FeasibilityError::assumption(
            "capacity_units",
            "Capacity must be positive",
        ));
    }
    if a.annual_opex_year1 < Decimal::ZERO {
        return Err(FeasibilityError::assumption(
            "annual_opex_year1",
            "Operating cost cannot be negative",
        ));
    }
    if a.revenue_per_unit_month < Decimal::ZERO {
        return Err(FeasibilityError::assumption(
            "revenue_per_unit_month",
            "Price cannot be negative",
        ));
    }
    if a.discount_rate <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::assumption(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    for (field, rate) in [
        ("revenue_escalation_rate", a.revenue_escalation_rate),
        ("opex_escalation_rate", a.opex_escalation_rate),
    ] {
        if rate < Decimal::NEGATIVE_ONE {
            return Err(FeasibilityError::assumption(
                field,
                "Escalation rate cannot be below -100%",
            ));
        }
    }
    if a.tax_rate < Decimal::ZERO || a.tax_rate > Decimal::ONE {
        return Err(FeasibilityError::assumption(
            "tax_rate",
            "Tax rate must be between 0 and 1",
        ));
    }
    if a.depreciation_years == 0 {
        return Err(FeasibilityError::assumption(
            "depreciation_years",
            "Depreciation period must be at least 1 year",
        ));
    }
    ramp::validate_ramp(&a.occupancy_ramp, a.project_life_years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference_assumptions() -> ProjectAssumptions {
        ProjectAssumptions {
            total_capex: dec!(10_000_000),
            annual_opex_year1: dec!(1_200_000),
            revenue_per_unit_month: dec!(150),
            capacity_units: dec!(1000),
            discount_rate: dec!(0.10),
            project_life_years: 10,
            revenue_escalation_rate: Decimal::ZERO,
            opex_escalation_rate: Decimal::ZERO,
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

    #[test]
    fn test_year_one_formula() {
        let result = project(&reference_assumptions()).unwrap();
        let y1 = &result.cashflows[0];
        // 1000 kW * 150 * 12 * 0.3
        assert_eq!(y1.revenue, dec!(540_000));
        assert_eq!(y1.opex, dec!(1_200_000));
        assert_eq!(y1.ebitda, dec!(-660_000));
        assert_eq!(y1.taxable_income, Decimal::ZERO);
        assert_eq!(y1.cashflow, dec!(-660_000));
        assert_eq!(y1.cumulative_cashflow, dec!(-10_660_000));
    }

    #[test]
    fn test_depreciation_shield_keeps_tax_at_zero() {
        // EBITDA peaks at 600k, below the 666,667 depreciation charge.
        let result = project(&reference_assumptions()).unwrap();
        assert!(result.cashflows.iter().all(|c| c.tax.is_zero()));
        assert_eq!(result.total_tax, Decimal::ZERO);
    }

    #[test]
    fn test_depreciation_stops_after_period() {
        let mut a = reference_assumptions();
        a.depreciation_years = 4;
        let result = project(&a).unwrap();
        assert_eq!(result.cashflows[3].depreciation, dec!(2_500_000));
        assert_eq!(result.cashflows[4].depreciation, Decimal::ZERO);
        // Year 6: EBITDA 600k fully taxable at 25%
        assert_eq!(result.cashflows[5].tax, dec!(150_000));
        assert_eq!(result.cashflows[5].cashflow, dec!(450_000));
    }

    #[test]
    fn test_escalation_compounds_from_year_one() {
        let mut a = reference_assumptions();
        a.revenue_escalation_rate = dec!(0.10);
        a.opex_escalation_rate = dec!(0.05);
        let result = project(&a).unwrap();
        // Year 3: 1.8M * 0.7 * 1.21 and 1.2M * 1.1025
        assert_eq!(result.cashflows[2].revenue, dec!(1_524_600));
        assert_eq!(result.cashflows[2].opex, dec!(1_323_000));
    }

    #[test]
    fn test_discounting_end_of_year() {
        let result = project(&reference_assumptions()).unwrap();
        let y2 = &result.cashflows[1];
        assert_eq!(y2.discounted_cashflow, y2.cashflow / dec!(1.21));
    }

    #[test]
    fn test_break_even_in_stabilized_year() {
        let result = project(&reference_assumptions()).unwrap();
        assert_eq!(result.stabilized_year, 6);
        // 1.2M opex / 1.8M full-occupancy revenue
        let be = result.break_even_occupancy.unwrap();
        assert!((be - dec!(0.666666)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_zero_price_break_even_undefined() {
        let mut a = reference_assumptions();
        a.revenue_per_unit_month = Decimal::ZERO;
        let result = analyze_project(&a).unwrap();
        assert_eq!(result.result.break_even_occupancy, None);
        assert_eq!(result.result.irr, IrrSolution::NoSignChange);
        assert_eq!(result.result.payback_period_years, Payback::BeyondHorizon);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Break-even occupancy undefined")));
    }

    #[test]
    fn test_validation_zero_capex() {
        let mut a = reference_assumptions();
        a.total_capex = Decimal::ZERO;
        match project(&a).unwrap_err() {
            FeasibilityError::InvalidAssumption { field, .. } => {
                assert_eq!(field, "total_capex");
            }
            other => panic!("Expected InvalidAssumption, got: {other:?}"),
        }
    }

    #[test]
    fn test_validation_ramp_length() {
        let mut a = reference_assumptions();
        a.occupancy_ramp.pop();
        assert!(project(&a).is_err());
    }

    #[test]
    fn test_validation_escalation_below_minus_one() {
        let mut a = reference_assumptions();
        a.opex_escalation_rate = dec!(-1.01);
        assert!(project(&a).is_err());
    }

    #[test]
    fn test_escalation_overflow_is_an_error() {
        let mut a = reference_assumptions();
        a.project_life_years = 30;
        a.occupancy_ramp = vec![Decimal::ONE; 30];
        a.revenue_escalation_rate = dec!(7);
        match project(&a).unwrap_err() {
            FeasibilityError::InvalidAssumption { field, reason } => {
                assert_eq!(field, "revenue_escalation_rate");
                assert!(reason.contains("year 27"), "{reason}");
            }
            other => panic!("Expected InvalidAssumption, got: {other:?}"),
        }

        a.revenue_escalation_rate = Decimal::ZERO;
        a.opex_escalation_rate = dec!(7);
        match project(&a).unwrap_err() {
            FeasibilityError::InvalidAssumption { field, .. } => {
                assert_eq!(field, "opex_escalation_rate");
            }
            other => panic!("Expected InvalidAssumption, got: {other:?}"),
        }
    }

    #[test]
    fn test_validation_zero_life() {
        let mut a = reference_assumptions();
        a.project_life_years = 0;
        a.occupancy_ramp.clear();
        assert!(project(&a).is_err());
    }

    #[test]
    fn test_short_life_warns() {
        let mut a = reference_assumptions();
        a.project_life_years = 2;
        a.occupancy_ramp.truncate(2);
        let out = analyze_project(&a).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("shorter than")));
    }
}
