use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::debt_schedule::{build_debt_schedule, DebtScheduleRow};
use super::financing::{validate_financing, FinancingAssumptions};
use super::levered::{build_levered_table, min_dscr, LeveredCashflowRow, DSCR_NO_DEBT_SERVICE};
use super::sensitivity::{build_sensitivity_matrix, SensitivityMatrix};
use super::valuation::{
    acquisition_table, exit_waterfall, value_stabilized, AcquisitionRow, ExitWaterfall, Valuation,
};
use crate::error::FeasibilityError;
use crate::projection::cashflow::{validate_assumptions, FinancialResult, ProjectAssumptions};
use crate::readiness::scoring::{score_readiness, ReadinessAssessment, ReadinessInputs};
use crate::time_value::{self, IrrSolution};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::FeasibilityResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Levered returns, valuation and exit economics for one capital structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentResult {
    pub total_debt: Money,
    pub total_equity: Money,
    /// E/V x equity cost + D/V x debt cost x (1 - tax)
    pub wacc: Rate,
    pub annual_debt_payment: Money,
    pub debt_schedule: Vec<DebtScheduleRow>,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    /// Debt still outstanding after the last projected year
    pub debt_balance_at_horizon: Money,
    pub levered_cashflows: Vec<LeveredCashflowRow>,
    pub equity_irr: IrrSolution,
    /// `None` without equity
    pub moic: Option<Multiple>,
    /// Lowest DSCR over years with debt service
    pub min_dscr: Multiple,
    pub year1_cash_on_cash_pct: Option<Decimal>,
    pub stabilized_ebitda: Money,
    /// Equal to EBITDA; no capital reserve is deducted
    pub stabilized_noi: Money,
    pub valuation: Valuation,
    pub exit: ExitWaterfall,
    pub acquisition_table: Vec<AcquisitionRow>,
    pub readiness: ReadinessAssessment,
    pub sensitivity_matrix: SensitivityMatrix,
}

/// Everything the engine derives for a single (debt ratio, exit multiple)
/// pair, before readiness scoring and the sensitivity sweep.
#[derive(Debug, Clone)]
pub(crate) struct LeveredStructure {
    pub total_debt: Money,
    pub total_equity: Money,
    pub wacc: Rate,
    pub annual_debt_payment: Money,
    pub debt_schedule: Vec<DebtScheduleRow>,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    pub debt_balance_at_horizon: Money,
    pub levered_cashflows: Vec<LeveredCashflowRow>,
    pub equity_irr: IrrSolution,
    pub moic: Option<Multiple>,
    pub min_dscr: Multiple,
    pub year1_cash_on_cash_pct: Option<Decimal>,
    pub stabilized_ebitda: Money,
    pub stabilized_noi: Money,
    pub valuation: Valuation,
    pub exit: ExitWaterfall,
    pub acquisition_table: Vec<AcquisitionRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Layer a capital structure on a completed projection: debt schedule,
/// levered cash flows, DSCR, equity IRR, MOIC, valuation, exit, acquisition
/// pricing, readiness and the debt ratio x exit multiple sensitivity grid.
pub fn invest(
    project: &ProjectAssumptions,
    projection: &FinancialResult,
    financing: &FinancingAssumptions,
) -> FeasibilityResult<InvestmentResult> {
    let mut warnings = Vec::new();
    run_investment(project, projection, financing, &mut warnings)
}

/// `invest` wrapped in the computation envelope with advisory warnings.
pub fn analyze_investment(
    project: &ProjectAssumptions,
    projection: &FinancialResult,
    financing: &FinancingAssumptions,
) -> FeasibilityResult<ComputationOutput<InvestmentResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = run_investment(project, projection, financing, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "project": project,
        "financing": financing,
    });
    Ok(with_metadata(
        "Level-payment term debt, levered FCF, EV/EBITDA exit and cap-rate cross-check",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

fn run_investment(
    project: &ProjectAssumptions,
    projection: &FinancialResult,
    financing: &FinancingAssumptions,
    warnings: &mut Vec<String>,
) -> FeasibilityResult<InvestmentResult> {
    validate_assumptions(project)?;
    if projection.cashflows.is_empty() {
        return Err(FeasibilityError::assumption(
            "cashflows",
            "Projection contains no operating years",
        ));
    }
    validate_financing(financing, projection.cashflows.len())?;

    let s = evaluate_structure(project, projection, financing, warnings)?;

    // ── Readiness ────────────────────────────────────────────────────
    let readiness = score_readiness(
        &ReadinessInputs {
            equity_irr: s.equity_irr.rate(),
            min_dscr: s.min_dscr,
            moic: s.moic,
            payback_years: projection.payback_period_years.years(),
            npv: projection.npv,
        },
        &financing.readiness_criteria,
    );

    // ── Sensitivity ──────────────────────────────────────────────────
    let sensitivity_matrix = build_sensitivity_matrix(project, projection, financing)?;

    Ok(InvestmentResult {
        total_debt: s.total_debt,
        total_equity: s.total_equity,
        wacc: s.wacc,
        annual_debt_payment: s.annual_debt_payment,
        debt_schedule: s.debt_schedule,
        total_interest_paid: s.total_interest_paid,
        total_principal_paid: s.total_principal_paid,
        debt_balance_at_horizon: s.debt_balance_at_horizon,
        levered_cashflows: s.levered_cashflows,
        equity_irr: s.equity_irr,
        moic: s.moic,
        min_dscr: s.min_dscr,
        year1_cash_on_cash_pct: s.year1_cash_on_cash_pct,
        stabilized_ebitda: s.stabilized_ebitda,
        stabilized_noi: s.stabilized_noi,
        valuation: s.valuation,
        exit: s.exit,
        acquisition_table: s.acquisition_table,
        readiness,
        sensitivity_matrix,
    })
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Steps 1-7 of the capital structure analysis for one set of financing
/// assumptions. Inputs are assumed validated.
pub(crate) fn evaluate_structure(
    project: &ProjectAssumptions,
    projection: &FinancialResult,
    financing: &FinancingAssumptions,
    warnings: &mut Vec<String>,
) -> FeasibilityResult<LeveredStructure> {
    let horizon = projection.cashflows.len() as u32;
    let debt_ratio = financing.debt_ratio;

    // ── Sources of funds ─────────────────────────────────────────────
    let total_debt = project.total_capex * debt_ratio;
    let total_equity = project.total_capex - total_debt;
    let wacc = (Decimal::ONE - debt_ratio) * financing.equity_cost_of_capital
        + debt_ratio * financing.debt_cost_annual * (Decimal::ONE - project.tax_rate);

    // ── Debt and levered cash flows ──────────────────────────────────
    let schedule = build_debt_schedule(
        total_debt,
        financing.debt_cost_annual,
        financing.debt_term_years,
        horizon,
    )?;
    let levered = build_levered_table(&projection.cashflows, &schedule, total_equity);
    let min_dscr = min_dscr(&levered);
    let year1_cash_on_cash_pct = levered.first().and_then(|r| r.cash_on_cash_pct);

    // ── Valuation at exit ────────────────────────────────────────────
    let exit_year = financing.exit_year;
    let exit_row = projection.cashflow_for_year(exit_year).ok_or_else(|| {
        FeasibilityError::financing(
            "exit_year",
            format!("No projected cash flow for exit year {exit_year}"),
        )
    })?;
    let stabilized_ebitda = exit_row.ebitda;
    let stabilized_noi = stabilized_ebitda;

    let valuation = value_stabilized(
        stabilized_ebitda,
        stabilized_noi,
        financing.exit_ebitda_multiple,
        financing.terminal_cap_rate,
        project.capacity_units,
    )?;
    let exit_remaining_debt = schedule.closing_balance_at(exit_year);
    let exit = exit_waterfall(
        exit_year,
        valuation.ev_ebitda,
        exit_remaining_debt,
        financing.control_premium_pct,
    );
    let acquisition_table = acquisition_table(
        stabilized_ebitda,
        exit_remaining_debt,
        project.capacity_units,
        &financing.acquisition_multiples,
    )?;

    // ── Equity returns over the holding period ───────────────────────
    let holding: Vec<Money> = levered
        .iter()
        .take(exit_year as usize)
        .map(|r| r.levered_fcf)
        .collect();
    let mut equity_flows = Vec::with_capacity(holding.len() + 1);
    equity_flows.push(-total_equity);
    equity_flows.extend_from_slice(&holding);
    if let Some(last) = equity_flows.last_mut() {
        *last += exit.exit_equity_value;
    }
    let equity_irr = time_value::solve_irr(&equity_flows);

    let moic = if total_equity > Decimal::ZERO {
        let distributions: Money = holding.iter().filter(|cf| **cf > Decimal::ZERO).sum();
        Some((distributions + exit.exit_equity_value) / total_equity)
    } else {
        None
    };

    // ── Warnings ─────────────────────────────────────────────────────
    if exit.exit_equity_value < Decimal::ZERO {
        warnings.push(format!(
            "Exit equity value is negative ({}): remaining debt exceeds exit EV",
            exit.exit_equity_value
        ));
    }
    if min_dscr != DSCR_NO_DEBT_SERVICE && min_dscr < financing.readiness_criteria.min_dscr {
        warnings.push(format!(
            "Minimum DSCR of {min_dscr} is below the {} covenant",
            financing.readiness_criteria.min_dscr
        ));
    }
    match equity_irr {
        IrrSolution::Converged { .. } => {}
        IrrSolution::NoSignChange => {
            warnings.push("Equity IRR undefined: equity cash flows never change sign".into())
        }
        IrrSolution::MaxIterationsExceeded { best_estimate, .. } => warnings.push(format!(
            "Equity IRR low confidence: best estimate {best_estimate} did not converge"
        )),
    }
    if schedule.balance_at_horizon > Decimal::ZERO {
        warnings.push(format!(
            "Debt term of {} years outlasts the {horizon}-year projection; {} remains outstanding",
            financing.debt_term_years, schedule.balance_at_horizon
        ));
    }

    tracing::debug!(
        debt_ratio = %debt_ratio,
        exit_multiple = %financing.exit_ebitda_multiple,
        equity_irr = ?equity_irr,
        min_dscr = %min_dscr,
        "capital structure evaluated"
    );

    Ok(LeveredStructure {
        total_debt,
        total_equity,
        wacc,
        annual_debt_payment: schedule.annual_payment,
        total_interest_paid: schedule.total_interest_paid,
        total_principal_paid: schedule.total_principal_paid,
        debt_balance_at_horizon: schedule.balance_at_horizon,
        debt_schedule: schedule.rows,
        levered_cashflows: levered,
        equity_irr,
        moic,
        min_dscr,
        year1_cash_on_cash_pct,
        stabilized_ebitda,
        stabilized_noi,
        valuation,
        exit,
        acquisition_table,
    })
}
