use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::{Money, Multiple, Rate, Years};
use crate::FeasibilityResult;

/// Score at or above which a project is labelled `Ready`.
pub const READY_THRESHOLD: Decimal = dec!(80);
/// Score at or above which a project is labelled `Conditional`.
pub const CONDITIONAL_THRESHOLD: Decimal = dec!(50);

pub const DEFAULT_MIN_EQUITY_IRR: Rate = dec!(0.15);
pub const DEFAULT_MIN_DSCR: Multiple = dec!(1.25);
pub const DEFAULT_MIN_MOIC: Multiple = dec!(2.0);
pub const DEFAULT_MAX_PAYBACK_YEARS: Years = dec!(7);

/// Weights must add up to this.
pub const TOTAL_WEIGHT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessLabel {
    Ready,
    Conditional,
    NotReady,
}

impl ReadinessLabel {
    pub fn from_score(score: Decimal) -> Self {
        if score >= READY_THRESHOLD {
            ReadinessLabel::Ready
        } else if score >= CONDITIONAL_THRESHOLD {
            ReadinessLabel::Conditional
        } else {
            ReadinessLabel::NotReady
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckDirection {
    /// Actual must not fall below target.
    MinOf,
    /// Actual must not exceed target.
    MaxOf,
    /// Actual must be strictly above target.
    Exceeds,
}

impl CheckDirection {
    fn passes(self, actual: Decimal, target: Decimal) -> bool {
        match self {
            CheckDirection::MinOf => actual >= target,
            CheckDirection::MaxOf => actual <= target,
            CheckDirection::Exceeds => actual > target,
        }
    }
}

/// Targets and weights of the investment-readiness checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessCriteria {
    pub min_equity_irr: Rate,
    pub min_dscr: Multiple,
    pub min_moic: Multiple,
    pub max_payback_years: Years,
    pub equity_irr_weight: Decimal,
    pub dscr_weight: Decimal,
    pub moic_weight: Decimal,
    pub payback_weight: Decimal,
    pub npv_weight: Decimal,
}

impl Default for ReadinessCriteria {
    fn default() -> Self {
        Self {
            min_equity_irr: DEFAULT_MIN_EQUITY_IRR,
            min_dscr: DEFAULT_MIN_DSCR,
            min_moic: DEFAULT_MIN_MOIC,
            max_payback_years: DEFAULT_MAX_PAYBACK_YEARS,
            equity_irr_weight: dec!(30),
            dscr_weight: dec!(25),
            moic_weight: dec!(20),
            payback_weight: dec!(15),
            npv_weight: dec!(10),
        }
    }
}

impl ReadinessCriteria {
    fn weights(&self) -> [(&'static str, Decimal); 5] {
        [
            ("readiness_criteria.equity_irr_weight", self.equity_irr_weight),
            ("readiness_criteria.dscr_weight", self.dscr_weight),
            ("readiness_criteria.moic_weight", self.moic_weight),
            ("readiness_criteria.payback_weight", self.payback_weight),
            ("readiness_criteria.npv_weight", self.npv_weight),
        ]
    }

    pub fn validate(&self) -> FeasibilityResult<()> {
        if let Some((field, _)) = self.weights().iter().find(|(_, w)| *w < Decimal::ZERO) {
            return Err(FeasibilityError::financing(*field, "Weight cannot be negative"));
        }
        let total: Decimal = self.weights().iter().map(|(_, w)| *w).sum();
        if total != TOTAL_WEIGHT {
            return Err(FeasibilityError::financing(
                "readiness_criteria",
                format!("Weights must sum to {TOTAL_WEIGHT}, got {total}"),
            ));
        }
        if self.max_payback_years <= Decimal::ZERO {
            return Err(FeasibilityError::financing(
                "readiness_criteria.max_payback_years",
                "Payback threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Metrics the checklist is evaluated against. `None` means the metric is
/// undefined for this project and its check fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessInputs {
    /// Converged equity IRR only
    pub equity_irr: Option<Rate>,
    pub min_dscr: Multiple,
    pub moic: Option<Multiple>,
    /// Undiscounted payback; `None` when never reached
    pub payback_years: Option<Years>,
    pub npv: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessCheck {
    pub label: String,
    pub target: Decimal,
    pub actual: Option<Decimal>,
    pub pass: bool,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessAssessment {
    pub score: Decimal,
    pub label: ReadinessLabel,
    pub checks: Vec<ReadinessCheck>,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score = sum of weights of passing checks.
pub fn score_readiness(inputs: &ReadinessInputs, criteria: &ReadinessCriteria) -> ReadinessAssessment {
    let checklist = [
        (
            "Equity IRR",
            criteria.min_equity_irr,
            inputs.equity_irr,
            CheckDirection::MinOf,
            criteria.equity_irr_weight,
        ),
        (
            "Minimum DSCR",
            criteria.min_dscr,
            Some(inputs.min_dscr),
            CheckDirection::MinOf,
            criteria.dscr_weight,
        ),
        (
            "MOIC",
            criteria.min_moic,
            inputs.moic,
            CheckDirection::MinOf,
            criteria.moic_weight,
        ),
        (
            "Payback period (years)",
            criteria.max_payback_years,
            inputs.payback_years,
            CheckDirection::MaxOf,
            criteria.payback_weight,
        ),
        (
            "Project NPV",
            Decimal::ZERO,
            Some(inputs.npv),
            CheckDirection::Exceeds,
            criteria.npv_weight,
        ),
    ];

    let checks: Vec<ReadinessCheck> = checklist
        .into_iter()
        .map(|(label, target, actual, direction, weight)| ReadinessCheck {
            label: label.to_string(),
            target,
            actual,
            pass: actual.is_some_and(|a| direction.passes(a, target)),
            weight,
        })
        .collect();

    let score: Decimal = checks.iter().filter(|c| c.pass).map(|c| c.weight).sum();

    ReadinessAssessment {
        score,
        label: ReadinessLabel::from_score(score),
        checks,
    }
}
