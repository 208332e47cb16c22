use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::engine::evaluate_structure;
use super::financing::FinancingAssumptions;
use crate::error::FeasibilityError;
use crate::projection::cashflow::{FinancialResult, ProjectAssumptions};
use crate::time_value::IrrSolution;
use crate::types::{Multiple, Rate};
use crate::FeasibilityResult;

/// Upper bound on debt ratio x exit multiple combinations per sweep.
pub const MAX_SENSITIVITY_CELLS: usize = 64;

/// Debt ratio range crossed with a list of exit multiples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityGrid {
    pub debt_ratio_min: Rate,
    pub debt_ratio_max: Rate,
    pub debt_ratio_step: Rate,
    pub exit_multiples: Vec<Multiple>,
}

impl Default for SensitivityGrid {
    fn default() -> Self {
        Self {
            debt_ratio_min: dec!(0.50),
            debt_ratio_max: dec!(0.80),
            debt_ratio_step: dec!(0.05),
            exit_multiples: vec![dec!(14), dec!(16), dec!(18), dec!(20), dec!(22)],
        }
    }
}

impl SensitivityGrid {
    pub fn validate(&self) -> FeasibilityResult<()> {
        for (field, ratio) in [
            ("sensitivity_grid.debt_ratio_min", self.debt_ratio_min),
            ("sensitivity_grid.debt_ratio_max", self.debt_ratio_max),
        ] {
            if ratio < Decimal::ZERO || ratio > Decimal::ONE {
                return Err(FeasibilityError::financing(
                    field,
                    "Debt ratio must be between 0 and 1",
                ));
            }
        }
        if self.debt_ratio_min > self.debt_ratio_max {
            return Err(FeasibilityError::financing(
                "sensitivity_grid.debt_ratio_min",
                "Min must be <= max",
            ));
        }
        if self.debt_ratio_step <= Decimal::ZERO {
            return Err(FeasibilityError::financing(
                "sensitivity_grid.debt_ratio_step",
                "Step must be positive",
            ));
        }
        if self.exit_multiples.is_empty() {
            return Err(FeasibilityError::financing(
                "sensitivity_grid.exit_multiples",
                "At least one exit multiple is required",
            ));
        }
        if let Some(m) = self.exit_multiples.iter().find(|m| **m <= Decimal::ZERO) {
            return Err(FeasibilityError::financing(
                "sensitivity_grid.exit_multiples",
                format!("Exit multiple {m} must be positive"),
            ));
        }

        let cells = self
            .debt_ratio_count()
            .saturating_mul(self.exit_multiples.len());
        if cells > MAX_SENSITIVITY_CELLS {
            return Err(FeasibilityError::financing(
                "sensitivity_grid",
                format!("Grid has {cells} cells; at most {MAX_SENSITIVITY_CELLS} are allowed"),
            ));
        }
        Ok(())
    }

    /// Number of debt ratios `debt_ratios` yields, computed without
    /// materializing them.
    fn debt_ratio_count(&self) -> usize {
        let span = (self.debt_ratio_max - self.debt_ratio_min) / self.debt_ratio_step;
        let whole = span.floor();
        let steps = whole.to_usize().unwrap_or(usize::MAX);
        let extra = if whole == span { 0 } else { 1 };
        steps.saturating_add(1).saturating_add(extra)
    }

    /// Ratios from min to max in `step` increments; max is always included.
    pub fn debt_ratios(&self) -> Vec<Rate> {
        let mut values = Vec::new();
        let mut current = self.debt_ratio_min;
        while current <= self.debt_ratio_max {
            values.push(current);
            current += self.debt_ratio_step;
        }
        if let Some(&last) = values.last() {
            if last < self.debt_ratio_max {
                values.push(self.debt_ratio_max);
            }
        }
        values
    }

    /// Every (debt ratio, exit multiple) pair, debt ratio major.
    pub fn pairs(&self) -> Vec<(Rate, Multiple)> {
        self.debt_ratios()
            .into_iter()
            .flat_map(|dr| self.exit_multiples.iter().map(move |&m| (dr, m)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCell {
    pub debt_ratio: Rate,
    pub exit_multiple: Multiple,
    pub equity_irr: IrrSolution,
}

/// Equity IRR across the grid. `cells` is debt ratio major, matching
/// `debt_ratios` x `exit_multiples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    pub debt_ratios: Vec<Rate>,
    pub exit_multiples: Vec<Multiple>,
    pub cells: Vec<SensitivityCell>,
}

impl SensitivityMatrix {
    pub fn cell(&self, debt_ratio: Rate, exit_multiple: Multiple) -> Option<&SensitivityCell> {
        self.cells
            .iter()
            .find(|c| c.debt_ratio == debt_ratio && c.exit_multiple == exit_multiple)
    }

    /// Row-per-debt-ratio view for table output.
    pub fn rows(&self) -> Vec<&[SensitivityCell]> {
        let width = self.exit_multiples.len().max(1);
        self.cells.chunks(width).collect()
    }
}

/// Re-run the capital structure engine for every grid pair. Each cell owns
/// a private copy of the financing assumptions; nothing is shared between
/// cells, so the parallel and sequential sweeps agree exactly.
pub fn build_sensitivity_matrix(
    project: &ProjectAssumptions,
    projection: &FinancialResult,
    financing: &FinancingAssumptions,
) -> FeasibilityResult<SensitivityMatrix> {
    let grid = &financing.sensitivity_grid;
    grid.validate()?;
    let pairs = grid.pairs();

    let evaluate = |&(debt_ratio, exit_multiple): &(Rate, Multiple)| {
        let mut cell_financing = financing.clone();
        cell_financing.debt_ratio = debt_ratio;
        cell_financing.exit_ebitda_multiple = exit_multiple;
        let mut discarded = Vec::new();
        evaluate_structure(project, projection, &cell_financing, &mut discarded).map(|s| {
            SensitivityCell {
                debt_ratio,
                exit_multiple,
                equity_irr: s.equity_irr,
            }
        })
    };

    #[cfg(feature = "parallel")]
    let cells: FeasibilityResult<Vec<SensitivityCell>> = pairs.par_iter().map(evaluate).collect();

    #[cfg(not(feature = "parallel"))]
    let cells: FeasibilityResult<Vec<SensitivityCell>> = pairs.iter().map(evaluate).collect();

    let cells = cells?;
    tracing::debug!(cells = cells.len(), "sensitivity sweep complete");

    Ok(SensitivityMatrix {
        debt_ratios: grid.debt_ratios(),
        exit_multiples: grid.exit_multiples.clone(),
        cells,
    })
}
