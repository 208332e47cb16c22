use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::Rate;
use crate::FeasibilityResult;

/// Parameters for a straight-line occupancy ramp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRampInput {
    /// Occupancy in year 1
    pub start_occupancy: Rate,
    /// Occupancy reached at the end of the ramp and held afterwards
    pub target_occupancy: Rate,
    /// Year in which the target is first reached (0 or 1 = no ramp)
    pub ramp_years: u32,
    /// Number of years to generate
    pub project_life_years: u32,
}

/// Multipliers `(1+rate)^(year-1)` for years 1..=years, compounded
/// iteratively from the year-1 baseline.
pub fn escalation_factors(rate: Rate, years: u32) -> FeasibilityResult<Vec<Decimal>> {
    if rate < Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::assumption(
            "escalation_rate",
            "Escalation rate cannot be below -100%",
        ));
    }

    let growth = Decimal::ONE + rate;
    let mut factors = Vec::with_capacity(years as usize);
    let mut factor = Decimal::ONE;
    for year in 1..=years {
        if year > 1 {
            factor = factor.checked_mul(growth).ok_or_else(|| {
                FeasibilityError::assumption(
                    "escalation_rate",
                    format!("Escalation overflows decimal range by year {year}"),
                )
            })?;
        }
        factors.push(factor);
    }
    Ok(factors)
}

/// Straight-line ramp from `start_occupancy` to `target_occupancy`.
pub fn linear_ramp(input: &LinearRampInput) -> FeasibilityResult<Vec<Rate>> {
    for (field, value) in [
        ("start_occupancy", input.start_occupancy),
        ("target_occupancy", input.target_occupancy),
    ] {
        if value < Decimal::ZERO || value > Decimal::ONE {
            return Err(FeasibilityError::assumption(
                field,
                "Occupancy must be between 0 and 1",
            ));
        }
    }
    if input.project_life_years == 0 {
        return Err(FeasibilityError::assumption(
            "project_life_years",
            "Project life must be at least 1 year",
        ));
    }

    let life = input.project_life_years;
    if input.ramp_years <= 1 {
        return Ok(vec![input.target_occupancy; life as usize]);
    }

    let steps = Decimal::from(input.ramp_years - 1);
    let increment = (input.target_occupancy - input.start_occupancy) / steps;

    Ok((1..=life)
        .map(|year| {
            if year >= input.ramp_years {
                input.target_occupancy
            } else {
                input.start_occupancy + increment * Decimal::from(year - 1)
            }
        })
        .collect())
}

/// First year (1-based) at which the ramp reaches its maximum.
pub fn stabilized_year(ramp: &[Rate]) -> Option<u32> {
    let peak = ramp.iter().copied().max()?;
    ramp.iter()
        .position(|occ| *occ == peak)
        .map(|idx| idx as u32 + 1)
}

pub fn is_non_decreasing(ramp: &[Rate]) -> bool {
    ramp.windows(2).all(|w| w[0] <= w[1])
}

/// Length and range checks for a ramp used by the projection.
pub fn validate_ramp(ramp: &[Rate], project_life_years: u32) -> FeasibilityResult<()> {
    if ramp.len() != project_life_years as usize {
        return Err(FeasibilityError::assumption(
            "occupancy_ramp",
            format!(
                "Ramp has {} entries but project life is {} years",
                ramp.len(),
                project_life_years
            ),
        ));
    }
    if let Some((idx, occ)) = ramp
        .iter()
        .enumerate()
        .find(|(_, occ)| **occ < Decimal::ZERO || **occ > Decimal::ONE)
    {
        return Err(FeasibilityError::assumption(
            "occupancy_ramp",
            format!("Year {} occupancy {occ} is outside [0, 1]", idx + 1),
        ));
    }
    Ok(())
}
