use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FeasibilityError;
use crate::types::{Money, Rate, Years};
use crate::FeasibilityResult;

/// Lowest rate the IRR bracket tries (-99%).
pub const IRR_LOWER_BOUND: Rate = dec!(-0.99);
/// Highest rate the IRR bracket tries (+1000%).
pub const IRR_UPPER_BOUND: Rate = dec!(10);
/// Hard cap on solver iterations.
pub const MAX_IRR_ITERATIONS: u32 = 100;
/// Convergence when |NPV| < ratio * |initial outlay|.
pub const IRR_TOLERANCE_RATIO: Decimal = dec!(0.000001);
/// Rates closer to zero than this use the straight-line payment.
pub const NEAR_ZERO_RATE: Rate = dec!(0.000000000001);

// (1+r)^-t overflows 96-bit decimals for long horizons near -100%, so the
// lower edge of the bracket backs off until the NPV is representable.
const LOWER_BOUND_FALLBACKS: [Rate; 5] = [
    IRR_LOWER_BOUND,
    dec!(-0.95),
    dec!(-0.90),
    dec!(-0.75),
    dec!(-0.50),
];

/// Outcome of the IRR root search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IrrSolution {
    /// NPV(rate) is within tolerance of zero.
    Converged { rate: Rate, iterations: u32 },
    /// NPV does not change sign across the bracket, so no root exists in it.
    NoSignChange,
    /// Iteration cap hit; the estimate with the smallest residual is kept.
    MaxIterationsExceeded { best_estimate: Rate, residual_npv: Money },
}

impl IrrSolution {
    /// The solved rate, only when the search converged.
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrSolution::Converged { rate, .. } => Some(*rate),
            _ => None,
        }
    }

    /// Converged rate or the low-confidence best estimate.
    pub fn best_estimate(&self) -> Option<Rate> {
        match self {
            IrrSolution::Converged { rate, .. } => Some(*rate),
            IrrSolution::MaxIterationsExceeded { best_estimate, .. } => Some(*best_estimate),
            IrrSolution::NoSignChange => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IrrSolution::Converged { .. })
    }

    /// Turn anything but a converged rate into `NoIrrSolution`.
    pub fn require(&self, context: &str) -> FeasibilityResult<Rate> {
        match self {
            IrrSolution::Converged { rate, .. } => Ok(*rate),
            IrrSolution::NoSignChange => Err(FeasibilityError::NoIrrSolution {
                context: context.into(),
                detail: format!(
                    "NPV does not change sign between {IRR_LOWER_BOUND} and {IRR_UPPER_BOUND}"
                ),
            }),
            IrrSolution::MaxIterationsExceeded {
                best_estimate,
                residual_npv,
            } => Err(FeasibilityError::NoIrrSolution {
                context: context.into(),
                detail: format!(
                    "no convergence after {MAX_IRR_ITERATIONS} iterations \
                     (best estimate {best_estimate}, residual NPV {residual_npv})"
                ),
            }),
        }
    }
}

/// When a cumulative cashflow series first crosses zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Payback {
    /// Crossed after `years`, interpolated linearly within the crossing year.
    Reached { years: Years },
    /// Still negative at the end of the last projected year.
    BeyondHorizon,
}

impl Payback {
    pub fn years(&self) -> Option<Years> {
        match self {
            Payback::Reached { years } => Some(*years),
            Payback::BeyondHorizon => None,
        }
    }
}

/// Net Present Value of a series of cash flows (index 0 undiscounted).
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FeasibilityResult<Money> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::assumption(
            "rate",
            "Discount rate must be greater than -100%",
        ));
    }

    npv_with_slope(rate, cash_flows)
        .map(|(value, _)| value)
        .ok_or_else(|| FeasibilityError::DivisionByZero {
            context: format!("NPV discount factors at rate {rate}"),
        })
}

/// NPV and dNPV/dr, or `None` if the discounting leaves decimal range.
fn npv_with_slope(rate: Rate, cash_flows: &[Money]) -> Option<(Money, Money)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) => discount = d,
                // Remaining terms are below decimal resolution.
                None => break,
            }
        }
        let pv = cf.checked_div(discount)?;
        value = value.checked_add(pv)?;
        if t > 0 {
            let term = Decimal::from(t as u64)
                .checked_mul(pv)?
                .checked_div(one_plus_r)?;
            slope = slope.checked_sub(term)?;
        }
    }

    Some((value, slope))
}

/// Solve NPV(rate) = 0 over `[initial, cf1, cf2, ...]`.
///
/// Brackets the root between -99% and +1000%, then takes Newton steps that
/// are accepted only while they stay inside the bracket; otherwise it
/// bisects. Always terminates within `MAX_IRR_ITERATIONS`.
pub fn solve_irr(cash_flows: &[Money]) -> IrrSolution {
    if cash_flows.len() < 2 {
        return IrrSolution::NoSignChange;
    }

    let scale = if cash_flows[0].is_zero() {
        cash_flows
            .iter()
            .map(|cf| cf.abs())
            .max()
            .unwrap_or(Decimal::ZERO)
    } else {
        cash_flows[0].abs()
    };
    if scale.is_zero() {
        return IrrSolution::NoSignChange;
    }
    let tolerance = scale * IRR_TOLERANCE_RATIO;

    let Some((mut lo, mut npv_lo)) = LOWER_BOUND_FALLBACKS
        .iter()
        .find_map(|&r| npv_with_slope(r, cash_flows).map(|(v, _)| (r, v)))
    else {
        return IrrSolution::NoSignChange;
    };
    let mut hi = IRR_UPPER_BOUND;
    let Some((npv_hi, _)) = npv_with_slope(hi, cash_flows) else {
        return IrrSolution::NoSignChange;
    };

    if npv_lo.abs() < tolerance {
        return IrrSolution::Converged { rate: lo, iterations: 0 };
    }
    if npv_hi.abs() < tolerance {
        return IrrSolution::Converged { rate: hi, iterations: 0 };
    }
    if npv_lo.is_sign_negative() == npv_hi.is_sign_negative() {
        return IrrSolution::NoSignChange;
    }

    let mut rate = dec!(0.10);
    if rate <= lo || rate >= hi {
        rate = (lo + hi) / Decimal::TWO;
    }
    let mut best = (rate, Decimal::MAX);

    for iteration in 1..=MAX_IRR_ITERATIONS {
        let Some((value, slope)) = npv_with_slope(rate, cash_flows) else {
            rate = (lo + hi) / Decimal::TWO;
            continue;
        };

        if value.abs() < tolerance {
            return IrrSolution::Converged {
                rate,
                iterations: iteration,
            };
        }
        if value.abs() < best.1.abs() {
            best = (rate, value);
        }

        if value.is_sign_negative() == npv_lo.is_sign_negative() {
            lo = rate;
            npv_lo = value;
        } else {
            hi = rate;
        }

        let newton = if slope.is_zero() {
            None
        } else {
            value.checked_div(slope).map(|step| rate - step)
        };
        rate = match newton {
            Some(candidate) if candidate > lo && candidate < hi => candidate,
            _ => (lo + hi) / Decimal::TWO,
        };
    }

    tracing::debug!(
        best_estimate = %best.0,
        residual = %best.1,
        "IRR search hit the iteration cap"
    );
    IrrSolution::MaxIterationsExceeded {
        best_estimate: best.0,
        residual_npv: best.1,
    }
}

/// Level annuity payment retiring `principal` over `term_years`.
pub fn level_payment(principal: Money, rate: Rate, term_years: u32) -> FeasibilityResult<Money> {
    if term_years == 0 {
        return Err(FeasibilityError::financing(
            "debt_term_years",
            "Term must be at least 1 year",
        ));
    }
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(FeasibilityError::financing(
            "debt_cost_annual",
            "Debt cost must be greater than -100%",
        ));
    }

    let n = Decimal::from(term_years);
    if rate.abs() < NEAR_ZERO_RATE {
        return Ok(principal / n);
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..term_years {
        factor = factor
            .checked_mul(one_plus_r)
            .ok_or_else(|| FeasibilityError::DivisionByZero {
                context: "annuity compounding factor".into(),
            })?;
    }

    let denominator = factor - Decimal::ONE;
    if denominator.is_zero() {
        return Ok(principal / n);
    }

    Ok(principal * rate * factor / denominator)
}

/// Payback of an opening balance (usually `-outlay`) recovered by `flows`.
pub fn payback(opening: Money, flows: &[Money]) -> Payback {
    if opening >= Decimal::ZERO {
        return Payback::Reached {
            years: Decimal::ZERO,
        };
    }

    let mut cumulative = opening;
    for (idx, cf) in flows.iter().enumerate() {
        let previous = cumulative;
        cumulative += cf;
        if previous < Decimal::ZERO && cumulative >= Decimal::ZERO {
            // cf > 0 here because the running total rose through zero.
            let fraction = -previous / *cf;
            return Payback::Reached {
                years: Decimal::from(idx as u64) + fraction,
            };
        }
    }

    Payback::BeyondHorizon
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        assert_eq!(npv(dec!(0.0), &cfs).unwrap(), dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_one() {
        assert!(npv(dec!(-1), &[dec!(-1), dec!(2)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let solution = solve_irr(&cfs);
        let rate = solution.rate().unwrap();
        // IRR ~9.7%
        assert!((rate - dec!(0.0970)).abs() < dec!(0.001));
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_negative_rate_root() {
        // Recovers only 60% of the outlay: root is below zero.
        let cfs = vec![dec!(-1000), dec!(200), dec!(200), dec!(200)];
        let rate = solve_irr(&cfs).rate().unwrap();
        assert!(rate < Decimal::ZERO);
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let cfs = vec![dec!(-1000), dec!(-50), dec!(-50)];
        let solution = solve_irr(&cfs);
        assert_eq!(solution, IrrSolution::NoSignChange);
        assert!(solution.require("test").is_err());
        assert_eq!(solution.best_estimate(), None);
    }

    #[test]
    fn test_unconverged_irr_keeps_estimate_but_fails_require() {
        let solution = IrrSolution::MaxIterationsExceeded {
            best_estimate: dec!(0.0831),
            residual_npv: dec!(0.42),
        };
        assert!(!solution.is_converged());
        assert_eq!(solution.best_estimate(), Some(dec!(0.0831)));
        assert_eq!(solution.rate(), None);
        match solution.require("equity IRR").unwrap_err() {
            FeasibilityError::NoIrrSolution { context, detail } => {
                assert_eq!(context, "equity IRR");
                assert!(detail.contains("0.0831"), "{detail}");
            }
            other => panic!("Expected NoIrrSolution, got: {other:?}"),
        }
    }

    #[test]
    fn test_irr_too_few_flows() {
        assert_eq!(solve_irr(&[dec!(-100)]), IrrSolution::NoSignChange);
    }

    #[test]
    fn test_irr_thirty_year_horizon_stays_in_range() {
        let mut cfs = vec![dec!(-250_000_000)];
        cfs.extend(std::iter::repeat(dec!(30_000_000)).take(30));
        let rate = solve_irr(&cfs).require("thirty years").unwrap();
        assert!(rate > dec!(0.10) && rate < dec!(0.12));
    }

    #[test]
    fn test_level_payment_known_answer() {
        // 1000 at 5% over 5 years = 230.97
        let pmt = level_payment(dec!(1000), dec!(0.05), 5).unwrap();
        assert!((pmt - dec!(230.97)).abs() < dec!(0.01));
    }

    #[test]
    fn test_level_payment_zero_rate() {
        assert_eq!(level_payment(dec!(1000), dec!(0), 4).unwrap(), dec!(250));
    }

    #[test]
    fn test_level_payment_zero_term_error() {
        assert!(level_payment(dec!(1000), dec!(0.05), 0).is_err());
    }

    #[test]
    fn test_payback_interpolates_within_year() {
        // -1000, +400, +400, +400: crosses during year 3, 200/400 into it
        let result = payback(dec!(-1000), &[dec!(400), dec!(400), dec!(400)]);
        assert_eq!(result, Payback::Reached { years: dec!(2.5) });
    }

    #[test]
    fn test_payback_beyond_horizon() {
        let result = payback(dec!(-1000), &[dec!(100), dec!(100)]);
        assert_eq!(result, Payback::BeyondHorizon);
        assert_eq!(result.years(), None);
    }
}
