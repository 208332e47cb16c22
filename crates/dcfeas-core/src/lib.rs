pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "projection")]
pub mod projection;

#[cfg(feature = "capital_structure")]
pub mod capital_structure;

#[cfg(feature = "capital_structure")]
pub mod readiness;

#[cfg(feature = "overrides")]
pub mod overrides;

pub use error::FeasibilityError;
pub use types::*;

/// Standard result type for all feasibility computations
pub type FeasibilityResult<T> = Result<T, FeasibilityError>;
