use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeasibilityError {
    #[error("Invalid assumption: {field}: {reason}")]
    InvalidAssumption { field: String, reason: String },

    #[error("Invalid financing: {field}: {reason}")]
    InvalidFinancing { field: String, reason: String },

    #[error("No IRR solution for {context}: {detail}")]
    NoIrrSolution { context: String, detail: String },

    #[error("Invalid override for year {year}: {reason}")]
    InvalidOverride { year: u32, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FeasibilityError {
    pub(crate) fn assumption(field: &str, reason: impl Into<String>) -> Self {
        FeasibilityError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn financing(field: &str, reason: impl Into<String>) -> Self {
        FeasibilityError::InvalidFinancing {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FeasibilityError {
    fn from(e: serde_json::Error) -> Self {
        FeasibilityError::SerializationError(e.to_string())
    }
}
