use thiserror::Error;

use crate::units::Unit;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Dimensional coherence violated for {quantity}: expected {expected}, got {found}")]
    DimensionalCoherence {
        quantity: String,
        expected: Unit,
        found: Unit,
    },

    #[error("Unexpected value {found:?}; expected one of {expected}")]
    UnexpectedValue {
        found: String,
        expected: &'static str,
    },
}

impl CoreError {
    pub fn unexpected(found: impl Into<String>, expected: &'static str) -> Self {
        CoreError::UnexpectedValue {
            found: found.into(),
            expected,
        }
    }
}
