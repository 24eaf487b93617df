//! Error types for expression evaluation.

use thiserror::Error;

use crate::expr::Slot;

/// Errors that can occur while evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("No binding for {slot}")]
    UnboundSlot { slot: Slot },

    #[error("Slot {slot} out of range (len={len})")]
    SlotOutOfRange { slot: Slot, len: usize },

    #[error("No value bound for quantity {key}")]
    UnboundQuantity { key: String },

    #[error("Derivative {what} cannot be evaluated directly")]
    UnboundDerivative { what: String },
}

pub type ExprResult<T> = Result<T, ExprError>;
