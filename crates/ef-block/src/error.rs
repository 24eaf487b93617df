//! Error types for equation blocks.

use ef_core::CoreError;
use ef_expr::ExprError;
use ef_model::ModelError;
use thiserror::Error;

/// Errors raised while classifying, compiling or evaluating a block.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    #[error("Classification error: {what}")]
    Classification { what: String },

    #[error("Equation {equation} references {quantity}, which the block does not declare")]
    UnknownQuantity { quantity: String, equation: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Model error: {0}")]
    Model(ModelError),

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),
}

pub type BlockResult<T> = Result<T, BlockError>;

impl From<ModelError> for BlockError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Classification { equation, what } => BlockError::Classification {
                what: format!("{equation}: {what}"),
            },
            other => BlockError::Model(other),
        }
    }
}

impl From<CoreError> for BlockError {
    fn from(e: CoreError) -> Self {
        BlockError::Model(ModelError::Core(e))
    }
}
