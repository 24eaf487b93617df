//! Error types for problem assembly.

use ef_block::BlockError;
use ef_core::CoreError;
use ef_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Absent required object: {what}")]
    AbsentRequiredObject { what: String },

    #[error("Model {model} is already part of problem {problem}")]
    DuplicateModel { problem: String, model: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),
}

pub type ProblemResult<T> = Result<T, ProblemError>;

impl ProblemError {
    pub fn absent(what: impl Into<String>) -> Self {
        ProblemError::AbsentRequiredObject { what: what.into() }
    }
}

impl From<CoreError> for ProblemError {
    fn from(e: CoreError) -> Self {
        ProblemError::Model(ModelError::Core(e))
    }
}

impl From<serde_json::Error> for ProblemError {
    fn from(e: serde_json::Error) -> Self {
        ProblemError::Serialization(e.to_string())
    }
}
