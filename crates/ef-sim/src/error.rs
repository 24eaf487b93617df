//! Error types for simulation runs.

use ef_block::BlockError;
use ef_core::CoreError;
use ef_problem::ProblemError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Absent required object: {what}")]
    AbsentRequiredObject { what: String },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn absent(what: impl Into<String>) -> Self {
        SimError::AbsentRequiredObject { what: what.into() }
    }

    /// Wrap an error raised inside an external solver.
    pub fn backend(e: impl core::fmt::Display) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
