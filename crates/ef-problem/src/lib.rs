//! ef-problem: composing models into one solvable system.
//!
//! A [`Problem`] owns its models and connection records. Resolving it reloads
//! every model, flattens their equations into one
//! [`EquationBlock`](ef_block::EquationBlock) and classifies it.

pub mod error;
pub mod problem;
pub mod report;

pub use error::{ProblemError, ProblemResult};
pub use problem::Problem;
pub use report::{ModelSummary, ProblemSummary, Reportable, model_report, problem_report};
