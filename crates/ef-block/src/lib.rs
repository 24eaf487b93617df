//! ef-block: equation blocks and their numeric compilation.
//!
//! Turns a flat list of symbolic equations into:
//! - a partition by type (linear, nonlinear, differential)
//! - stable positional maps for variables and derivatives
//! - a compiled residual function `f(state)` or `f(time, state, rate)`
//! - finite difference Jacobians of that function

pub mod block;
pub mod compile;
pub mod error;
pub mod indexing;
pub mod jacobian;

pub use block::{EquationBlock, EquationGroups, ProblemType};
pub use compile::{CompileMode, CompiledBlock, Opcode, Program};
pub use error::{BlockError, BlockResult};
pub use indexing::{DerivativeIndexMap, IndexMap, SlotKey, VariableIndexMap};
pub use jacobian::{DifferenceScheme, JacobianConfig, finite_difference_jacobian};
