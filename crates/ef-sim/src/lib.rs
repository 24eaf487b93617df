//! ef-sim: running problems through external solvers.
//!
//! Provides:
//! - `SimOptions`, loadable from YAML
//! - `AlgebraicSolver` / `DaeSolver` seams and a `SolverSet` to carry them
//! - `Simulation`, which resolves a problem, dispatches on its type and
//!   writes the solution back into the model variables

pub mod error;
pub mod options;
pub mod simulation;
pub mod solver;

pub use error::{SimError, SimResult};
pub use options::SimOptions;
pub use simulation::{SimRecord, Simulation};
pub use solver::{AlgebraicSolver, DaeSolver, SolverSet};
