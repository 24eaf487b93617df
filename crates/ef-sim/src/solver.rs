//! Seams for the external numerical solvers.
//!
//! Nothing here solves anything; a [`SolverSet`] carries whichever
//! implementations the caller plugs in.

use ef_block::{CompiledBlock, ProblemType};
use nalgebra::DVector;

use crate::error::SimResult;

/// Steady-state solver for linear and nonlinear algebraic blocks.
pub trait AlgebraicSolver {
    /// Find `x` with `system.eval(x) == 0`, starting from `x0`.
    fn solve(
        &self,
        system: &CompiledBlock,
        problem_type: ProblemType,
        x0: &DVector<f64>,
    ) -> SimResult<DVector<f64>>;
}

/// Integrator for implicit systems `F(t, y, y') = 0`.
pub trait DaeSolver {
    /// One state per entry of `times`, the first being the (possibly
    /// corrected) initial state.
    fn integrate(
        &self,
        system: &CompiledBlock,
        times: &[f64],
        y0: &DVector<f64>,
        yp0: &DVector<f64>,
    ) -> SimResult<Vec<DVector<f64>>>;
}

#[derive(Default)]
pub struct SolverSet {
    algebraic: Option<Box<dyn AlgebraicSolver>>,
    dae: Option<Box<dyn DaeSolver>>,
}

impl SolverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algebraic(mut self, solver: impl AlgebraicSolver + 'static) -> Self {
        self.algebraic = Some(Box::new(solver));
        self
    }

    pub fn with_dae(mut self, solver: impl DaeSolver + 'static) -> Self {
        self.dae = Some(Box::new(solver));
        self
    }

    pub fn algebraic(&self) -> Option<&dyn AlgebraicSolver> {
        self.algebraic.as_deref()
    }

    pub fn dae(&self) -> Option<&dyn DaeSolver> {
        self.dae.as_deref()
    }
}

impl core::fmt::Debug for SolverSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SolverSet")
            .field("algebraic", &self.algebraic.is_some())
            .field("dae", &self.dae.is_some())
            .finish()
    }
}
