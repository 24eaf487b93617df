//! Finite difference Jacobians of compiled blocks.

use nalgebra::{DMatrix, DVector};

use crate::compile::CompiledBlock;
use crate::error::{BlockError, BlockResult};

/// Difference formula used for each column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DifferenceScheme {
    /// `(f(x+h) - f(x)) / h`
    #[default]
    Forward,
    /// `(f(x+h) - f(x-h)) / 2h`, more accurate but twice the cost.
    Central,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JacobianConfig {
    /// Relative step; the absolute step is `epsilon * max(|x_j|, 1)`.
    pub epsilon: f64,
    pub scheme: DifferenceScheme,
}

impl Default for JacobianConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-7,
            scheme: DifferenceScheme::Forward,
        }
    }
}

/// Jacobian of `f` at `x`, one column per component of `x`.
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    config: &JacobianConfig,
) -> BlockResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> BlockResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = config.epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let column = match config.scheme {
            DifferenceScheme::Forward => (f_plus - &f_x) / dx,
            DifferenceScheme::Central => {
                let mut x_minus = x.clone();
                x_minus[j] -= dx;
                let f_minus = f(&x_minus)?;
                (f_plus - f_minus) / (2.0 * dx)
            }
        };

        jac.set_column(j, &column);
    }

    Ok(jac)
}

impl CompiledBlock {
    /// `∂f/∂state` of an algebraic block.
    pub fn jacobian(&self, state: &[f64], config: &JacobianConfig) -> BlockResult<DMatrix<f64>> {
        let x = DVector::from_column_slice(state);
        finite_difference_jacobian(&x, |s| self.eval(s.as_slice()), config)
    }

    /// `∂F/∂state` of a differential-algebraic block.
    pub fn jacobian_state(
        &self,
        time: f64,
        state: &[f64],
        rate: &[f64],
        config: &JacobianConfig,
    ) -> BlockResult<DMatrix<f64>> {
        let x = DVector::from_column_slice(state);
        finite_difference_jacobian(&x, |s| self.eval_dae(time, s.as_slice(), rate), config)
    }

    /// `∂F/∂rate` of a differential-algebraic block.
    pub fn jacobian_rate(
        &self,
        time: f64,
        state: &[f64],
        rate: &[f64],
        config: &JacobianConfig,
    ) -> BlockResult<DMatrix<f64>> {
        let x = DVector::from_column_slice(rate);
        finite_difference_jacobian(&x, |r| self.eval_dae(time, state, r.as_slice()), config)
    }

    /// Iteration matrix `∂F/∂state + cj·∂F/∂rate` used by BDF corrector steps.
    ///
    /// Only defined when each rate slot maps onto the state slot of the
    /// differentiated variable; the rate Jacobian is scattered into the
    /// columns of those variables.
    pub fn iteration_matrix(
        &self,
        time: f64,
        state: &[f64],
        rate: &[f64],
        cj: f64,
        config: &JacobianConfig,
    ) -> BlockResult<DMatrix<f64>> {
        let columns: Vec<usize> = self
            .rate_states()
            .iter()
            .map(|slot| {
                slot.ok_or_else(|| BlockError::InvalidArg {
                    what: "a rate slot differentiates a quantity without a state slot".into(),
                })
            })
            .collect::<BlockResult<_>>()?;
        let mut matrix = self.jacobian_state(time, state, rate, config)?;
        let d_rate = self.jacobian_rate(time, state, rate, config)?;
        for (j, &col) in columns.iter().enumerate() {
            let scaled = d_rate.column(j) * cj;
            let mut target = matrix.column_mut(col);
            target += scaled;
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::EquationBlock;
    use crate::compile::CompileMode;
    use ef_core::{NamedMap, Quantity, QuantityKind, si};
    use ef_expr::Symbolic;
    use ef_model::Equation;

    fn q(kind: QuantityKind, name: &str) -> Quantity {
        Quantity::new(kind, name, "M", si::DIMENSIONLESS, "")
    }

    fn map(qs: &[&Quantity]) -> NamedMap<Quantity> {
        qs.iter().map(|q| (q.key(), (*q).clone())).collect()
    }

    #[test]
    fn jacobian_of_closures() {
        // f(x) = x^2, J = 2*x
        let f = |x: &DVector<f64>| -> BlockResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0]))
        };
        let x = DVector::from_element(1, 3.0);

        let forward = finite_difference_jacobian(&x, f, &JacobianConfig::default()).unwrap();
        assert!((forward[(0, 0)] - 6.0).abs() < 1e-5);

        let central = JacobianConfig {
            epsilon: 1e-5,
            scheme: DifferenceScheme::Central,
        };
        let jac = finite_difference_jacobian(&x, f, &central).unwrap();
        assert!((jac[(0, 0)] - 6.0).abs() < 1e-8);
    }

    #[test]
    fn algebraic_block_jacobian() {
        let (a, b) = (q(QuantityKind::Variable, "a"), q(QuantityKind::Variable, "b"));
        let eqs = vec![
            Equation::new("e1", "", a.sym() + 2.0 * b.sym() - 1.0),
            Equation::new("e2", "", a.sym() * b.sym()),
        ];
        let mut block = EquationBlock::new(eqs, map(&[&a, &b]), NamedMap::new());
        block.classify();
        let f = block.compile(CompileMode::Algebraic).unwrap();
        let jac = f.jacobian(&[2.0, 3.0], &JacobianConfig::default()).unwrap();

        let expected = [[1.0, 2.0], [3.0, 2.0]];
        for (i, row) in expected.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                assert!((jac[(i, j)] - v).abs() < 1e-5, "J[{i},{j}]");
            }
        }
    }

    #[test]
    fn dae_iteration_matrix() {
        // dy/dt + 2y = 0, z - y^2 = 0
        let (y, z, t) = (
            q(QuantityKind::Variable, "y"),
            q(QuantityKind::Variable, "z"),
            q(QuantityKind::Variable, "t"),
        );
        let eqs = vec![
            Equation::new("dy", "", y.diff(&t) + 2.0 * y.sym()),
            Equation::new("alg", "", z.sym() - y.sym().pow(2.0)),
        ];
        let mut block = EquationBlock::new(eqs, map(&[&y, &z, &t]), NamedMap::new());
        block.classify();
        block.to_residual_form().unwrap();
        let f = block.compile(CompileMode::DifferentialAlgebraic).unwrap();

        let cfg = JacobianConfig::default();
        let (state, rate) = ([1.5, 2.25], [-3.0]);
        let d_rate = f.jacobian_rate(0.0, &state, &rate, &cfg).unwrap();
        assert_eq!(d_rate.shape(), (2, 1));
        assert!((d_rate[(0, 0)] - 1.0).abs() < 1e-6);

        let m = f.iteration_matrix(0.0, &state, &rate, 10.0, &cfg).unwrap();
        assert!((m[(0, 0)] - 12.0).abs() < 1e-4);
        assert!(m[(0, 1)].abs() < 1e-6);
        assert!((m[(1, 0)] + 3.0).abs() < 1e-4);
        assert!((m[(1, 1)] - 1.0).abs() < 1e-6);
    }
}
