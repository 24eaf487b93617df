//! Tree-walking numeric evaluation.
//!
//! Compiled blocks lower expressions to bytecode instead; this evaluator is
//! used for diagnostics (residuals at current values) and as a reference.

use ef_core::Quantity;

use crate::error::{ExprError, ExprResult};
use crate::expr::{Expr, Slot};

/// Source of numeric values for leaves.
pub trait Bindings {
    fn quantity(&self, q: &Quantity) -> ExprResult<f64>;
    fn slot(&self, slot: Slot) -> ExprResult<f64>;
}

/// Binds every quantity to its current stored value. Slots are unbound.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentValues;

impl Bindings for CurrentValues {
    fn quantity(&self, q: &Quantity) -> ExprResult<f64> {
        Ok(q.value())
    }

    fn slot(&self, slot: Slot) -> ExprResult<f64> {
        Err(ExprError::UnboundSlot { slot })
    }
}

/// Binds positional slots to solver arrays; known quantities (parameters and
/// constants) fall back to their stored values.
#[derive(Clone, Copy, Debug)]
pub struct SlotValues<'a> {
    pub time: Option<f64>,
    pub state: &'a [f64],
    pub rate: &'a [f64],
}

impl<'a> SlotValues<'a> {
    pub fn algebraic(state: &'a [f64]) -> Self {
        Self {
            time: None,
            state,
            rate: &[],
        }
    }

    pub fn dae(time: f64, state: &'a [f64], rate: &'a [f64]) -> Self {
        Self {
            time: Some(time),
            state,
            rate,
        }
    }
}

impl Bindings for SlotValues<'_> {
    fn quantity(&self, q: &Quantity) -> ExprResult<f64> {
        if q.is_variable() {
            Err(ExprError::UnboundQuantity { key: q.key() })
        } else {
            Ok(q.value())
        }
    }

    fn slot(&self, slot: Slot) -> ExprResult<f64> {
        let lookup = |values: &[f64], i: usize| {
            values.get(i).copied().ok_or(ExprError::SlotOutOfRange {
                slot,
                len: values.len(),
            })
        };
        match slot {
            Slot::State(i) => lookup(self.state, i),
            Slot::Rate(j) => lookup(self.rate, j),
            Slot::Time => self.time.ok_or(ExprError::UnboundSlot { slot }),
        }
    }
}

impl Expr {
    pub fn eval<B: Bindings + ?Sized>(&self, bindings: &B) -> ExprResult<f64> {
        match self {
            Expr::Num(v) => Ok(*v),
            Expr::Quantity(q) => bindings.quantity(q),
            Expr::Slot(slot) => bindings.slot(*slot),
            Expr::Unary(op, arg) => Ok(op.apply(arg.eval(bindings)?)),
            Expr::Binary(op, lhs, rhs) => Ok(op.apply(lhs.eval(bindings)?, rhs.eval(bindings)?)),
            Expr::Derivative(d) => Err(ExprError::UnboundDerivative {
                what: d.to_string(),
            }),
        }
    }
}
