//! Expression tree types and builders.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use ef_core::Quantity;

/// Positional placeholder produced when quantities are bound to solver arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `state[i]`
    State(usize),
    /// `rate[j]`
    Rate(usize),
    /// The independent time argument.
    Time,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::State(i) => write!(f, "state[{i}]"),
            Slot::Rate(j) => write!(f, "rate[{j}]"),
            Slot::Time => f.write_str("time"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Abs => "abs",
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Ln => x.ln(),
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Abs => x.abs(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Min,
    Max,
}

impl BinaryOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
        }
    }
}

/// Time derivative marker `d(of)/d(wrt)`.
///
/// Carries no calculus: it is an opaque unknown that a DAE block binds to a
/// position in the rate vector.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Derivative {
    pub of: Quantity,
    pub wrt: Quantity,
}

impl Derivative {
    /// Identity pair used to deduplicate occurrences.
    pub fn key(&self) -> (ef_core::QuantityId, ef_core::QuantityId) {
        (self.of.id(), self.wrt.id())
    }
}

impl fmt::Display for Derivative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d({})/d({})", self.of.name(), self.wrt.name())
    }
}

/// Symbolic expression over quantity handles.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Quantity(Quantity),
    Slot(Slot),
    Unary(UnaryOp, Rc<Expr>),
    Binary(BinaryOp, Rc<Expr>, Rc<Expr>),
    Derivative(Derivative),
}

impl Expr {
    pub fn num(v: f64) -> Expr {
        Expr::Num(v)
    }

    pub fn zero() -> Expr {
        Expr::Num(0.0)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 0.0)
    }

    pub fn unary(op: UnaryOp, arg: Expr) -> Expr {
        Expr::Unary(op, Rc::new(arg))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Rc::new(lhs), Rc::new(rhs))
    }

    pub fn derivative(of: &Quantity, wrt: &Quantity) -> Expr {
        Expr::Derivative(Derivative {
            of: of.clone(),
            wrt: wrt.clone(),
        })
    }

    /// Left fold of `+` over `terms`; an empty sequence yields `0`.
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut iter = terms.into_iter();
        match iter.next() {
            Some(first) => iter.fold(first, |acc, t| acc + t),
            None => Expr::zero(),
        }
    }

    pub fn pow(self, exp: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Pow, self, exp.into())
    }

    pub fn min(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Min, self, other.into())
    }

    pub fn max(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(BinaryOp::Max, self, other.into())
    }

    pub fn sin(self) -> Expr {
        Expr::unary(UnaryOp::Sin, self)
    }

    pub fn cos(self) -> Expr {
        Expr::unary(UnaryOp::Cos, self)
    }

    pub fn tan(self) -> Expr {
        Expr::unary(UnaryOp::Tan, self)
    }

    pub fn exp(self) -> Expr {
        Expr::unary(UnaryOp::Exp, self)
    }

    pub fn ln(self) -> Expr {
        Expr::unary(UnaryOp::Ln, self)
    }

    pub fn sqrt(self) -> Expr {
        Expr::unary(UnaryOp::Sqrt, self)
    }

    pub fn abs(self) -> Expr {
        Expr::unary(UnaryOp::Abs, self)
    }

    /// Build the relation `self == rhs`.
    pub fn equals(self, rhs: impl Into<Expr>) -> Relation {
        Relation {
            lhs: self,
            rhs: rhs.into(),
        }
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Num(v)
    }
}

impl From<&Quantity> for Expr {
    fn from(q: &Quantity) -> Self {
        Expr::Quantity(q.clone())
    }
}

impl From<Quantity> for Expr {
    fn from(q: Quantity) -> Self {
        Expr::Quantity(q)
    }
}

/// Symbolic handles on quantities.
pub trait Symbolic {
    /// Leaf expression referring to this quantity.
    fn sym(&self) -> Expr;

    /// Time derivative of this quantity with respect to `wrt`.
    fn diff(&self, wrt: &Quantity) -> Expr;
}

impl Symbolic for Quantity {
    fn sym(&self) -> Expr {
        Expr::Quantity(self.clone())
    }

    fn diff(&self, wrt: &Quantity) -> Expr {
        Expr::derivative(self, wrt)
    }
}

/// An equality `lhs == rhs`. A bare expression `e` stands for `e == 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Relation {
    /// `lhs - rhs`, without a trailing `- 0`.
    pub fn residual(&self) -> Expr {
        if self.rhs.is_zero() {
            self.lhs.clone()
        } else {
            self.lhs.clone() - self.rhs.clone()
        }
    }
}

impl From<Expr> for Relation {
    fn from(lhs: Expr) -> Self {
        Relation {
            lhs,
            rhs: Expr::zero(),
        }
    }
}

macro_rules! impl_binary_ops {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl $trait for Expr {
                type Output = Expr;
                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binary($op, self, rhs)
                }
            }

            impl $trait<f64> for Expr {
                type Output = Expr;
                fn $method(self, rhs: f64) -> Expr {
                    Expr::binary($op, self, Expr::Num(rhs))
                }
            }

            impl $trait<Expr> for f64 {
                type Output = Expr;
                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binary($op, Expr::Num(self), rhs)
                }
            }
        )*
    };
}

impl_binary_ops! {
    Add::add => BinaryOp::Add,
    Sub::sub => BinaryOp::Sub,
    Mul::mul => BinaryOp::Mul,
    Div::div => BinaryOp::Div,
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::{QuantityKind, si};

    fn var(name: &str) -> Quantity {
        Quantity::new(QuantityKind::Variable, name, "M", si::DIMENSIONLESS, "")
    }

    #[test]
    fn operators_build_trees() {
        let a = var("a");
        let b = var("b");
        let e = a.sym() + b.sym() * 2.0 - 1.0;
        match &e {
            Expr::Binary(BinaryOp::Sub, lhs, rhs) => {
                assert_eq!(**rhs, Expr::Num(1.0));
                assert!(matches!(**lhs, Expr::Binary(BinaryOp::Add, _, _)));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn structural_equality_uses_identity() {
        let a = var("a");
        let a_twin = var("a");
        assert_eq!(a.sym() - 1.0, a.sym() - 1.0);
        assert_ne!(a.sym() - 1.0, a_twin.sym() - 1.0);
    }

    #[test]
    fn sum_folds_left() {
        let (a, b, c) = (var("a"), var("b"), var("c"));
        assert_eq!(Expr::sum([a.sym()]), a.sym());
        assert_eq!(
            Expr::sum([a.sym(), b.sym(), c.sym()]),
            (a.sym() + b.sym()) + c.sym()
        );
        assert!(Expr::sum(Vec::new()).is_zero());
    }

    #[test]
    fn bare_expression_is_relation_to_zero() {
        let a = var("a");
        let rel: Relation = (a.sym() - 1.0).into();
        assert!(rel.rhs.is_zero());
        assert_eq!(rel.residual(), a.sym() - 1.0);

        let rel = a.sym().equals(3.0);
        assert_eq!(rel.residual(), a.sym() - Expr::Num(3.0));
    }
}
