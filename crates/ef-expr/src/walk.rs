//! Read-only traversals.
//!
//! All walks are pre-order and left-to-right, so "first-seen" orderings are a
//! pure function of the tree shape.

use std::collections::HashSet;

use ef_core::{Quantity, QuantityId};

use crate::expr::{BinaryOp, Derivative, Expr, Slot, UnaryOp};

/// One top-level additive term of an expression, with its sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Term<'a> {
    pub negated: bool,
    pub expr: &'a Expr,
}

impl Expr {
    /// Visit every node, parents before children.
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        match self {
            Expr::Unary(_, arg) => arg.visit(f),
            Expr::Binary(_, lhs, rhs) => {
                lhs.visit(f);
                rhs.visit(f);
            }
            Expr::Num(_) | Expr::Quantity(_) | Expr::Slot(_) | Expr::Derivative(_) => {}
        }
    }

    /// True if any node satisfies `pred`.
    pub fn any<F: Fn(&Expr) -> bool>(&self, pred: F) -> bool {
        let mut found = false;
        self.visit(&mut |node| {
            if !found && pred(node) {
                found = true;
            }
        });
        found
    }

    /// Append quantities not yet in `seen` to `out`, in first-seen order.
    ///
    /// For a derivative the differentiated quantity comes before the
    /// independent one.
    pub fn collect_quantities(&self, seen: &mut HashSet<QuantityId>, out: &mut Vec<Quantity>) {
        let mut push = |q: &Quantity| {
            if seen.insert(q.id()) {
                out.push(q.clone());
            }
        };
        self.visit(&mut |node| match node {
            Expr::Quantity(q) => push(q),
            Expr::Derivative(d) => {
                push(&d.of);
                push(&d.wrt);
            }
            _ => {}
        });
    }

    /// Distinct quantities in first-seen order.
    pub fn quantities(&self) -> Vec<Quantity> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_quantities(&mut seen, &mut out);
        out
    }

    /// Distinct derivative markers in first-seen order.
    pub fn derivatives(&self) -> Vec<Derivative> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.visit(&mut |node| {
            if let Expr::Derivative(d) = node {
                if seen.insert(d.key()) {
                    out.push(d.clone());
                }
            }
        });
        out
    }

    pub fn contains_derivative(&self) -> bool {
        self.any(|node| matches!(node, Expr::Derivative(_)))
    }

    /// True if the tree references `q` (directly or through a derivative).
    pub fn references(&self, q: &Quantity) -> bool {
        self.any(|node| match node {
            Expr::Quantity(x) => x == q,
            Expr::Derivative(d) => &d.of == q || &d.wrt == q,
            _ => false,
        })
    }

    /// True if the tree references a quantity whose name or qualified key is `name`.
    pub fn references_name(&self, name: &str) -> bool {
        self.any(|node| match node {
            Expr::Quantity(q) => q.name() == name || q.key() == name,
            _ => false,
        })
    }

    /// True if the tree depends on an unknown: a variable, a derivative, or a
    /// state/rate slot.
    pub fn has_unknowns(&self) -> bool {
        self.any(|node| match node {
            Expr::Quantity(q) => q.is_variable(),
            Expr::Derivative(_) => true,
            Expr::Slot(Slot::State(_) | Slot::Rate(_)) => true,
            _ => false,
        })
    }

    /// True if the expression is affine in its unknowns.
    ///
    /// A product is linear when at most one factor carries unknowns, a
    /// quotient when the denominator is free of them. Powers, `min`, `max`
    /// and elementary functions are linear only when their arguments are
    /// known.
    pub fn is_linear(&self) -> bool {
        match self {
            Expr::Num(_) | Expr::Quantity(_) | Expr::Slot(_) | Expr::Derivative(_) => true,
            Expr::Unary(UnaryOp::Neg, arg) => arg.is_linear(),
            Expr::Unary(_, arg) => !arg.has_unknowns(),
            Expr::Binary(op, lhs, rhs) => match op {
                BinaryOp::Add | BinaryOp::Sub => lhs.is_linear() && rhs.is_linear(),
                BinaryOp::Mul => {
                    lhs.is_linear()
                        && rhs.is_linear()
                        && !(lhs.has_unknowns() && rhs.has_unknowns())
                }
                BinaryOp::Div => lhs.is_linear() && !rhs.has_unknowns(),
                BinaryOp::Pow | BinaryOp::Min | BinaryOp::Max => {
                    !lhs.has_unknowns() && !rhs.has_unknowns()
                }
            },
        }
    }

    /// Flatten top-level `+`, `-` and negation into signed terms.
    pub fn additive_terms(&self) -> Vec<Term<'_>> {
        let mut out = Vec::new();
        collect_terms(self, false, &mut out);
        out
    }
}

fn collect_terms<'a>(expr: &'a Expr, negated: bool, out: &mut Vec<Term<'a>>) {
    match expr {
        Expr::Binary(BinaryOp::Add, lhs, rhs) => {
            collect_terms(lhs, negated, out);
            collect_terms(rhs, negated, out);
        }
        Expr::Binary(BinaryOp::Sub, lhs, rhs) => {
            collect_terms(lhs, negated, out);
            collect_terms(rhs, !negated, out);
        }
        Expr::Unary(UnaryOp::Neg, arg) => collect_terms(arg, !negated, out),
        _ => out.push(Term {
            negated,
            expr,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Symbolic;
    use ef_core::{QuantityKind, si};

    fn q(kind: QuantityKind, name: &str) -> Quantity {
        Quantity::new(kind, name, "L0", si::DIMENSIONLESS, "")
    }

    #[test]
    fn first_seen_order_is_preorder() {
        let a = q(QuantityKind::Variable, "a");
        let b = q(QuantityKind::Variable, "b");
        let c = q(QuantityKind::Variable, "c");
        let e = b.sym() * (a.sym() + b.sym()) - c.sym() * a.sym();
        let names: Vec<_> = e.quantities().iter().map(|x| x.name().to_owned()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn derivative_lists_of_before_wrt() {
        let y = q(QuantityKind::Variable, "y");
        let t = q(QuantityKind::Variable, "t");
        let e = y.diff(&t) + 2.0 * y.sym();
        let names: Vec<_> = e.quantities().iter().map(|x| x.name().to_owned()).collect();
        assert_eq!(names, ["y", "t"]);
        assert_eq!(e.derivatives().len(), 1);
        assert!(e.contains_derivative());
    }

    #[test]
    fn linearity_treats_known_values_as_coefficients() {
        let a = q(QuantityKind::Variable, "a");
        let c = q(QuantityKind::Variable, "c");
        let d = q(QuantityKind::Constant, "d");
        let k = q(QuantityKind::Parameter, "k");

        assert!((a.sym() + c.sym() * d.sym() - 2.0).is_linear());
        assert!((k.sym() * a.sym() / d.sym()).is_linear());
        assert!((d.sym().sin() * a.sym()).is_linear());

        assert!(!(a.sym() * c.sym()).is_linear());
        assert!(!(a.sym() / c.sym()).is_linear());
        assert!(!a.sym().pow(2.0).is_linear());
        assert!(!a.sym().exp().is_linear());
        assert!(!a.sym().max(0.0).is_linear());
    }

    #[test]
    fn additive_terms_track_sign() {
        let a = q(QuantityKind::Variable, "a");
        let b = q(QuantityKind::Variable, "b");
        let c = q(QuantityKind::Variable, "c");
        let e = a.sym() - (b.sym() - c.sym()) + -(a.sym() * b.sym());
        let signs: Vec<bool> = e.additive_terms().iter().map(|t| t.negated).collect();
        assert_eq!(signs, [false, true, false, true]);
        assert_eq!(*e.additive_terms()[2].expr, c.sym());
    }

    #[test]
    fn references_by_bare_or_qualified_name() {
        let a = q(QuantityKind::Variable, "a");
        let e = a.sym() + 1.0;
        assert!(e.references_name("a"));
        assert!(e.references_name("a@L0"));
        assert!(!e.references_name("b"));
        assert!(e.references(&a));
    }
}
