//! Named symbolic equations.
//!
//! An equation keeps its declared relation for its whole life. Conversion to
//! residual form only flips the active form; the residual expression is
//! always `lhs - rhs` (or `lhs` when the right-hand side is zero).

use core::fmt;
use core::str::FromStr;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use ef_core::{CoreError, Quantity, WeakQuantity};
use ef_expr::{CurrentValues, Derivative, Expr, ExprResult, Relation};

use crate::error::{ModelError, ModelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EquationType {
    Linear,
    Nonlinear,
    Differential,
}

impl EquationType {
    pub fn as_str(self) -> &'static str {
        match self {
            EquationType::Linear => "linear",
            EquationType::Nonlinear => "nonlinear",
            EquationType::Differential => "differential",
        }
    }

    /// Classify a relation by inspecting both sides.
    pub fn of(relation: &Relation) -> Self {
        if relation.lhs.contains_derivative() || relation.rhs.contains_derivative() {
            EquationType::Differential
        } else if relation.lhs.is_linear() && relation.rhs.is_linear() {
            EquationType::Linear
        } else {
            EquationType::Nonlinear
        }
    }
}

impl fmt::Display for EquationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquationType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(EquationType::Linear),
            "nonlinear" => Ok(EquationType::Nonlinear),
            "differential" => Ok(EquationType::Differential),
            other => Err(CoreError::unexpected(
                other,
                "[linear, nonlinear, differential]",
            )),
        }
    }
}

/// Which form of an equation to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Form {
    /// As declared: `lhs == rhs`.
    Elementary,
    /// `lhs - rhs == 0`.
    Residual,
}

impl Form {
    pub fn as_str(self) -> &'static str {
        match self {
            Form::Elementary => "elementary",
            Form::Residual => "residual",
        }
    }
}

impl FromStr for Form {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "elementary" => Ok(Form::Elementary),
            "residual" => Ok(Form::Residual),
            other => Err(CoreError::unexpected(other, "[elementary, residual]")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Lhs,
    Rhs,
}

impl FromStr for Side {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lhs" => Ok(Side::Lhs),
            "rhs" => Ok(Side::Rhs),
            other => Err(CoreError::unexpected(other, "[lhs, rhs]")),
        }
    }
}

#[derive(Debug)]
struct EquationData {
    name: String,
    description: String,
    relation: Relation,
    kind: EquationType,
    form: Cell<Form>,
    check_equation: bool,
    quantities: Vec<WeakQuantity>,
}

/// Shared handle to an equation. Models and blocks hold clones of the same
/// equation, so a residual conversion done through a block is visible from
/// the owning model.
#[derive(Clone, Debug)]
pub struct Equation(Rc<EquationData>);

impl Equation {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        relation: impl Into<Relation>,
    ) -> Self {
        Self::build(name.into(), description.into(), relation.into(), true)
    }

    /// An equation generated to couple models. Skipped by unused-quantity
    /// diagnostics.
    pub fn coupling(
        name: impl Into<String>,
        description: impl Into<String>,
        relation: impl Into<Relation>,
    ) -> Self {
        Self::build(name.into(), description.into(), relation.into(), false)
    }

    fn build(name: String, description: String, relation: Relation, check_equation: bool) -> Self {
        let kind = EquationType::of(&relation);
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        relation.lhs.collect_quantities(&mut seen, &mut found);
        relation.rhs.collect_quantities(&mut seen, &mut found);
        let quantities = found.iter().map(Quantity::downgrade).collect();
        Self(Rc::new(EquationData {
            name,
            description,
            relation,
            kind,
            form: Cell::new(Form::Elementary),
            check_equation,
            quantities,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    pub fn kind(&self) -> EquationType {
        self.0.kind
    }

    pub fn is_differential(&self) -> bool {
        self.0.kind == EquationType::Differential
    }

    pub fn form(&self) -> Form {
        self.0.form.get()
    }

    pub fn check_equation(&self) -> bool {
        self.0.check_equation
    }

    /// The relation as declared.
    pub fn relation(&self) -> &Relation {
        &self.0.relation
    }

    /// `lhs - rhs`, independent of the active form.
    pub fn residual(&self) -> Expr {
        self.0.relation.residual()
    }

    /// One side of the equation in `form` (the active form when `None`).
    pub fn expression(&self, form: Option<Form>, side: Side) -> Expr {
        match (form.unwrap_or(self.form()), side) {
            (Form::Elementary, Side::Lhs) => self.0.relation.lhs.clone(),
            (Form::Elementary, Side::Rhs) => self.0.relation.rhs.clone(),
            (Form::Residual, Side::Lhs) => self.residual(),
            (Form::Residual, Side::Rhs) => Expr::zero(),
        }
    }

    /// Switch the active form to residual. A no-op when already residual.
    ///
    /// Differential equations are checked first: every top-level term of the
    /// residual holding a derivative must be that derivative, optionally
    /// negated or scaled by a known coefficient, and each distinct derivative
    /// may appear in one term only.
    pub fn to_residual_form(&self) -> ModelResult<()> {
        if self.form() == Form::Residual {
            return Ok(());
        }
        if self.is_differential() {
            self.residual_derivatives()?;
        }
        self.0.form.set(Form::Residual);
        Ok(())
    }

    /// Derivatives of the residual, one per top-level term, in first-seen order.
    pub fn residual_derivatives(&self) -> ModelResult<Vec<Derivative>> {
        let residual = self.residual();
        let mut found: Vec<Derivative> = Vec::new();
        for term in residual.additive_terms() {
            if !term.expr.contains_derivative() {
                continue;
            }
            let derivative = scaled_derivative(term.expr).ok_or_else(|| {
                self.classification(format!(
                    "derivative nested inside term {}",
                    term.expr
                ))
            })?;
            if found.iter().any(|d| d.key() == derivative.key()) {
                return Err(self.classification(format!(
                    "{derivative} appears in more than one term"
                )));
            }
            found.push(derivative.clone());
        }
        if found.is_empty() {
            return Err(self.classification("differential equation without a derivative term".into()));
        }
        Ok(found)
    }

    fn classification(&self, what: String) -> ModelError {
        ModelError::Classification {
            equation: self.0.name.clone(),
            what,
        }
    }

    /// Participating quantities still alive, in first-seen order.
    pub fn quantities(&self) -> Vec<Quantity> {
        self.0.quantities.iter().filter_map(WeakQuantity::upgrade).collect()
    }

    pub fn quantity_refs(&self) -> &[WeakQuantity] {
        &self.0.quantities
    }

    pub fn references(&self, q: &Quantity) -> bool {
        self.0.quantities.iter().any(|w| w.id() == q.id())
    }

    /// Residual evaluated at the quantities' stored values.
    pub fn evaluate_residual(&self) -> ExprResult<f64> {
        self.residual().eval(&CurrentValues)
    }

    pub fn ptr_eq(&self, other: &Equation) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.form() {
            Form::Elementary => write!(f, "{} == {}", self.0.relation.lhs, self.0.relation.rhs),
            Form::Residual => write!(f, "{} == 0", self.residual()),
        }
    }
}

/// The derivative of a term shaped `d`, `-d`, `k*d`, `d*k` or `d/k` with `k`
/// free of unknowns.
fn scaled_derivative(expr: &Expr) -> Option<&Derivative> {
    use ef_expr::{BinaryOp, UnaryOp};
    match expr {
        Expr::Derivative(d) => Some(d),
        Expr::Unary(UnaryOp::Neg, arg) => scaled_derivative(arg),
        Expr::Binary(BinaryOp::Mul, lhs, rhs) => {
            if !lhs.has_unknowns() {
                scaled_derivative(rhs)
            } else if !rhs.has_unknowns() {
                scaled_derivative(lhs)
            } else {
                None
            }
        }
        Expr::Binary(BinaryOp::Div, lhs, rhs) if !rhs.has_unknowns() => scaled_derivative(lhs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::{QuantityKind, si};
    use ef_expr::Symbolic;

    fn q(kind: QuantityKind, name: &str) -> Quantity {
        Quantity::new(kind, name, "L0", si::DIMENSIONLESS, "")
    }

    #[test]
    fn classifies_by_tree_shape() {
        let a = q(QuantityKind::Variable, "a");
        let b = q(QuantityKind::Variable, "b");
        let d = q(QuantityKind::Constant, "d");
        let t = q(QuantityKind::Variable, "t");

        let lin = Equation::new("e1", "", a.sym() + d.sym() * b.sym() - 1.0);
        assert_eq!(lin.kind(), EquationType::Linear);

        let nl = Equation::new("e2", "", (a.sym() * b.sym()).equals(2.0));
        assert_eq!(nl.kind(), EquationType::Nonlinear);

        let diff = Equation::new("e3", "", a.diff(&t).equals(-2.0 * a.sym()));
        assert_eq!(diff.kind(), EquationType::Differential);
    }

    #[test]
    fn records_quantities_in_first_seen_order() {
        let a = q(QuantityKind::Variable, "a");
        let c = q(QuantityKind::Variable, "c");
        let d = q(QuantityKind::Constant, "d");
        let eq = Equation::new("e", "", (c.sym() * d.sym()).equals(a.sym() + c.sym()));
        let names: Vec<_> = eq.quantities().iter().map(|x| x.name().to_owned()).collect();
        assert_eq!(names, ["c", "d", "a"]);
        assert!(eq.references(&a));
    }

    #[test]
    fn residual_conversion_is_idempotent_and_keeps_declared_form() {
        let y = q(QuantityKind::Variable, "y");
        let t = q(QuantityKind::Variable, "t");
        let eq = Equation::new("dy", "", y.diff(&t).equals(-2.0 * y.sym()));

        eq.to_residual_form().unwrap();
        let once = eq.expression(None, Side::Lhs);
        eq.to_residual_form().unwrap();
        assert_eq!(eq.expression(None, Side::Lhs), once);
        assert_eq!(once, y.diff(&t) - (-2.0 * y.sym()));
        assert!(eq.expression(None, Side::Rhs).is_zero());

        assert_eq!(eq.form(), Form::Residual);
        assert_eq!(eq.expression(Some(Form::Elementary), Side::Lhs), y.diff(&t));
    }

    #[test]
    fn zero_rhs_residual_is_lhs() {
        let a = q(QuantityKind::Variable, "a");
        let eq = Equation::new("e", "", a.sym() - 1.0);
        eq.to_residual_form().unwrap();
        assert_eq!(eq.residual(), a.sym() - 1.0);
    }

    #[test]
    fn scaled_and_negated_derivatives_are_accepted() {
        let x = q(QuantityKind::Variable, "x");
        let t = q(QuantityKind::Variable, "t");
        let tau = q(QuantityKind::Parameter, "tau");
        let eq = Equation::new("e", "", (tau.sym() * x.diff(&t)).equals(1.0 - x.sym()));
        assert_eq!(eq.residual_derivatives().unwrap().len(), 1);

        let eq = Equation::new("e", "", (-x.diff(&t) / 2.0).equals(x.sym()));
        assert!(eq.to_residual_form().is_ok());
    }

    #[test]
    fn nested_or_repeated_derivatives_fail() {
        let x = q(QuantityKind::Variable, "x");
        let y = q(QuantityKind::Variable, "y");
        let t = q(QuantityKind::Variable, "t");

        let nested = Equation::new("n", "", x.diff(&t).sin().equals(y.sym()));
        assert!(matches!(
            nested.to_residual_form(),
            Err(ModelError::Classification { .. })
        ));
        assert_eq!(nested.form(), Form::Elementary);

        let product = Equation::new("p", "", (y.sym() * x.diff(&t)).equals(1.0));
        assert!(product.to_residual_form().is_err());

        let twice = Equation::new("r", "", x.diff(&t).equals(y.sym() - x.diff(&t)));
        let err = twice.to_residual_form().unwrap_err();
        assert!(err.to_string().contains("more than one term"));
    }

    #[test]
    fn parses_enumerated_names() {
        assert_eq!("residual".parse::<Form>().unwrap(), Form::Residual);
        assert_eq!("rhs".parse::<Side>().unwrap(), Side::Rhs);
        assert!(matches!(
            "algebraic".parse::<EquationType>(),
            Err(CoreError::UnexpectedValue { .. })
        ));
    }
}
