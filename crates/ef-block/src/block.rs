//! Equation blocks: the flat equation set of a problem.
//!
//! A block partitions its equations by type, derives the time variables and
//! the positional orderings of variables and derivatives, and compiles the
//! whole set into a numeric residual function.

use core::fmt;
use core::str::FromStr;

use ef_core::{CoreError, NamedMap, Quantity};
use ef_expr::Expr;
use ef_model::{Equation, EquationType, Form, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlockError, BlockResult};
use crate::indexing::{DerivativeIndexMap, VariableIndexMap};

/// Kind of system a block forms, from which groups are non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemType {
    /// Differential equations only.
    Differential,
    /// Differential plus linear or nonlinear equations.
    DifferentialAlgebraic,
    /// Nonlinear algebraic, no differential equations.
    Nonlinear,
    /// Linear algebraic only.
    Linear,
}

impl ProblemType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProblemType::Differential => "differential",
            ProblemType::DifferentialAlgebraic => "differential-algebraic",
            ProblemType::Nonlinear => "nonlinear",
            ProblemType::Linear => "linear",
        }
    }

    pub fn is_differential(self) -> bool {
        matches!(
            self,
            ProblemType::Differential | ProblemType::DifferentialAlgebraic
        )
    }

    /// Infer from group sizes. `None` when the block is empty.
    pub fn infer(linear: usize, nonlinear: usize, differential: usize) -> Option<Self> {
        match (differential > 0, linear > 0 || nonlinear > 0) {
            (true, false) => Some(ProblemType::Differential),
            (true, true) => Some(ProblemType::DifferentialAlgebraic),
            (false, _) if nonlinear > 0 => Some(ProblemType::Nonlinear),
            (false, _) if linear > 0 => Some(ProblemType::Linear),
            _ => None,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "differential" => Ok(ProblemType::Differential),
            "differential-algebraic" => Ok(ProblemType::DifferentialAlgebraic),
            "nonlinear" => Ok(ProblemType::Nonlinear),
            "linear" => Ok(ProblemType::Linear),
            other => Err(CoreError::unexpected(
                other,
                "[differential, differential-algebraic, nonlinear, linear]",
            )),
        }
    }
}

/// Positions (into the block's equation list) of each type group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EquationGroups {
    pub linear: Vec<usize>,
    pub nonlinear: Vec<usize>,
    pub differential: Vec<usize>,
}

impl EquationGroups {
    pub fn get(&self, kind: EquationType) -> &[usize] {
        match kind {
            EquationType::Linear => &self.linear,
            EquationType::Nonlinear => &self.nonlinear,
            EquationType::Differential => &self.differential,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EquationBlock {
    equations: Vec<Equation>,
    /// qualified key -> variable
    variables: NamedMap<Quantity>,
    /// qualified key -> parameter
    parameters: NamedMap<Quantity>,
    time_variable_names: Vec<String>,
    groups: EquationGroups,
    time_variables: Vec<Quantity>,
    variable_index: VariableIndexMap,
    derivative_index: DerivativeIndexMap,
    classified: bool,
}

impl EquationBlock {
    /// Build an unclassified block. Equation order defines slot assignment.
    pub fn new(
        equations: Vec<Equation>,
        variables: NamedMap<Quantity>,
        parameters: NamedMap<Quantity>,
    ) -> Self {
        Self {
            equations,
            variables,
            parameters,
            time_variable_names: Vec::new(),
            groups: EquationGroups::default(),
            time_variables: Vec::new(),
            variable_index: VariableIndexMap::new(),
            derivative_index: DerivativeIndexMap::new(),
            classified: false,
        }
    }

    /// Names (bare or qualified) of variables that stand for time even when
    /// no derivative is taken with respect to them.
    pub fn with_time_variable_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_variable_names = names.into_iter().map(Into::into).collect();
        self.classified = false;
        self
    }

    /// Partition the equations and derive time variables and index maps.
    /// Re-running on an unchanged block reproduces the same result.
    pub fn classify(&mut self) {
        let mut groups = EquationGroups::default();
        for (i, eq) in self.equations.iter().enumerate() {
            match eq.kind() {
                EquationType::Linear => groups.linear.push(i),
                EquationType::Nonlinear => groups.nonlinear.push(i),
                EquationType::Differential => groups.differential.push(i),
            }
        }
        self.groups = groups;
        self.time_variables = self.find_time_variables();
        self.variable_index = self.build_variable_index_map();
        self.derivative_index = self.build_derivative_index_map();
        self.classified = true;
        debug!(
            equations = self.equations.len(),
            linear = self.groups.linear.len(),
            nonlinear = self.groups.nonlinear.len(),
            differential = self.groups.differential.len(),
            variables = self.variable_index.len(),
            derivatives = self.derivative_index.len(),
            "equation block classified"
        );
    }

    pub fn is_classified(&self) -> bool {
        self.classified
    }

    fn differential_equations(&self) -> impl Iterator<Item = &Equation> {
        self.groups
            .differential
            .iter()
            .filter_map(|&i| self.equations.get(i))
    }

    fn is_time_name(&self, q: &Quantity) -> bool {
        self.time_variable_names
            .iter()
            .any(|n| n == q.name() || *n == q.key())
    }

    fn find_time_variables(&self) -> Vec<Quantity> {
        let mut found: Vec<Quantity> = Vec::new();
        let mut push = |q: Quantity| {
            if self.is_declared_variable(&q) && !found.contains(&q) {
                found.push(q);
            }
        };
        for eq in self.differential_equations() {
            for d in eq.residual().derivatives() {
                push(d.wrt);
            }
        }
        for eq in &self.equations {
            for q in eq.quantities() {
                if self.is_time_name(&q) {
                    push(q);
                }
            }
        }
        for q in self.variables.values() {
            if self.is_time_name(q) {
                push(q.clone());
            }
        }
        found
    }

    fn is_declared_variable(&self, q: &Quantity) -> bool {
        q.is_variable() && self.variables.get(&q.key()) == Some(q)
    }

    fn is_declared_parameter(&self, q: &Quantity) -> bool {
        q.is_parameter() && self.parameters.get(&q.key()) == Some(q)
    }

    /// Slots for the state vector.
    ///
    /// Variables are taken equation by equation in first-seen order, then any
    /// declared variable no equation mentions. Time variables get no slot
    /// when the block has differential equations.
    pub fn build_variable_index_map(&self) -> VariableIndexMap {
        let skip_time = !self.groups.differential.is_empty();
        let mut map = VariableIndexMap::new();
        let referenced = self.equations.iter().flat_map(Equation::quantities);
        let declared = self.variables.values().cloned();
        for q in referenced.chain(declared) {
            if !self.is_declared_variable(&q) {
                continue;
            }
            if skip_time && self.time_variables.contains(&q) {
                continue;
            }
            map.insert(&q);
        }
        map
    }

    /// Slots for the rate vector: distinct derivatives of the differential
    /// group in first-seen order.
    pub fn build_derivative_index_map(&self) -> DerivativeIndexMap {
        let mut map = DerivativeIndexMap::new();
        for eq in self.differential_equations() {
            for d in eq.residual().derivatives() {
                map.insert(&d);
            }
        }
        map
    }

    /// Switch every differential equation to residual form. Nothing is
    /// converted unless all of them validate.
    pub fn to_residual_form(&self) -> BlockResult<()> {
        for eq in self.differential_equations() {
            eq.residual_derivatives()?;
        }
        for eq in self.differential_equations() {
            eq.to_residual_form()?;
        }
        Ok(())
    }

    /// True if a top-level member of some equation (optionally only in
    /// `group`) references one of `names` outside any derivative.
    pub fn has_variable_been_declared(&self, names: &[&str], group: Option<EquationType>) -> bool {
        let in_group = |eq: &&Equation| group.is_none_or(|kind| eq.kind() == kind);
        self.equations.iter().filter(in_group).any(|eq| {
            let lhs = eq.expression(None, Side::Lhs);
            let rhs = eq.expression(None, Side::Rhs);
            lhs.additive_terms()
                .into_iter()
                .chain(rhs.additive_terms())
                .any(|term| {
                    !term.expr.contains_derivative()
                        && names.iter().any(|n| term.expr.references_name(n))
                })
        })
    }

    /// 1.0 for differential equations, 0.0 otherwise, in block order.
    pub fn differential_flags(&self) -> Vec<f64> {
        self.equations
            .iter()
            .map(|eq| if eq.is_differential() { 1.0 } else { 0.0 })
            .collect()
    }

    /// One side of every equation, in block order.
    pub fn equation_list(&self, form: Option<Form>, side: Side) -> Vec<Expr> {
        self.equations
            .iter()
            .map(|eq| eq.expression(form, side))
            .collect()
    }

    pub fn problem_type(&self) -> Option<ProblemType> {
        ProblemType::infer(
            self.groups.linear.len(),
            self.groups.nonlinear.len(),
            self.groups.differential.len(),
        )
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    /// Equations of one type group, in block order.
    pub fn group(&self, kind: EquationType) -> Vec<&Equation> {
        self.groups
            .get(kind)
            .iter()
            .filter_map(|&i| self.equations.get(i))
            .collect()
    }

    pub fn groups(&self) -> &EquationGroups {
        &self.groups
    }

    pub fn variables(&self) -> &NamedMap<Quantity> {
        &self.variables
    }

    pub fn parameters(&self) -> &NamedMap<Quantity> {
        &self.parameters
    }

    pub fn time_variables(&self) -> &[Quantity] {
        &self.time_variables
    }

    pub fn variable_index_map(&self) -> &VariableIndexMap {
        &self.variable_index
    }

    pub fn derivative_index_map(&self) -> &DerivativeIndexMap {
        &self.derivative_index
    }

    pub(crate) fn ensure_classified(&self) -> BlockResult<()> {
        if self.classified {
            Ok(())
        } else {
            Err(BlockError::Classification {
                what: "block has not been classified".into(),
            })
        }
    }

    pub(crate) fn knows_parameter(&self, q: &Quantity) -> bool {
        self.is_declared_parameter(q)
    }

    pub(crate) fn is_time_variable(&self, q: &Quantity) -> bool {
        self.time_variables.contains(q)
    }
}
