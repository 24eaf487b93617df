//! Models: named quantities, equations and their exposed interface.

use std::collections::HashSet;
use std::rc::Rc;

use ef_core::{NamedMap, Quantity, QuantityKind, Unit};
use ef_expr::Relation;
use tracing::{debug, warn};

use crate::capability::{DeclareEquations, MultiPhase, PhaseFractionSum};
use crate::connection::Exposure;
use crate::equation::Equation;
use crate::error::{ModelError, ModelResult};
use crate::phase::PhaseList;

pub struct Model {
    name: String,
    description: String,
    variables: NamedMap<Quantity>,
    parameters: NamedMap<Quantity>,
    constants: NamedMap<Quantity>,
    equations: NamedMap<Equation>,
    inputs: NamedMap<Quantity>,
    outputs: NamedMap<Quantity>,
    contributors: Vec<Rc<dyn DeclareEquations>>,
    multiphase: Option<MultiPhase>,
    ignore_variable_warning: bool,
    ignore_equation_warning: bool,
}

impl Model {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            variables: NamedMap::new(),
            parameters: NamedMap::new(),
            constants: NamedMap::new(),
            equations: NamedMap::new(),
            inputs: NamedMap::new(),
            outputs: NamedMap::new(),
            contributors: Vec::new(),
            multiphase: None,
            ignore_variable_warning: false,
            ignore_equation_warning: false,
        }
    }

    /// A model with the multiphase capability over `phases`.
    pub fn with_phases(
        name: impl Into<String>,
        description: impl Into<String>,
        phases: PhaseList,
    ) -> Self {
        let mut model = Self::new(name, description);
        model.multiphase = Some(MultiPhase::new(phases));
        model
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn multiphase(&self) -> Option<&MultiPhase> {
        self.multiphase.as_ref()
    }

    pub fn set_ignore_variable_warning(&mut self, ignore: bool) {
        self.ignore_variable_warning = ignore;
    }

    pub fn set_ignore_equation_warning(&mut self, ignore: bool) {
        self.ignore_equation_warning = ignore;
    }

    // ---- quantities ----

    fn create_quantity(
        &mut self,
        kind: QuantityKind,
        name: &str,
        unit: Unit,
        description: &str,
    ) -> ModelResult<Quantity> {
        if self.quantity(name).is_some() {
            return Err(ModelError::DuplicateName {
                model: self.name.clone(),
                name: name.to_owned(),
            });
        }
        let q = Quantity::new(kind, name, self.name.as_str(), unit, description);
        let map = match kind {
            QuantityKind::Variable => &mut self.variables,
            QuantityKind::Parameter => &mut self.parameters,
            QuantityKind::Constant => &mut self.constants,
        };
        map.insert(name, q.clone());
        Ok(q)
    }

    pub fn create_variable(
        &mut self,
        name: &str,
        unit: Unit,
        description: &str,
    ) -> ModelResult<Quantity> {
        self.create_quantity(QuantityKind::Variable, name, unit, description)
    }

    pub fn create_parameter(
        &mut self,
        name: &str,
        unit: Unit,
        description: &str,
    ) -> ModelResult<Quantity> {
        self.create_quantity(QuantityKind::Parameter, name, unit, description)
    }

    /// Constants carry their value from creation.
    pub fn create_constant(
        &mut self,
        name: &str,
        unit: Unit,
        description: &str,
        value: f64,
    ) -> ModelResult<Quantity> {
        let q = self.create_quantity(QuantityKind::Constant, name, unit, description)?;
        if let Err(e) = q.set_value(value) {
            self.constants.shift_remove(name);
            return Err(e.into());
        }
        Ok(q)
    }

    pub fn create_exposed_variable(
        &mut self,
        name: &str,
        unit: Unit,
        description: &str,
        exposure: Exposure,
    ) -> ModelResult<Quantity> {
        let q = self.create_variable(name, unit, description)?;
        self.expose(&q, exposure)?;
        Ok(q)
    }

    /// Mark one of this model's variables as an input or an output.
    pub fn expose(&mut self, q: &Quantity, exposure: Exposure) -> ModelResult<()> {
        let invalid = |what| ModelError::InvalidExposure {
            quantity: q.key(),
            model: self.name.clone(),
            what,
        };
        if self.variables.get(q.name()) != Some(q) {
            return Err(invalid("not a variable of this model"));
        }
        if self.is_exposed(q, exposure.opposite()) {
            return Err(invalid("already exposed in the other direction"));
        }
        let map = match exposure {
            Exposure::Input => &mut self.inputs,
            Exposure::Output => &mut self.outputs,
        };
        map.insert(q.name(), q.clone());
        Ok(())
    }

    pub fn is_exposed(&self, q: &Quantity, exposure: Exposure) -> bool {
        let map = match exposure {
            Exposure::Input => &self.inputs,
            Exposure::Output => &self.outputs,
        };
        map.get(q.name()) == Some(q)
    }

    pub fn inputs(&self) -> &NamedMap<Quantity> {
        &self.inputs
    }

    pub fn outputs(&self) -> &NamedMap<Quantity> {
        &self.outputs
    }

    pub fn variable(&self, name: &str) -> Option<&Quantity> {
        self.variables.get(name)
    }

    pub fn parameter(&self, name: &str) -> Option<&Quantity> {
        self.parameters.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Quantity> {
        self.constants.get(name)
    }

    /// Any quantity of this model by name.
    pub fn quantity(&self, name: &str) -> Option<&Quantity> {
        self.variable(name)
            .or_else(|| self.parameter(name))
            .or_else(|| self.constant(name))
    }

    pub fn variables(&self) -> &NamedMap<Quantity> {
        &self.variables
    }

    pub fn parameters(&self) -> &NamedMap<Quantity> {
        &self.parameters
    }

    pub fn constants(&self) -> &NamedMap<Quantity> {
        &self.constants
    }

    /// Create one variable per phase, named `<prefix>_<phase><suffix>`.
    pub fn create_phase_variables(
        &mut self,
        prefix: &str,
        suffix: &str,
        unit: Unit,
        description: &str,
        exposure: Option<Exposure>,
    ) -> ModelResult<Vec<Quantity>> {
        let multiphase = self
            .multiphase
            .as_ref()
            .ok_or_else(|| ModelError::MissingCapability {
                model: self.name.clone(),
                what: "phase list",
            })?;
        let names = multiphase.quantity_names(prefix, suffix);
        let phases: Vec<String> = multiphase.phases().iter().map(str::to_owned).collect();
        if let Some(taken) = names.iter().find(|name| self.quantity(name).is_some()) {
            return Err(ModelError::DuplicateName {
                model: self.name.clone(),
                name: taken.clone(),
            });
        }

        let mut created = Vec::with_capacity(names.len());
        for (name, phase) in names.iter().zip(&phases) {
            let text = format!("{description} ({phase} phase)");
            let q = match exposure {
                Some(exposure) => self.create_exposed_variable(name, unit, &text, exposure)?,
                None => self.create_variable(name, unit, &text)?,
            };
            created.push(q);
        }
        Ok(created)
    }

    /// Create dimensionless per-phase fractions and a contributor declaring
    /// that they add up to one.
    pub fn create_phase_fractions(
        &mut self,
        prefix: &str,
        suffix: &str,
        description: &str,
        exposure: Option<Exposure>,
    ) -> ModelResult<Vec<Quantity>> {
        let fractions = self.create_phase_variables(
            prefix,
            suffix,
            ef_core::si::DIMENSIONLESS,
            description,
            exposure,
        )?;
        self.add_contributor(PhaseFractionSum {
            prefix: prefix.to_owned(),
            suffix: suffix.to_owned(),
        });
        Ok(fractions)
    }

    // ---- equations ----

    /// Declare an equation. Redeclaring a name replaces the old equation in
    /// place, keeping its position.
    pub fn create_equation(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        relation: impl Into<Relation>,
    ) -> Equation {
        let eq = Equation::new(name, description, relation);
        self.insert_equation(eq.clone());
        eq
    }

    /// Insert a prepared equation, replacing one with the same name.
    pub fn insert_equation(&mut self, equation: Equation) -> Option<Equation> {
        self.equations.insert(equation.name().to_owned(), equation)
    }

    pub fn equation(&self, name: &str) -> Option<&Equation> {
        self.equations.get(name)
    }

    pub fn equations(&self) -> &NamedMap<Equation> {
        &self.equations
    }

    pub fn add_contributor(&mut self, contributor: impl DeclareEquations + 'static) {
        self.contributors.push(Rc::new(contributor));
    }

    /// Run every equation contributor in order, then report quantities and
    /// equations that look disconnected.
    ///
    /// Equations not produced by a contributor (e.g. coupling equations) are
    /// left untouched.
    pub fn declare(&mut self) -> ModelResult<()> {
        let contributors = self.contributors.clone();
        for contributor in &contributors {
            contributor.declare_equations(self)?;
        }
        debug!(
            model = %self.name,
            equations = self.equations.len(),
            "model declared"
        );
        self.report_diagnostics();
        Ok(())
    }

    fn report_diagnostics(&self) {
        if !self.ignore_equation_warning {
            if self.equations.is_empty() {
                warn!(model = %self.name, "model declares no equations");
            }
            for eq in self.unlinked_equations() {
                warn!(
                    model = %self.name,
                    equation = %eq.name(),
                    "equation references no quantity of its model"
                );
            }
        }
        if !self.ignore_variable_warning {
            for q in self.unused_quantities() {
                warn!(
                    model = %self.name,
                    quantity = %q.key(),
                    kind = %q.kind(),
                    "quantity is not used by any equation"
                );
            }
        }
    }

    /// Variables and parameters referenced by no equation of this model.
    pub fn unused_quantities(&self) -> Vec<Quantity> {
        let used: HashSet<_> = self
            .equations
            .values()
            .flat_map(|eq| eq.quantity_refs().iter().map(|w| w.id()))
            .collect();
        self.variables
            .values()
            .chain(self.parameters.values())
            .filter(|q| !used.contains(&q.id()))
            .cloned()
            .collect()
    }

    /// Checked equations that reference none of this model's quantities.
    /// Coupling equations are exempt.
    pub fn unlinked_equations(&self) -> Vec<&Equation> {
        self.equations
            .values()
            .filter(|eq| eq.check_equation())
            .filter(|eq| {
                !eq.quantities()
                    .iter()
                    .any(|q| self.quantity(q.name()) == Some(q))
            })
            .collect()
    }
}

impl core::fmt::Debug for Model {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("constants", &self.constants.keys().collect::<Vec<_>>())
            .field("equations", &self.equations.keys().collect::<Vec<_>>())
            .finish()
    }
}
