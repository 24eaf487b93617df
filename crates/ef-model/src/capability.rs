//! Model capabilities.
//!
//! Models are composed rather than subclassed: equation contributors are
//! plugged into a [`Model`] and run, in insertion order, every time the
//! model is declared. Multiphase behavior is an optional capability chosen
//! when the model is built.

use ef_core::Quantity;
use ef_expr::{Expr, Symbolic};

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::phase::{PhaseList, phase_quantity_name};

/// Contributes equations to a model.
///
/// Implementations must be re-runnable: declaring an equation name twice
/// replaces the first declaration in place.
pub trait DeclareEquations {
    fn declare_equations(&self, model: &mut Model) -> ModelResult<()>;
}

impl<F> DeclareEquations for F
where
    F: Fn(&mut Model) -> ModelResult<()>,
{
    fn declare_equations(&self, model: &mut Model) -> ModelResult<()> {
        self(model)
    }
}

/// Per-phase quantity naming over a fixed phase list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiPhase {
    phases: PhaseList,
}

impl MultiPhase {
    pub fn new(phases: PhaseList) -> Self {
        Self { phases }
    }

    pub fn phases(&self) -> &PhaseList {
        &self.phases
    }

    /// Names `<prefix>_<phase><suffix>` for every phase, in phase order.
    pub fn quantity_names(&self, prefix: &str, suffix: &str) -> Vec<String> {
        self.phases
            .iter()
            .map(|phase| phase_quantity_name(prefix, phase, suffix))
            .collect()
    }
}

/// Declares `sum_<prefix><suffix>`: the per-phase fractions add up to one.
#[derive(Clone, Debug)]
pub struct PhaseFractionSum {
    pub prefix: String,
    pub suffix: String,
}

impl PhaseFractionSum {
    pub fn equation_name(&self) -> String {
        format!("sum_{}{}", self.prefix, self.suffix)
    }
}

impl DeclareEquations for PhaseFractionSum {
    fn declare_equations(&self, model: &mut Model) -> ModelResult<()> {
        let names = model
            .multiphase()
            .ok_or_else(|| ModelError::MissingCapability {
                model: model.name().to_owned(),
                what: "phase list",
            })?
            .quantity_names(&self.prefix, &self.suffix);

        let mut fractions: Vec<Quantity> = Vec::with_capacity(names.len());
        for name in &names {
            let q = model
                .variable(name)
                .or_else(|| model.parameter(name))
                .ok_or_else(|| ModelError::InvalidPhases {
                    what: format!("model {} has no phase quantity {name}", model.name()),
                })?;
            fractions.push(q.clone());
        }

        let sum = Expr::sum(fractions.iter().map(Quantity::sym));
        model.create_equation(
            self.equation_name(),
            format!("Phase fractions {}*{} add up to one", self.prefix, self.suffix),
            sum.equals(1.0),
        );
        Ok(())
    }
}
