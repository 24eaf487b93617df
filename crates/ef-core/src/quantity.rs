//! Named, unit-tagged values shared between models, equations and blocks.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::str::FromStr;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::{CoreError, CoreResult};
use crate::ids::{QuantityId, next_quantity_id};
use crate::numeric::ensure_finite;
use crate::units::{Measure, Unit};

/// Role a quantity plays in the equation system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuantityKind {
    /// Unknown solved for by the system.
    Variable,
    /// Known value that may be changed between runs.
    Parameter,
    /// Known value fixed at declaration.
    Constant,
}

impl QuantityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuantityKind::Variable => "variable",
            QuantityKind::Parameter => "parameter",
            QuantityKind::Constant => "constant",
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "variable" => Ok(QuantityKind::Variable),
            "parameter" => Ok(QuantityKind::Parameter),
            "constant" => Ok(QuantityKind::Constant),
            other => Err(CoreError::unexpected(other, "[variable, parameter, constant]")),
        }
    }
}

#[derive(Debug)]
struct QuantityData {
    id: QuantityId,
    kind: QuantityKind,
    name: String,
    owner: String,
    unit: Unit,
    description: String,
    latex: RefCell<String>,
    value: Cell<f64>,
    specified: Cell<bool>,
}

/// Shared handle to a quantity.
///
/// Cloning the handle never creates a new quantity: identity (and therefore
/// equality and hashing) is the [`QuantityId`] assigned at creation.
#[derive(Clone)]
pub struct Quantity(Rc<QuantityData>);

impl Quantity {
    pub fn new(
        kind: QuantityKind,
        name: impl Into<String>,
        owner: impl Into<String>,
        unit: Unit,
        description: impl Into<String>,
    ) -> Self {
        Self(Rc::new(QuantityData {
            id: next_quantity_id(),
            kind,
            name: name.into(),
            owner: owner.into(),
            unit,
            description: description.into(),
            latex: RefCell::new(String::new()),
            value: Cell::new(0.0),
            specified: Cell::new(false),
        }))
    }

    pub fn id(&self) -> QuantityId {
        self.0.id
    }

    pub fn kind(&self) -> QuantityKind {
        self.0.kind
    }

    pub fn is_variable(&self) -> bool {
        self.0.kind == QuantityKind::Variable
    }

    pub fn is_parameter(&self) -> bool {
        self.0.kind == QuantityKind::Parameter
    }

    pub fn is_constant(&self) -> bool {
        self.0.kind == QuantityKind::Constant
    }

    /// Name within the owning model.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Name of the owning model.
    pub fn owner(&self) -> &str {
        &self.0.owner
    }

    /// Qualified key `name@owner`, unique across a problem.
    pub fn key(&self) -> String {
        if self.0.owner.is_empty() {
            self.0.name.clone()
        } else {
            format!("{}@{}", self.0.name, self.0.owner)
        }
    }

    pub fn unit(&self) -> Unit {
        self.0.unit
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    pub fn latex(&self) -> String {
        self.0.latex.borrow().clone()
    }

    pub fn set_latex(&self, latex: impl Into<String>) {
        *self.0.latex.borrow_mut() = latex.into();
    }

    pub fn value(&self) -> f64 {
        self.0.value.get()
    }

    pub fn is_specified(&self) -> bool {
        self.0.specified.get()
    }

    /// Store `value`, expressed in this quantity's own unit.
    pub fn set_value(&self, value: f64) -> CoreResult<()> {
        let value = ensure_finite(value, "quantity value")?;
        self.0.value.set(value);
        self.0.specified.set(true);
        Ok(())
    }

    /// Store a unit-tagged value, converting it into this quantity's unit.
    pub fn set_measure(&self, measure: impl Into<Measure>) -> CoreResult<()> {
        let measure = measure.into();
        let value =
            measure
                .in_unit(&self.0.unit)
                .ok_or_else(|| CoreError::DimensionalCoherence {
                    quantity: self.key(),
                    expected: self.0.unit,
                    found: measure.unit,
                })?;
        self.set_value(value)
    }

    /// Copy the value of another quantity, which must be dimensionally coherent.
    pub fn set_from(&self, other: &Quantity) -> CoreResult<()> {
        self.set_measure(other.measure())
    }

    pub fn measure(&self) -> Measure {
        Measure::new(self.value(), self.0.unit)
    }

    /// Overwrite the value without touching the specified flag (solver write-back).
    pub fn store_solution(&self, value: f64) {
        self.0.value.set(value);
    }

    pub fn downgrade(&self) -> WeakQuantity {
        WeakQuantity {
            id: self.0.id,
            inner: Rc::downgrade(&self.0),
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.0.kind, self.key())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Non-owning reference to a quantity, as held by equations.
#[derive(Clone, Debug)]
pub struct WeakQuantity {
    id: QuantityId,
    inner: Weak<QuantityData>,
}

impl WeakQuantity {
    pub fn id(&self) -> QuantityId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Quantity> {
        self.inner.upgrade().map(Quantity)
    }
}
