//! ef-model: declarative process models.
//!
//! A [`Model`] owns unit-tagged quantities and named [`Equation`]s built from
//! them, exposes some variables as inputs or outputs, and can be coupled to
//! other models through generated connection equations.

pub mod capability;
pub mod connection;
pub mod equation;
pub mod error;
pub mod model;
pub mod phase;

pub use capability::{DeclareEquations, MultiPhase, PhaseFractionSum};
pub use connection::{
    Connection, ConnectionNamer, ConnectionSource, Exposure, connect, connect_expressions,
};
pub use equation::{Equation, EquationType, Form, Side};
pub use error::{ModelError, ModelResult};
pub use model::Model;
pub use phase::{PhaseList, phase_quantity_name};
