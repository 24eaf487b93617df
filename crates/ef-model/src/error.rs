//! Error types for model declaration and connection.

use ef_core::CoreError;
use thiserror::Error;

use crate::connection::Exposure;

/// Errors raised while declaring models, equations and connections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model {model} already declares a quantity or equation named {name}")]
    DuplicateName { model: String, name: String },

    #[error("Quantity {quantity} is not an exposed {exposure} of model {model}")]
    ExposedVariable {
        quantity: String,
        model: String,
        exposure: Exposure,
    },

    #[error("Cannot expose {quantity} in model {model}: {what}")]
    InvalidExposure {
        quantity: String,
        model: String,
        what: &'static str,
    },

    #[error("Equation {equation} cannot be classified: {what}")]
    Classification { equation: String, what: String },

    #[error("Invalid phase list: {what}")]
    InvalidPhases { what: String },

    #[error("Model {model} has no {what}")]
    MissingCapability { model: String, what: &'static str },

    #[error("Quantity error: {0}")]
    Core(#[from] CoreError),
}

pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposed_variable_names_quantity_and_model() {
        let err = ModelError::ExposedVariable {
            quantity: "flow_out".into(),
            model: "M1".into(),
            exposure: Exposure::Output,
        };
        let text = err.to_string();
        assert!(text.contains("flow_out"));
        assert!(text.contains("M1"));
        assert!(text.contains("output"));
    }

    #[test]
    fn core_errors_convert() {
        let err: ModelError = CoreError::InvalidArg { what: "x".into() }.into();
        assert!(matches!(err, ModelError::Core(_)));
    }
}
