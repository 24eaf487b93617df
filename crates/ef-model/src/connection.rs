//! Connections between models.
//!
//! A connection is a generated coupling equation stored in the target model,
//! plus a metadata record describing which exposed quantities it links.

use core::fmt;
use core::str::FromStr;

use ef_core::{CoreError, Quantity};
use ef_expr::{Expr, Relation, Symbolic};
use tracing::debug;

use crate::equation::Equation;
use crate::error::{ModelError, ModelResult};
use crate::model::Model;

/// Direction a variable is exposed in for inter-model connections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Exposure {
    Input,
    Output,
}

impl Exposure {
    pub fn as_str(self) -> &'static str {
        match self {
            Exposure::Input => "input",
            Exposure::Output => "output",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Exposure::Input => Exposure::Output,
            Exposure::Output => Exposure::Input,
        }
    }
}

impl fmt::Display for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exposure {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Exposure::Input),
            "output" => Ok(Exposure::Output),
            other => Err(CoreError::unexpected(other, "[input, output]")),
        }
    }
}

/// Metadata for one connection. The equation itself lives in the target model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// `<outs>@<source> ---> <ins>@<target>`
    pub key: String,
    pub description: String,
    pub source: String,
    pub target: String,
    /// Qualified keys of the source outputs.
    pub outputs: Vec<String>,
    /// Qualified keys of the target inputs.
    pub inputs: Vec<String>,
    /// Name of the coupling equation in the target model.
    pub equation: String,
}

/// Source side of a pre-built expression connection.
#[derive(Clone, Copy, Debug)]
pub enum ConnectionSource<'a> {
    Model(&'a Model),
    Named(&'a str),
    /// Name drawn from the caller's [`ConnectionNamer`].
    Anonymous,
}

/// Monotonic source of names for anonymous connections.
#[derive(Clone, Debug, Default)]
pub struct ConnectionNamer {
    issued: u64,
}

impl ConnectionNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&mut self) -> String {
        self.issued += 1;
        self.issued.to_string()
    }
}

fn joined_names(quantities: &[Quantity]) -> String {
    quantities
        .iter()
        .map(Quantity::name)
        .collect::<Vec<_>>()
        .join(",")
}

/// Couple exposed outputs of `source` to exposed inputs of `target`.
///
/// Without `expr` the coupling equation is `Σinputs - Σoutputs == 0`. It is
/// stored in `target` under `<outs>---><ins>`. Nothing is modified when a
/// quantity is not exposed in the required direction.
pub fn connect(
    source: &Model,
    target: &mut Model,
    outputs: &[Quantity],
    inputs: &[Quantity],
    expr: Option<Relation>,
    description: &str,
) -> ModelResult<Connection> {
    if outputs.is_empty() || inputs.is_empty() {
        return Err(CoreError::InvalidArg {
            what: "a connection needs at least one output and one input".into(),
        }
        .into());
    }
    for q in outputs {
        if !source.is_exposed(q, Exposure::Output) {
            return Err(ModelError::ExposedVariable {
                quantity: q.key(),
                model: source.name().to_owned(),
                exposure: Exposure::Output,
            });
        }
    }
    for q in inputs {
        if !target.is_exposed(q, Exposure::Input) {
            return Err(ModelError::ExposedVariable {
                quantity: q.key(),
                model: target.name().to_owned(),
                exposure: Exposure::Input,
            });
        }
    }

    let relation = expr.unwrap_or_else(|| {
        let ins = Expr::sum(inputs.iter().map(Quantity::sym));
        let outs = Expr::sum(outputs.iter().map(Quantity::sym));
        (ins - outs).into()
    });

    let out_names = joined_names(outputs);
    let in_names = joined_names(inputs);
    let equation_name = format!("{out_names}--->{in_names}");
    target.insert_equation(Equation::coupling(
        equation_name.clone(),
        description,
        relation,
    ));

    let connection = Connection {
        key: format!(
            "{out_names}@{} ---> {in_names}@{}",
            source.name(),
            target.name()
        ),
        description: description.to_owned(),
        source: source.name().to_owned(),
        target: target.name().to_owned(),
        outputs: outputs.iter().map(Quantity::key).collect(),
        inputs: inputs.iter().map(Quantity::key).collect(),
        equation: equation_name,
    };
    debug!(key = %connection.key, "connection created");
    Ok(connection)
}

/// Couple two pre-built expressions without any exposure check.
///
/// Inserts `input_expr - output_expr == 0` into `target` as
/// `conn_<source>--><target>` and returns the equation name.
pub fn connect_expressions(
    source: ConnectionSource<'_>,
    target: &mut Model,
    output_expr: Expr,
    input_expr: Expr,
    namer: &mut ConnectionNamer,
) -> String {
    let source_name = match source {
        ConnectionSource::Model(model) => model.name().to_owned(),
        ConnectionSource::Named(name) if !name.is_empty() => name.to_owned(),
        ConnectionSource::Named(_) | ConnectionSource::Anonymous => namer.next_name(),
    };
    let name = format!("conn_{source_name}-->{}", target.name());
    let description = format!("Connection from {source_name} to {}", target.name());
    target.insert_equation(Equation::coupling(
        name.clone(),
        description,
        input_expr - output_expr,
    ));
    debug!(equation = %name, "expression connection created");
    name
}
