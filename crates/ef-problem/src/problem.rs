//! Problems: several models composed into one equation block.

use ef_block::{EquationBlock, ProblemType};
use ef_core::{NamedMap, Quantity};
use ef_expr::{Expr, Relation};
use ef_model::{Connection, ConnectionNamer, ConnectionSource, Model, connect, connect_expressions};
use tracing::{debug, info};

use crate::error::{ProblemError, ProblemResult};

/// A set of models, the connections between them, and the block they
/// resolve into.
///
/// The block is rebuilt from scratch on every [`Problem::resolve`]; it is
/// `None` before the first successful resolve and after a failed one.
#[derive(Debug)]
pub struct Problem {
    name: String,
    description: String,
    models: NamedMap<Model>,
    connections: NamedMap<Connection>,
    initial_conditions: NamedMap<f64>,
    time_variable_names: Vec<String>,
    namer: ConnectionNamer,
    block: Option<EquationBlock>,
}

impl Problem {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            models: NamedMap::new(),
            connections: NamedMap::new(),
            initial_conditions: NamedMap::new(),
            time_variable_names: Vec::new(),
            namer: ConnectionNamer::new(),
            block: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    // ---- models ----

    pub fn add_model(&mut self, model: Model) -> ProblemResult<()> {
        if self.models.contains_key(model.name()) {
            return Err(ProblemError::DuplicateModel {
                problem: self.name.clone(),
                model: model.name().to_owned(),
            });
        }
        debug!(problem = %self.name, model = %model.name(), "model added");
        self.models.insert(model.name().to_owned(), model);
        Ok(())
    }

    /// Add models in order. Stops at the first duplicate; models before it
    /// stay added.
    pub fn add_models(&mut self, models: impl IntoIterator<Item = Model>) -> ProblemResult<()> {
        models.into_iter().try_for_each(|m| self.add_model(m))
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.get_mut(name)
    }

    pub fn models(&self) -> &NamedMap<Model> {
        &self.models
    }

    // ---- connections ----

    /// Connect two models that are not yet part of this problem.
    ///
    /// The coupling equation goes into `target`; the record is kept here,
    /// replacing an earlier record with the same key.
    pub fn create_connection(
        &mut self,
        source: &Model,
        target: &mut Model,
        outputs: &[Quantity],
        inputs: &[Quantity],
        expr: Option<Relation>,
        description: &str,
    ) -> ProblemResult<&Connection> {
        let connection = connect(source, target, outputs, inputs, expr, description)?;
        Ok(self.record(connection))
    }

    /// Connect two models already added, naming quantities by their bare
    /// names inside each model.
    pub fn connect_models(
        &mut self,
        source: &str,
        target: &str,
        output_names: &[&str],
        input_names: &[&str],
        expr: Option<Relation>,
        description: &str,
    ) -> ProblemResult<&Connection> {
        let outputs = self.lookup_variables(source, output_names)?;
        let inputs = self.lookup_variables(target, input_names)?;
        if source == target {
            return Err(ProblemError::InvalidArg {
                what: format!("model {source} cannot be connected to itself"),
            });
        }
        let (src, dst) = self
            .models
            .pair_mut(source, target)
            .ok_or_else(|| ProblemError::absent(format!("models {source} and {target}")))?;
        let connection = connect(src, dst, &outputs, &inputs, expr, description)?;
        Ok(self.record(connection))
    }

    /// Couple two pre-built expressions into `target` without exposure
    /// checks. Anonymous sources are named by this problem's counter.
    pub fn connect_expressions(
        &mut self,
        source: ConnectionSource<'_>,
        target: &mut Model,
        output_expr: Expr,
        input_expr: Expr,
    ) -> String {
        connect_expressions(source, target, output_expr, input_expr, &mut self.namer)
    }

    fn lookup_variables(&self, model: &str, names: &[&str]) -> ProblemResult<Vec<Quantity>> {
        let m = self
            .models
            .get(model)
            .ok_or_else(|| ProblemError::absent(format!("model {model} in problem {}", self.name)))?;
        names
            .iter()
            .map(|name| {
                m.variable(name)
                    .cloned()
                    .ok_or_else(|| ProblemError::absent(format!("variable {name} in model {model}")))
            })
            .collect()
    }

    fn record(&mut self, connection: Connection) -> &Connection {
        let key = connection.key.clone();
        self.connections.insert(key.clone(), connection);
        &self.connections[key.as_str()]
    }

    pub fn connections(&self) -> &NamedMap<Connection> {
        &self.connections
    }

    // ---- initial conditions and time ----

    /// Merge initial conditions, keyed by qualified key (`name@model`) or bare
    /// name. Later values for the same key win.
    pub fn set_initial_conditions<I, S>(&mut self, conditions: I)
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        for (key, value) in conditions {
            self.initial_conditions.insert(key, value);
        }
    }

    pub fn initial_conditions(&self) -> &NamedMap<f64> {
        &self.initial_conditions
    }

    pub fn set_time_variable_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_variable_names = names.into_iter().map(Into::into).collect();
    }

    pub fn time_variable_names(&self) -> &[String] {
        &self.time_variable_names
    }

    // ---- resolution ----

    /// Re-run the declare hooks of every model, or of the named ones.
    pub fn reload_models(&mut self, names: Option<&[&str]>) -> ProblemResult<()> {
        if let Some(names) = names {
            if let Some(missing) = names.iter().find(|n| !self.models.contains_key(n)) {
                return Err(ProblemError::absent(format!(
                    "model {missing} in problem {}",
                    self.name
                )));
            }
        }
        for model in self.models.values_mut() {
            if names.is_none_or(|names| names.contains(&model.name())) {
                model.declare()?;
            }
        }
        Ok(())
    }

    /// Reload all models and rebuild the equation block.
    ///
    /// Equations are taken model by model in insertion order. Variables and
    /// parameters are deduplicated by identity, first occurrence winning.
    pub fn resolve(&mut self) -> ProblemResult<()> {
        self.block = None;
        self.reload_models(None)?;

        let mut equations = Vec::new();
        let mut variables = NamedMap::new();
        let mut parameters = NamedMap::new();
        for model in self.models.values() {
            for eq in model.equations().values() {
                equations.push(eq.clone());
                for q in eq.quantities() {
                    let map = if q.is_variable() {
                        &mut variables
                    } else if q.is_parameter() {
                        &mut parameters
                    } else {
                        continue;
                    };
                    match map.get(&q.key()) {
                        Some(seen) if *seen == q => {}
                        Some(_) => {
                            return Err(ProblemError::InvalidArg {
                                what: format!("distinct quantities share the key {}", q.key()),
                            });
                        }
                        None => {
                            map.insert(q.key(), q);
                        }
                    }
                }
            }
        }

        let mut block = EquationBlock::new(equations, variables, parameters)
            .with_time_variable_names(self.time_variable_names.iter().cloned());
        block.classify();
        info!(
            problem = %self.name,
            equations = block.equations().len(),
            variables = block.variable_index_map().len(),
            problem_type = ?block.problem_type(),
            "problem resolved"
        );
        self.block = Some(block);
        Ok(())
    }

    pub fn block(&self) -> Option<&EquationBlock> {
        self.block.as_ref()
    }

    /// Kind of system the last resolve produced. `None` before a resolve or
    /// when the block is empty.
    pub fn problem_type(&self) -> Option<ProblemType> {
        self.block.as_ref().and_then(EquationBlock::problem_type)
    }
}
