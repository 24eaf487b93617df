//! Read-only text and JSON summaries of models and problems.

use core::fmt;

use ef_block::ProblemType;
use ef_core::{NamedMap, Quantity};
use ef_model::Model;
use serde::Serialize;

use crate::error::ProblemResult;
use crate::problem::Problem;

/// Anything a report can be produced for.
#[derive(Clone, Copy, Debug)]
pub enum Reportable<'a> {
    Model(&'a Model),
    Problem(&'a Problem),
}

impl Reportable<'_> {
    pub fn report(&self) -> String {
        match self {
            Reportable::Model(m) => model_report(m),
            Reportable::Problem(p) => problem_report(p),
        }
    }
}

impl<'a> From<&'a Model> for Reportable<'a> {
    fn from(m: &'a Model) -> Self {
        Reportable::Model(m)
    }
}

impl<'a> From<&'a Problem> for Reportable<'a> {
    fn from(p: &'a Problem) -> Self {
        Reportable::Problem(p)
    }
}

pub fn model_report(model: &Model) -> String {
    ModelReport(model).to_string()
}

pub fn problem_report(problem: &Problem) -> String {
    ProblemReport(problem).to_string()
}

fn names(map: &NamedMap<Quantity>) -> String {
    map.values().map(Quantity::name).collect::<Vec<_>>().join(", ")
}

struct ModelReport<'a>(&'a Model);

impl fmt::Display for ModelReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        writeln!(f, "Model: {}", m.name())?;
        if !m.description().is_empty() {
            writeln!(f, "  {}", m.description())?;
        }
        if let Some(mp) = m.multiphase() {
            writeln!(f, "  phases: {}", mp.phases().iter().collect::<Vec<_>>().join(", "))?;
        }
        writeln!(f, "  variables ({}): {}", m.variables().len(), names(m.variables()))?;
        writeln!(f, "  parameters ({}): {}", m.parameters().len(), names(m.parameters()))?;
        writeln!(f, "  constants ({}): {}", m.constants().len(), names(m.constants()))?;
        writeln!(f, "  inputs: {}", names(m.inputs()))?;
        writeln!(f, "  outputs: {}", names(m.outputs()))?;
        writeln!(f, "  equations ({}):", m.equations().len())?;
        for eq in m.equations().values() {
            writeln!(f, "    [{}] {}: {}", eq.kind(), eq.name(), eq)?;
        }
        Ok(())
    }
}

struct ProblemReport<'a>(&'a Problem);

impl fmt::Display for ProblemReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0;
        writeln!(f, "Problem: {}", p.name())?;
        if !p.description().is_empty() {
            writeln!(f, "  {}", p.description())?;
        }
        writeln!(
            f,
            "  models ({}): {}",
            p.models().len(),
            p.models().keys().collect::<Vec<_>>().join(", ")
        )?;
        writeln!(f, "  connections ({}):", p.connections().len())?;
        for conn in p.connections().values() {
            writeln!(f, "    {}", conn.key)?;
        }
        match p.block() {
            None => writeln!(f, "  not resolved")?,
            Some(block) => {
                let kind = p
                    .problem_type()
                    .map_or("undetermined", ProblemType::as_str);
                writeln!(f, "  problem type: {kind}")?;
                writeln!(
                    f,
                    "  state ({}): {}",
                    block.variable_index_map().len(),
                    block.variable_index_map().keys().join(", ")
                )?;
                writeln!(f, "  equations ({}):", block.equations().len())?;
                for eq in block.equations() {
                    writeln!(f, "    [{}] {}: {}", eq.kind(), eq.name(), eq)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub variables: usize,
    pub parameters: usize,
    pub constants: usize,
    pub equations: usize,
}

/// Machine-readable counterpart of [`problem_report`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProblemSummary {
    pub name: String,
    pub models: Vec<ModelSummary>,
    pub connections: Vec<String>,
    pub problem_type: Option<ProblemType>,
    pub linear: usize,
    pub nonlinear: usize,
    pub differential: usize,
    /// Qualified keys in state-slot order.
    pub state: Vec<String>,
    pub derivatives: Vec<String>,
}

impl ProblemSummary {
    pub fn of(problem: &Problem) -> Self {
        let models = problem
            .models()
            .values()
            .map(|m| ModelSummary {
                name: m.name().to_owned(),
                variables: m.variables().len(),
                parameters: m.parameters().len(),
                constants: m.constants().len(),
                equations: m.equations().len(),
            })
            .collect();
        let block = problem.block();
        Self {
            name: problem.name().to_owned(),
            models,
            connections: problem.connections().keys().map(str::to_owned).collect(),
            problem_type: problem.problem_type(),
            linear: block.map_or(0, |b| b.groups().linear.len()),
            nonlinear: block.map_or(0, |b| b.groups().nonlinear.len()),
            differential: block.map_or(0, |b| b.groups().differential.len()),
            state: block.map_or_else(Vec::new, |b| b.variable_index_map().keys()),
            derivatives: block.map_or_else(Vec::new, |b| {
                b.derivative_index_map().iter().map(|d| d.to_string()).collect()
            }),
        }
    }

    pub fn to_json(&self) -> ProblemResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_core::si;
    use ef_expr::Symbolic;

    fn tank() -> Model {
        let mut m = Model::new("tank", "level tank");
        let h = m.create_variable("h", si::METER, "level").unwrap();
        let t = m.create_variable("t", si::SECOND, "time").unwrap();
        let k = m.create_parameter("k", si::PER_SECOND, "").unwrap();
        k.set_value(2.0).unwrap();
        m.create_equation("drain", "", h.diff(&t).equals(-(k.sym() * h.sym())));
        m
    }

    #[test]
    fn model_report_lists_quantities_and_equations() {
        let text = model_report(&tank());
        assert!(text.starts_with("Model: tank\n  level tank\n"));
        assert!(text.contains("variables (2): h, t"));
        assert!(text.contains("[differential] drain: d(h)/d(t) == -(k*h)"));
    }

    #[test]
    fn problem_summary_after_resolve() {
        let mut p = Problem::new("p", "");
        p.add_model(tank()).unwrap();
        assert!(problem_report(&p).contains("not resolved"));

        p.resolve().unwrap();
        let summary = ProblemSummary::of(&p);
        assert_eq!(summary.problem_type, Some(ProblemType::Differential));
        assert_eq!(summary.state, ["h@tank"]);
        assert_eq!(summary.derivatives, ["d(h)/d(t)"]);

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"problem_type\": \"differential\""));
        assert!(Reportable::from(&p).report().contains("problem type: differential"));
    }
}
