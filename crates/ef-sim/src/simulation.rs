//! Simulation runner and result recording.

use ef_block::{CompileMode, EquationBlock, ProblemType};
use ef_core::{CoreError, NamedMap};
use ef_problem::{Problem, Reportable};
use nalgebra::DVector;
use tracing::{debug, info};

use crate::error::{SimError, SimResult};
use crate::options::SimOptions;
use crate::solver::SolverSet;

/// Record of a run.
#[derive(Clone, Debug)]
pub struct SimRecord {
    pub problem_type: ProblemType,
    /// Qualified keys of the state slots.
    pub variables: Vec<String>,
    /// Time points; empty for algebraic runs.
    pub t: Vec<f64>,
    /// State snapshots, one per time point (a single one for algebraic runs).
    pub x: Vec<DVector<f64>>,
}

impl SimRecord {
    pub fn final_state(&self) -> Option<&DVector<f64>> {
        self.x.last()
    }

    /// History of one variable, by qualified key. `None` for an unknown key
    /// or a snapshot too short to hold it.
    pub fn series(&self, key: &str) -> Option<Vec<f64>> {
        let i = self.variables.iter().position(|k| k == key)?;
        self.x.iter().map(|x| x.get(i).copied()).collect()
    }
}

#[derive(Debug)]
pub struct Simulation {
    name: String,
    description: String,
    problem: Option<Problem>,
}

impl Simulation {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            problem: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_problem(&mut self, problem: Problem) {
        self.problem = Some(problem);
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    pub fn problem_mut(&mut self) -> Option<&mut Problem> {
        self.problem.as_mut()
    }

    pub fn report<'a>(&self, target: impl Into<Reportable<'a>>) -> String {
        target.into().report()
    }

    /// Resolve the problem, hand the compiled block to the matching solver
    /// and write the solution back into the variables.
    pub fn run(&mut self, options: &SimOptions, solvers: &SolverSet) -> SimResult<SimRecord> {
        options.validate()?;
        let problem = self
            .problem
            .as_mut()
            .ok_or_else(|| SimError::absent(format!("problem of simulation {}", self.name)))?;
        if problem.time_variable_names().is_empty() {
            problem.set_time_variable_names([options.time_variable_name.as_str()]);
        }
        problem.resolve()?;

        let block = problem
            .block()
            .ok_or_else(|| SimError::absent(format!("equation block of {}", problem.name())))?;
        let problem_type = options
            .problem_type
            .or_else(|| block.problem_type())
            .ok_or_else(|| {
                CoreError::unexpected(
                    "undetermined",
                    "[differential, differential-algebraic, nonlinear, linear]",
                )
            })?;
        let x0 = initial_state(block, problem.initial_conditions())?;
        let variables = block.variable_index_map().keys();
        info!(
            simulation = %self.name,
            %problem_type,
            state = x0.len(),
            "simulation started"
        );

        let (t, x) = if problem_type.is_differential() {
            block.to_residual_form()?;
            let system = block.compile(CompileMode::DifferentialAlgebraic)?;
            let solver = solvers
                .dae()
                .ok_or_else(|| SimError::absent("differential-algebraic solver"))?;
            let times = options.time_grid()?;
            let yp0 = DVector::zeros(system.n_rate());
            debug!(points = times.len(), rates = system.n_rate(), "dispatching to DAE solver");
            let states = solver.integrate(&system, &times, &x0, &yp0)?;
            if states.len() != times.len() {
                return Err(SimError::Backend {
                    message: format!(
                        "solver returned {} states for {} time points",
                        states.len(),
                        times.len()
                    ),
                });
            }
            (times, states)
        } else {
            let system = block.compile(CompileMode::Algebraic)?;
            let solver = solvers
                .algebraic()
                .ok_or_else(|| SimError::absent("algebraic solver"))?;
            debug!(%problem_type, "dispatching to algebraic solver");
            let solution = solver.solve(&system, problem_type, &x0)?;
            (Vec::new(), vec![solution])
        };

        if let Some(short) = x.iter().find(|state| state.len() != x0.len()) {
            return Err(SimError::Backend {
                message: format!("solver returned {} values for {} variables", short.len(), x0.len()),
            });
        }
        if let Some(last) = x.last() {
            for (q, value) in block.variable_index_map().iter().zip(last.iter()) {
                q.store_solution(*value);
            }
        }

        Ok(SimRecord {
            problem_type,
            variables,
            t,
            x,
        })
    }
}

/// Current variable values, overridden by initial conditions. Bare names
/// apply first so a qualified key wins over them.
fn initial_state(block: &EquationBlock, conditions: &NamedMap<f64>) -> SimResult<DVector<f64>> {
    let slots = block.variable_index_map();
    let mut x0 = DVector::from_iterator(slots.len(), slots.iter().map(|q| q.value()));
    let (qualified, bare): (Vec<_>, Vec<_>) = conditions.iter().partition(|(k, _)| k.contains('@'));
    for (key, value) in bare.into_iter().chain(qualified) {
        let mut hit = false;
        for (i, q) in slots.iter().enumerate() {
            if q.name() == key || q.key() == key {
                x0[i] = *value;
                hit = true;
            }
        }
        if !hit {
            return Err(SimError::absent(format!("state variable {key} for initial condition")));
        }
    }
    Ok(x0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_skips_ragged_records() {
        let record = SimRecord {
            problem_type: ProblemType::Differential,
            variables: vec!["y@M".into(), "z@M".into()],
            t: vec![0.0, 1.0, 2.0],
            x: vec![
                DVector::from_vec(vec![1.0, 2.0]),
                DVector::from_vec(vec![0.5]),
                DVector::from_vec(vec![0.25, 4.0]),
            ],
        };
        assert_eq!(record.series("y@M"), Some(vec![1.0, 0.5, 0.25]));
        assert_eq!(record.series("z@M"), None);
        assert_eq!(record.series("w@M"), None);
        assert_eq!(record.final_state().map(|x| x.len()), Some(2));
    }
}
