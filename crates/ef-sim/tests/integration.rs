//! Integration tests for ef-sim with small in-test solvers.

use ef_block::{CompiledBlock, JacobianConfig, ProblemType};
use ef_core::{CoreError, Tolerances, nearly_equal, si};
use ef_expr::Symbolic;
use ef_model::Model;
use ef_problem::{Problem, Reportable};
use ef_sim::{AlgebraicSolver, DaeSolver, SimError, SimOptions, SimResult, Simulation, SolverSet};
use nalgebra::DVector;

/// Plain Newton iteration on the compiled residuals.
struct Newton;

impl AlgebraicSolver for Newton {
    fn solve(
        &self,
        system: &CompiledBlock,
        _problem_type: ProblemType,
        x0: &DVector<f64>,
    ) -> SimResult<DVector<f64>> {
        let cfg = JacobianConfig::default();
        let mut x = x0.clone();
        for _ in 0..50 {
            let r = system.eval(x.as_slice())?;
            if r.norm() < 1e-10 {
                return Ok(x);
            }
            let jac = system.jacobian(x.as_slice(), &cfg)?;
            let dx = jac
                .lu()
                .solve(&(-r))
                .ok_or_else(|| SimError::backend("singular Jacobian"))?;
            x += dx;
        }
        Err(SimError::backend("Newton did not converge"))
    }
}

/// Explicit Euler with the rates recovered from `F(t, y, y') = 0` each step.
/// Assumes rate slot i differentiates state slot i.
struct EulerDae {
    substeps: usize,
}

impl DaeSolver for EulerDae {
    fn integrate(
        &self,
        system: &CompiledBlock,
        times: &[f64],
        y0: &DVector<f64>,
        yp0: &DVector<f64>,
    ) -> SimResult<Vec<DVector<f64>>> {
        let cfg = JacobianConfig::default();
        let (mut y, mut yp) = (y0.clone(), yp0.clone());
        let mut out = vec![y.clone()];
        for w in times.windows(2) {
            let h = (w[1] - w[0]) / self.substeps as f64;
            for k in 0..self.substeps {
                let t = w[0] + h * k as f64;
                let f = system.eval_dae(t, y.as_slice(), yp.as_slice())?;
                let jr = system.jacobian_rate(t, y.as_slice(), yp.as_slice(), &cfg)?;
                yp -= jr
                    .lu()
                    .solve(&f)
                    .ok_or_else(|| SimError::backend("singular rate Jacobian"))?;
                y += &yp * h;
            }
            out.push(y.clone());
        }
        Ok(out)
    }
}

fn solvers() -> SolverSet {
    SolverSet::new()
        .with_algebraic(Newton)
        .with_dae(EulerDae { substeps: 100 })
}

fn linear_model() -> Model {
    let mut m = Model::new("M", "");
    let a = m.create_variable("a", si::DIMENSIONLESS, "").unwrap();
    let b = m.create_variable("b", si::DIMENSIONLESS, "").unwrap();
    let c = m.create_variable("c", si::DIMENSIONLESS, "").unwrap();
    let d = m.create_constant("d", si::DIMENSIONLESS, "", 0.7).unwrap();
    m.create_equation("e1", "", a.sym() + b.sym() - 1.0);
    m.create_equation("e2", "", a.sym() + c.sym() * d.sym() - 2.0);
    m.create_equation("e3", "", c.sym() * d.sym() - a.sym() - b.sym());
    m
}

fn decay_model() -> Model {
    let mut m = Model::new("decay", "first order decay");
    let y = m.create_variable("y", si::DIMENSIONLESS, "").unwrap();
    let t = m.create_variable("t", si::SECOND, "").unwrap();
    m.create_equation("rate", "", y.diff(&t).equals(-2.0 * y.sym()));
    m
}

#[test]
fn linear_problem_is_solved_and_written_back() {
    let mut problem = Problem::new("lin", "");
    problem.add_model(linear_model()).unwrap();
    let mut sim = Simulation::new("sim", "");
    sim.set_problem(problem);

    let record = sim.run(&SimOptions::default(), &solvers()).unwrap();
    assert_eq!(record.problem_type, ProblemType::Linear);
    assert!(record.t.is_empty());
    assert_eq!(record.variables, ["a@M", "b@M", "c@M"]);

    let expected = [1.0, 0.0, 1.0 / 0.7];
    let solution = record.final_state().unwrap();
    let tol = Tolerances {
        abs: 1e-9,
        rel: 1e-8,
    };
    for (got, want) in solution.iter().zip(expected) {
        assert!(nearly_equal(*got, want, tol), "{got} vs {want}");
    }
    let model = sim.problem().unwrap().model("M").unwrap();
    assert!(nearly_equal(model.variable("c").unwrap().value(), 1.0 / 0.7, tol));
}

#[test]
fn decay_is_integrated_over_the_grid() {
    let mut problem = Problem::new("ode", "");
    problem.add_model(decay_model()).unwrap();
    problem.set_initial_conditions([("y", 1.0)]);
    let mut sim = Simulation::new("sim", "");
    sim.set_problem(problem);

    let options = SimOptions {
        end_time: Some(1.0),
        number_of_time_steps: 10,
        ..SimOptions::default()
    };
    let record = sim.run(&options, &solvers()).unwrap();
    assert_eq!(record.problem_type, ProblemType::Differential);
    assert_eq!(record.t.len(), 11);
    assert_eq!(record.variables, ["y@decay"]);

    let y = record.series("y@decay").unwrap();
    assert_eq!(y[0], 1.0);
    assert!(y.windows(2).all(|w| w[1] < w[0]));
    assert!((y[10] - (-2.0f64).exp()).abs() < 1e-2);

    let block = sim.problem().unwrap().block().unwrap();
    assert!(block.equations()[0].to_string().ends_with("== 0"));
    let y_q = sim.problem().unwrap().model("decay").unwrap().variable("y").unwrap();
    assert_eq!(y_q.value(), y[10]);
}

#[test]
fn missing_pieces_are_reported() {
    let mut sim = Simulation::new("sim", "");
    assert!(matches!(
        sim.run(&SimOptions::default(), &solvers()),
        Err(SimError::AbsentRequiredObject { .. })
    ));

    // Nothing to classify.
    sim.set_problem(Problem::new("empty", ""));
    assert!(matches!(
        sim.run(&SimOptions::default(), &solvers()),
        Err(SimError::Core(CoreError::UnexpectedValue { .. }))
    ));

    // Differential problem without a DAE solver or an end time.
    let mut problem = Problem::new("ode", "");
    problem.add_model(decay_model()).unwrap();
    sim.set_problem(problem);
    let options = SimOptions {
        end_time: Some(1.0),
        ..SimOptions::default()
    };
    let only_algebraic = SolverSet::new().with_algebraic(Newton);
    assert!(matches!(
        sim.run(&options, &only_algebraic),
        Err(SimError::AbsentRequiredObject { .. })
    ));
    assert!(matches!(
        sim.run(&SimOptions::default(), &solvers()),
        Err(SimError::AbsentRequiredObject { .. })
    ));
}

#[test]
fn unknown_initial_condition_is_rejected() {
    let mut problem = Problem::new("ode", "");
    problem.add_model(decay_model()).unwrap();
    problem.set_initial_conditions([("z", 1.0)]);
    let mut sim = Simulation::new("sim", "");
    sim.set_problem(problem);
    let options = SimOptions {
        end_time: Some(1.0),
        ..SimOptions::default()
    };
    let err = sim.run(&options, &solvers()).unwrap_err();
    assert!(err.to_string().contains("z"));
}

#[test]
fn qualified_initial_condition_wins_over_bare_name() {
    let mut problem = Problem::new("ode", "");
    problem.add_model(decay_model()).unwrap();
    problem.set_initial_conditions([("y@decay", 3.0), ("y", 1.0)]);
    let mut sim = Simulation::new("sim", "");
    sim.set_problem(problem);
    let options = SimOptions {
        end_time: Some(0.1),
        number_of_time_steps: 1,
        ..SimOptions::default()
    };
    let record = sim.run(&options, &solvers()).unwrap();
    assert_eq!(record.series("y@decay").unwrap()[0], 3.0);
}

#[test]
fn report_delegates_to_the_formatter() {
    let sim = Simulation::new("sim", "");
    let model = decay_model();
    let text = sim.report(&model);
    assert!(text.starts_with("Model: decay"));

    let problem = Problem::new("p", "");
    assert!(sim.report(Reportable::Problem(&problem)).contains("not resolved"));
}
