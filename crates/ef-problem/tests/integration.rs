//! Integration tests for ef-problem: assembling and resolving problems.

use ef_block::ProblemType;
use ef_core::{Quantity, si};
use ef_expr::Symbolic;
use ef_model::{Exposure, Model, ModelError, ModelResult};
use ef_problem::{Problem, ProblemError, ProblemSummary};
use proptest::prelude::*;

/// Feed with a fixed outflow.
fn feed() -> Model {
    let mut m = Model::new("feed", "constant feed");
    m.create_exposed_variable("flow_out", si::KILOGRAM_PER_SECOND, "", Exposure::Output)
        .unwrap();
    m.add_contributor(|m: &mut Model| -> ModelResult<()> {
        let flow = m.variable("flow_out").cloned().unwrap();
        m.create_equation("feed_rate", "", flow.sym().equals(2.0));
        Ok(())
    });
    m
}

/// Splitter that sends a fixed fraction of its inflow to a side stream.
fn splitter() -> Model {
    let mut m = Model::new("split", "");
    m.create_exposed_variable("flow_in", si::KILOGRAM_PER_SECOND, "", Exposure::Input)
        .unwrap();
    m.create_variable("side", si::KILOGRAM_PER_SECOND, "").unwrap();
    m.create_constant("ratio", si::DIMENSIONLESS, "", 0.25).unwrap();
    m.add_contributor(|m: &mut Model| -> ModelResult<()> {
        let q = |name: &str| m.quantity(name).cloned().unwrap();
        let (flow_in, side, ratio) = (q("flow_in"), q("side"), q("ratio"));
        m.create_equation("side_draw", "", side.sym().equals(ratio.sym() * flow_in.sym()));
        Ok(())
    });
    m
}

#[test]
fn connection_equation_appears_once_after_resolve() {
    let mut p = Problem::new("line", "");
    let src = feed();
    let mut dst = splitter();
    let outs = [src.variable("flow_out").unwrap().clone()];
    let ins = [dst.variable("flow_in").unwrap().clone()];
    let conn = p
        .create_connection(&src, &mut dst, &outs, &ins, None, "feed to splitter")
        .unwrap()
        .clone();
    assert_eq!(conn.key, "flow_out@feed ---> flow_in@split");
    p.add_models([src, dst]).unwrap();

    for _ in 0..2 {
        p.resolve().unwrap();
        let block = p.block().unwrap();
        let hits = block
            .equations()
            .iter()
            .filter(|eq| eq.name() == conn.equation)
            .count();
        assert_eq!(hits, 1);
        assert_eq!(block.equations().len(), 3);
    }

    let coupling = p.model("split").unwrap().equation(&conn.equation).unwrap();
    assert_eq!(coupling.to_string(), "flow_in - flow_out == 0");

    // flow_out is shared by the feed equation and the coupling equation.
    let block = p.block().unwrap();
    assert_eq!(
        block.variable_index_map().keys(),
        ["flow_out@feed", "flow_in@split", "side@split"]
    );
    assert_eq!(p.problem_type(), Some(ProblemType::Linear));
}

#[test]
fn linear_scenario_with_folded_constant() {
    let mut m = Model::new("M", "");
    let a = m.create_variable("a", si::DIMENSIONLESS, "").unwrap();
    let b = m.create_variable("b", si::DIMENSIONLESS, "").unwrap();
    let c = m.create_variable("c", si::DIMENSIONLESS, "").unwrap();
    let d = m.create_constant("d", si::DIMENSIONLESS, "", 0.7).unwrap();
    m.create_equation("e1", "", a.sym() + b.sym() - 1.0);
    m.create_equation("e2", "", a.sym() + c.sym() * d.sym() - 2.0);

    let mut p = Problem::new("p", "");
    p.add_model(m).unwrap();
    p.resolve().unwrap();
    assert_eq!(p.problem_type(), Some(ProblemType::Linear));
    let block = p.block().unwrap();
    assert_eq!(block.variables().len(), 3);
    assert!(block.parameters().is_empty());
}

#[test]
fn unexposed_connection_leaves_models_untouched() {
    let mut p = Problem::new("p", "");
    let src = feed();
    let mut dst = splitter();
    let before = dst.equations().len();

    // side is a plain variable of the splitter, not an input.
    let outs = [src.variable("flow_out").unwrap().clone()];
    let ins = [dst.variable("side").unwrap().clone()];
    let err = p
        .create_connection(&src, &mut dst, &outs, &ins, None, "")
        .unwrap_err();
    assert!(matches!(
        err,
        ProblemError::Model(ModelError::ExposedVariable {
            exposure: Exposure::Input,
            ..
        })
    ));
    assert_eq!(dst.equations().len(), before);
    assert!(src.equations().is_empty());
    assert!(p.connections().is_empty());
}

#[test]
fn failed_resolve_clears_the_block() {
    let mut p = Problem::new("p", "");
    p.add_model(feed()).unwrap();
    p.resolve().unwrap();
    assert!(p.block().is_some());

    let mut broken = Model::new("broken", "");
    broken.add_contributor(|m: &mut Model| -> ModelResult<()> {
        m.create_variable("x", si::DIMENSIONLESS, "")?;
        Ok(())
    });
    p.add_model(broken).unwrap();
    // The second declare tries to recreate x.
    p.reload_models(Some(&["broken"])).unwrap();
    assert!(p.resolve().is_err());
    assert!(p.block().is_none());
    assert_eq!(p.problem_type(), None);
}

#[test]
fn summary_serializes_counts() {
    let mut p = Problem::new("p", "");
    p.add_models([feed(), splitter()]).unwrap();
    p.connect_models("feed", "split", &["flow_out"], &["flow_in"], None, "")
        .unwrap();
    p.resolve().unwrap();
    let summary = ProblemSummary::of(&p);
    assert_eq!(summary.linear, 3);
    assert_eq!(summary.nonlinear, 0);
    assert_eq!(summary.connections, ["flow_out@feed ---> flow_in@split"]);
    let json = summary.to_json().unwrap();
    assert!(json.contains("\"problem_type\": \"linear\""));
}

/// Model `m{i}` with its own variables and `n` chained equations.
fn chain_model(i: usize, n: usize) -> Model {
    let mut m = Model::new(format!("m{i}"), "");
    let vars: Vec<Quantity> = (0..=n)
        .map(|k| m.create_variable(&format!("x{k}"), si::DIMENSIONLESS, "").unwrap())
        .collect();
    for k in 0..n {
        m.create_equation(format!("e{k}"), "", vars[k + 1].sym() - 2.0 * vars[k].sym());
    }
    m
}

proptest! {
    #[test]
    fn disjoint_models_flatten_in_order(sizes in prop::collection::vec(1usize..5, 1..5)) {
        let mut p = Problem::new("p", "");
        p.add_models(sizes.iter().enumerate().map(|(i, &n)| chain_model(i, n))).unwrap();
        p.resolve().unwrap();

        let first = p.block().unwrap().variable_index_map().keys();
        let names: Vec<String> = p
            .block()
            .unwrap()
            .equations()
            .iter()
            .map(|eq| eq.name().to_owned())
            .collect();
        prop_assert_eq!(names.len(), sizes.iter().sum::<usize>());
        prop_assert_eq!(first.len(), sizes.iter().map(|n| n + 1).sum::<usize>());

        p.resolve().unwrap();
        prop_assert_eq!(p.block().unwrap().variable_index_map().keys(), first);
    }
}
