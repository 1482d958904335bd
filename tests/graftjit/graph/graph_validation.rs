use anyhow::{anyhow, Result};
use graftjit::program::{item, var, Program, Stmt};
use graftjit::{render_graph, validate_graph, GraphDeserialize, GraphSerialize, Value};
use serde_json::json;

use crate::common;

fn square_times() -> Program {
    let body = vec![
        Stmt::assign("y", var("x") + var("x")),
        Stmt::ret(vec![var("y") * var("x")]),
    ];
    Program::new("square_times", ["x"], body)
}

#[test]
fn traced_graph_round_trips_through_json() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(square_times());
    let inputs: Vec<Value> = vec![common::tensor(&[2.0f32]).into()];
    function.compile_and_run(&inputs)?;
    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;

    let value = GraphSerialize::json(artifact.graph())?;
    let restored = GraphDeserialize::from_json(value)?;
    validate_graph(&restored)?;
    assert_eq!(restored.node_count(), 2);
    assert_eq!(restored.outputs, artifact.graph().outputs);

    let summary = artifact.to_json()?;
    assert_eq!(summary["stats"]["ops"], json!(2));
    Ok(())
}

#[test]
fn forward_reference_is_rejected() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(square_times());
    let inputs: Vec<Value> = vec![common::tensor(&[2.0f32]).into()];
    function.compile_and_run(&inputs)?;
    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;

    let mut value = GraphSerialize::json(artifact.graph())?;
    value["graph"]["nodes"][0]["kind"]["Op"]["inputs"][0] = json!({ "Node": { "node": 1, "output": 0 } });
    assert!(GraphDeserialize::from_json(value).is_err());
    Ok(())
}

#[test]
fn envelope_version_is_checked() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(square_times());
    let inputs: Vec<Value> = vec![common::tensor(&[2.0f32]).into()];
    function.compile_and_run(&inputs)?;
    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;

    let mut value = GraphSerialize::json(artifact.graph())?;
    assert_eq!(value["format"], json!("graftjit.trace"));
    value["version"] = json!(99);
    assert!(GraphDeserialize::from_json(value).is_err());
    assert!(GraphDeserialize::from_json(json!({ "nodes": [] })).is_err());
    Ok(())
}

#[test]
fn render_shows_fallback_holes() -> Result<()> {
    let body = vec![
        Stmt::if_(
            item(var("x")).gt(graftjit::program::float(0.0)),
            vec![Stmt::assign("x", var("x") + var("x"))],
            vec![],
        ),
        Stmt::ret(vec![var("x")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("maybe_double", ["x"], body));
    let inputs: Vec<Value> = vec![common::tensor(&[1.0f64]).into()];
    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[2.0f64]))?;

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    let rendered = render_graph(artifact.graph());
    assert!(rendered.contains("fallback"), "{}", rendered);
    Ok(())
}
