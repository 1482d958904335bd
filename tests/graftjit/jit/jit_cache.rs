use anyhow::{anyhow, Result};
use graftjit::program::{float, int, item, var, Program, Stmt};
use graftjit::{
    compile_and_run, Engine, ExecConfig, JitFunction, NodeKind, OpKind, TensorValue, TraceEventKind, Value,
};

use crate::common;

fn sign_select() -> Program {
    let body = vec![
        Stmt::if_(
            var("p").gt(int(0)),
            vec![Stmt::assign("y", var("x") + var("x"))],
            vec![Stmt::assign("y", var("x") - var("x"))],
        ),
        Stmt::ret(vec![var("y")]),
    ];
    Program::new("sign_select", ["p", "x"], body)
}

#[test]
fn cond_node_follows_predicate_on_replay() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(sign_select());
    let x: Value = common::tensor(&[1.5f32, -2.0]).into();

    let positive = function.compile_and_run(&[TensorValue::from(1.0f32).into(), x.clone()])?;
    common::assert_tensor_eq(&positive[0], &common::tensor(&[3.0f32, -4.0]))?;

    let negative = function.compile_and_run(&[TensorValue::from(-1.0f32).into(), x.clone()])?;
    common::assert_tensor_eq(&negative[0], &common::tensor(&[0.0f32, 0.0]))?;
    assert_eq!(function.trace_count(), 1);
    assert_eq!(function.replay_count(), 1);

    let artifact = function
        .artifact_for(&[TensorValue::from(0.0f32).into(), x])?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    assert!(artifact.report().is_fully_graph_native());
    assert_eq!(artifact.stats().conds, 1);
    let cond = artifact
        .graph()
        .nodes
        .iter()
        .find_map(|node| match &node.kind {
            NodeKind::Cond { then_body, else_body, .. } => Some((then_body.len(), else_body.len())),
            _ => None,
        })
        .ok_or_else(|| anyhow!("no cond node"))?;
    assert_eq!(cond, (1, 1));
    Ok(())
}

#[test]
fn new_signature_traces_again() -> Result<()> {
    let engine = common::engine()?;
    let body = vec![Stmt::ret(vec![var("x") * var("x")])];
    let function = engine.jit(Program::new("square", ["x"], body));

    function.compile_and_run(&[common::tensor(&[2i32, 3]).into()])?;
    function.compile_and_run(&[common::tensor(&[2i32, 3]).into()])?;
    let out = function.compile_and_run(&[common::tensor(&[1i32, 2, 3]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[1i32, 4, 9]))?;
    let out = function.compile_and_run(&[common::tensor(&[1.5f32, 2.0]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[2.25f32, 4.0]))?;

    assert_eq!(function.trace_count(), 3);
    assert_eq!(function.replay_count(), 1);
    assert_eq!(function.cached_artifacts(), 3);
    Ok(())
}

#[test]
fn host_inputs_are_part_of_the_signature() -> Result<()> {
    let engine = common::engine()?;
    let body = vec![Stmt::ret(vec![var("x") * var("k")])];
    let function = engine.jit(Program::new("scale", ["x", "k"], body));
    let x: Value = common::tensor(&[1i64, 2]).into();

    let out = function.compile_and_run(&[x.clone(), Value::Int(3)])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[3i64, 6]))?;
    let out = function.compile_and_run(&[x.clone(), Value::Int(4)])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[4i64, 8]))?;
    assert_eq!(function.trace_count(), 2);
    Ok(())
}

#[test]
fn fallback_output_kind_change_retraces() -> Result<()> {
    let body = vec![
        Stmt::if_(
            item(var("x")).gt(float(0.0)),
            vec![Stmt::assign("y", var("x"))],
            vec![Stmt::assign("y", int(7))],
        ),
        Stmt::ret(vec![var("y")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("kind_switch", ["x"], body));

    let out = function.compile_and_run(&[common::tensor(&[2.5f64]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[2.5f64]))?;
    assert_eq!(function.trace_count(), 1);

    let out = function.compile_and_run(&[common::tensor(&[-2.5f64]).into()])?;
    common::assert_tensor_eq(&out[0], &TensorValue::from(7i64))?;
    assert_eq!(function.trace_count(), 2);
    assert_eq!(function.retrace_count(), 1);
    assert_eq!(function.cached_artifacts(), 1);

    let out = function.compile_and_run(&[common::tensor(&[1.0f64]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[1.0f64]))?;
    assert_eq!(function.trace_count(), 3);
    assert_eq!(function.retrace_count(), 2);
    assert_eq!(function.replay_count(), 0);
    Ok(())
}

#[test]
fn non_finite_host_floats_get_their_own_artifacts() -> Result<()> {
    let body = vec![
        Stmt::if_(
            var("k").gt(float(0.0)),
            vec![Stmt::assign("y", var("x") + var("x"))],
            vec![Stmt::assign("y", var("x") - var("x"))],
        ),
        Stmt::ret(vec![var("y")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("host_sign", ["k", "x"], body));
    let x: Value = common::tensor(&[1.0f32]).into();

    let cases = [
        (f64::INFINITY, 2.0f32),
        (f64::NEG_INFINITY, 0.0),
        (f64::NAN, 0.0),
    ];
    for (k, expected) in cases {
        let inputs = vec![Value::Float(k), x.clone()];
        let out = function.compile_and_run(&inputs)?;
        let eager = function.run_eager(&inputs)?;
        common::assert_tensor_eq(&out[0], &common::tensor(&[expected]))?;
        common::assert_tensor_eq(&out[0], &eager[0])?;
    }
    assert_eq!(function.trace_count(), 3);
    assert_eq!(function.cached_artifacts(), 3);

    let out = function.compile_and_run(&[Value::Float(f64::NEG_INFINITY), x])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[0.0f32]))?;
    assert_eq!(function.trace_count(), 3);
    assert_eq!(function.replay_count(), 1);
    Ok(())
}

#[test]
fn cached_artifact_replays_across_threads() -> Result<()> {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<JitFunction>();

    const THREADS: usize = 4;
    let engine = common::engine()?;
    let function = engine.jit(common::if_after_for_in_if());
    let inputs: Vec<Value> = graftjit::values![
        common::tensor(&[1i64]),
        common::tensor(&[2i64]),
        common::tensor(&[7i64]),
    ];
    let expected = function.compile_and_run(&inputs)?;

    let (shared, inputs) = (&function, inputs.as_slice());
    let outputs = std::thread::scope(|scope| {
        let handles = (0..THREADS)
            .map(|_| scope.spawn(move || shared.compile_and_run(inputs)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| anyhow!("replay thread panicked")))
            .collect::<Result<Vec<_>>>()
    })?;
    for out in outputs {
        common::assert_tensor_eq(&out?[0], &expected[0])?;
    }
    assert_eq!(function.trace_count(), 1);
    assert_eq!(function.replay_count(), THREADS);
    assert_eq!(function.retrace_count(), 0);
    Ok(())
}

#[test]
fn lru_capacity_bounds_the_cache() -> Result<()> {
    let engine = Engine::new(ExecConfig::default().with_cache_capacity(1))?;
    let body = vec![Stmt::ret(vec![var("x") + 1])];
    let function = engine.jit(Program::new("inc", ["x"], body));
    let short: Vec<Value> = vec![common::tensor(&[1i64]).into()];
    let long: Vec<Value> = vec![common::tensor(&[1i64, 2]).into()];

    function.compile_and_run(&short)?;
    function.compile_and_run(&long)?;
    assert_eq!(function.cached_artifacts(), 1);
    assert!(function.artifact_for(&short)?.is_none());

    let out = compile_and_run(&function, &short)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[2i64]))?;
    assert_eq!(function.trace_count(), 3);
    Ok(())
}

#[test]
fn replay_records_trace_events_when_enabled() -> Result<()> {
    let engine = Engine::new(ExecConfig::default().with_trace().with_timer())?;
    let body = vec![Stmt::ret(vec![var("x") + var("x")])];
    let function = engine.jit(Program::new("double", ["x"], body));
    let inputs: Vec<Value> = vec![common::tensor(&[1.0f32]).into()];

    function.compile_and_run(&inputs)?;
    assert!(function.trace().is_empty());

    function.compile_and_run(&inputs)?;
    let events = function.trace();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, TraceEventKind::OpExecute);
    assert_eq!(events[0].op_name, OpKind::Add.to_string());
    assert_eq!(events[0].scope, "graph");
    assert_eq!(events[1].kind, TraceEventKind::Return);

    let json = serde_json::to_value(&events)?;
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn arity_mismatch_is_rejected_before_tracing() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(sign_select());
    let err = function
        .compile_and_run(&[common::tensor(&[1i64]).into()])
        .err()
        .ok_or_else(|| anyhow!("expected an arity error"))?;
    assert!(matches!(
        err,
        graftjit::EngineError::Trace(graftjit::TraceError::Arity { expected: 2, actual: 1, .. })
    ));
    assert_eq!(function.trace_count(), 0);
    Ok(())
}
