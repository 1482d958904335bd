use anyhow::{anyhow, Result};
use graftjit::program::{int, len, var, BinOp, Program, Stmt};
use graftjit::{Classification, Engine, EngineError, ExecConfig, OpKind, TraceError, Value};

use crate::common;

fn accumulate_len_times() -> Program {
    let body = vec![
        Stmt::for_range(None, len(var("x")), vec![Stmt::assign("y", var("y") + var("x"))]),
        Stmt::ret(vec![var("y")]),
    ];
    Program::new("accumulate_len_times", ["x", "y"], body)
}

#[test]
fn loop_over_len_unrolls_once_per_element() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(accumulate_len_times());
    let inputs: Vec<Value> = vec![
        common::tensor(&[1.0f32, 2.0, 3.0]).into(),
        common::tensor(&[0.5f32, 0.5, 0.5]).into(),
    ];
    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[3.5f32, 6.5, 9.5]))?;

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    assert!(artifact.report().is_fully_graph_native());
    assert_eq!(artifact.graph().count_ops(&OpKind::Add), 3);
    assert_eq!(artifact.graph().count_consts(), 0);
    assert!(artifact.graph().fallback_nodes().is_empty());
    Ok(())
}

#[test]
fn empty_range_emits_no_nodes() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(accumulate_len_times());
    let inputs: Vec<Value> = vec![
        common::tensor::<f32>(&[]).into(),
        common::tensor::<f32>(&[]).into(),
    ];
    let out = function.compile_and_run(&inputs)?;
    assert_eq!(out[0].shape(), &[0]);

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    assert_eq!(artifact.graph().count_ops(&OpKind::Add), 0);
    assert_eq!(artifact.stats().nodes, 0);
    Ok(())
}

#[test]
fn loop_variable_is_a_host_value() -> Result<()> {
    let body = vec![
        Stmt::for_range(Some("i"), int(4), vec![Stmt::aug_assign("y", BinOp::Add, var("i"))]),
        Stmt::ret(vec![var("y"), var("i")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("loop_variable", ["y"], body));
    let out = function.compile_and_run(&[common::tensor(&[10i64, 20]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[16i64, 26]))?;
    common::assert_tensor_eq(&out[1], &graftjit::TensorValue::from(3i64))?;
    Ok(())
}

#[test]
fn loops_past_the_unroll_limit_fall_back() -> Result<()> {
    let engine = Engine::new(ExecConfig::default().with_max_unroll(2))?;
    let body = vec![
        Stmt::for_range(None, int(3), vec![Stmt::assign("y", var("y") + var("x"))]),
        Stmt::ret(vec![var("y")]),
    ];
    let function = engine.jit(Program::new("over_limit", ["x", "y"], body));
    let inputs: Vec<Value> = vec![
        common::tensor(&[1i32, 2]).into(),
        common::tensor(&[0i32, 0]).into(),
    ];
    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[3i32, 6]))?;

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    match &artifact.report().top_level[0].classification {
        Classification::Fallback { reason } => assert!(reason.contains("unroll limit"), "{}", reason),
        other => return Err(anyhow!("expected fallback, got {}", other)),
    }
    assert_eq!(artifact.graph().fallback_nodes().len(), 1);
    // Recorded interpreter calls are kept for inspection.
    assert_eq!(artifact.stats().recorded_invocations, 3);
    Ok(())
}

#[test]
fn while_loops_are_always_interpreted() -> Result<()> {
    let body = vec![
        Stmt::assign("i", int(0)),
        Stmt::while_(
            var("i").lt(int(3)),
            vec![
                Stmt::assign("y", var("y") + var("x")),
                Stmt::aug_assign("i", BinOp::Add, int(1)),
            ],
        ),
        Stmt::ret(vec![var("y")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("while_add", ["x", "y"], body));
    let inputs: Vec<Value> = vec![
        common::tensor(&[1.0f64, -1.0]).into(),
        common::tensor(&[0.0f64, 0.0]).into(),
    ];

    for _ in 0..2 {
        let out = function.compile_and_run(&inputs)?;
        common::assert_tensor_eq(&out[0], &common::tensor(&[3.0f64, -3.0]))?;
    }
    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    let report = artifact.report();
    assert!(report.top_level[0].classification.is_graph_native());
    assert!(report.top_level[1].classification.is_fallback());
    assert_eq!(function.trace_count(), 1);
    Ok(())
}

#[test]
fn shape_error_inside_interpreted_loop_is_not_cached() -> Result<()> {
    let body = vec![
        Stmt::assign("i", int(0)),
        Stmt::while_(
            var("i").lt(int(1)),
            vec![
                Stmt::assign("z", var("x") + var("y")),
                Stmt::aug_assign("i", BinOp::Add, int(1)),
            ],
        ),
        Stmt::ret(vec![var("z")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("bad_shapes", ["x", "y"], body));
    let inputs: Vec<Value> = vec![
        common::tensor(&[1.0f32, 2.0]).into(),
        common::tensor(&[1.0f32, 2.0, 3.0]).into(),
    ];

    let err = function
        .compile_and_run(&inputs)
        .err()
        .ok_or_else(|| anyhow!("expected a shape error"))?;
    assert!(matches!(err, EngineError::Trace(TraceError::Operator { .. })), "{}", err);
    assert_eq!(function.cached_artifacts(), 0);
    assert!(function.artifact_for(&inputs)?.is_none());

    let eager = function.run_eager(&inputs);
    assert!(matches!(eager, Err(EngineError::Trace(TraceError::Operator { .. }))));
    Ok(())
}
