use anyhow::{anyhow, Result};
use graftjit::program::{call_with, int, item, len, list, var, BinOp, Expr, Program, RegionId, Stmt};
use graftjit::{
    Engine, EngineError, ExecConfig, GraphOutputs, OpAttrs, OpKind, RegionState, TensorValue, TraceError, Value,
};

use crate::common;

fn scenario_inputs() -> Vec<Value> {
    graftjit::values![
        common::tensor(&[1i64]),
        common::tensor(&[2i64]),
        common::tensor(&[7i64]),
    ]
}

#[test]
fn if_after_for_in_if_matches_eager() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(common::if_after_for_in_if());
    let inputs = scenario_inputs();

    let graph = function.compile_and_run(&inputs)?;
    let eager = function.run_eager(&inputs)?;
    common::assert_tensor_eq(&graph[0], &common::tensor(&[5i64]))?;
    common::assert_tensor_eq(&graph[0], &eager[0])?;

    let again = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&again[0], &graph[0])?;
    assert_eq!(function.trace_count(), 1);
    assert_eq!(function.replay_count(), 1);
    Ok(())
}

#[test]
fn if_after_for_in_if_eager_mode() -> Result<()> {
    let engine = Engine::new(ExecConfig::default().eager())?;
    let function = engine.jit(common::if_after_for_in_if());
    let out = function.compile_and_run(&scenario_inputs())?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[5i64]))?;
    assert_eq!(function.trace_count(), 0);
    assert_eq!(function.cached_artifacts(), 0);
    Ok(())
}

#[test]
fn data_dependent_conditions_become_fallback_holes() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(common::if_after_for_in_if());
    let inputs = scenario_inputs();
    function.compile_and_run(&inputs)?;

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing after first call"))?;
    let report = artifact.report();
    assert_eq!(report.top_level.len(), 3);
    assert!(report.top_level[0].classification.is_fallback());
    assert!(report.top_level[1].classification.is_fallback());
    assert!(report.top_level[2].classification.is_graph_native());
    assert!(report.region(RegionId(0)).map_or(false, |c| c.is_fallback()));
    assert!(report.region(RegionId(2)).map_or(false, |c| c.is_fallback()));
    assert_eq!(report.fallback_statements(), 2);

    let graph = artifact.graph();
    assert_eq!(graph.fallback_nodes().len(), 2);
    assert_eq!(graph.count_ops(&OpKind::Add), 1);
    assert!(matches!(graph.outputs, GraphOutputs::Values(ref refs) if refs.len() == 1));
    Ok(())
}

#[test]
fn classification_is_deterministic_across_retraces() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(common::if_after_for_in_if());
    let inputs = scenario_inputs();

    function.compile_and_run(&inputs)?;
    let first = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?
        .report()
        .clone();
    function.invalidate();
    assert_eq!(function.cached_artifacts(), 0);

    function.compile_and_run(&inputs)?;
    let second = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?
        .report()
        .clone();
    assert_eq!(function.trace_count(), 2);
    assert_eq!(first, second);
    Ok(())
}

fn unrolled_then_tail() -> Program {
    let first = call_with(OpKind::Gather, vec![var("y"), int(0)], OpAttrs::none());
    let body = vec![
        Stmt::for_range(
            None,
            len(var("z")) - int(1),
            vec![Stmt::assign("y", var("y") + var("x"))],
        ),
        Stmt::if_(
            item(first).gt(int(5)),
            vec![Stmt::ret(vec![var("y")])],
            vec![],
        ),
        Stmt::ret(vec![var("x")]),
    ];
    Program::new("unrolled_then_tail", ["x", "y", "z"], body)
}

#[test]
fn static_loop_unrolls_and_return_in_fallback_becomes_tail() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(unrolled_then_tail());
    let inputs: Vec<Value> = vec![
        common::tensor(&[1i64, 2]).into(),
        common::tensor(&[3i64, 4]).into(),
        common::tensor(&[1i64, 2, 3, 4]).into(),
    ];

    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[6i64, 10]))?;

    let artifact = function
        .artifact_for(&inputs)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    let report = artifact.report();
    assert!(report.top_level[0].classification.is_graph_native());
    assert!(report.top_level[1].classification.is_fallback());
    assert!(report.top_level[1].tail);
    assert_eq!(report.top_level.len(), 2);

    let graph = artifact.graph();
    assert_eq!(graph.count_ops(&OpKind::Add), 3);
    let holes = graph.fallback_nodes();
    assert_eq!(holes.len(), 1);
    assert!(holes[0].tail);
    assert_eq!(holes[0].statements.len(), 2);
    assert!(matches!(graph.outputs, GraphOutputs::Tail { .. }));

    // Small first element takes the final return instead.
    let small: Vec<Value> = vec![
        common::tensor(&[-1i64, 0]).into(),
        common::tensor(&[0i64, 0]).into(),
        common::tensor(&[0i64, 0, 0, 0]).into(),
    ];
    let out = function.compile_and_run(&small)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[-1i64, 0]))?;
    assert_eq!(function.trace_count(), 1);
    Ok(())
}

fn chained_conditionals() -> Program {
    let body = vec![
        Stmt::assign("y", var("x") * 2),
        Stmt::if_(
            item(var("x")).gt(Expr::from(1.0)),
            vec![Stmt::aug_assign("y", BinOp::Add, var("x"))],
            vec![Stmt::if_(
                item(var("x")).lt(Expr::from(-1.0)),
                vec![Stmt::aug_assign("y", BinOp::Sub, var("x"))],
                vec![Stmt::aug_assign("y", BinOp::Mul, var("x"))],
            )],
        ),
        Stmt::if_(
            var("y").gt(var("x")),
            vec![Stmt::assign("z", var("y") - var("x"))],
            vec![Stmt::assign("z", var("x") - var("y"))],
        ),
        Stmt::ret(vec![var("z"), var("y")]),
    ];
    Program::new("chained_conditionals", ["x"], body)
}

#[test]
fn chained_conditionals_match_eager_for_every_branch() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(chained_conditionals());

    for x in [2.0f32, -2.0, 0.5, 1.5, -0.25] {
        let inputs: Vec<Value> = vec![common::tensor(&[x]).into()];
        let compiled = function.compile_and_run(&inputs)?;
        let eager = function.run_eager(&inputs)?;
        assert_eq!(compiled.len(), 2);
        for (c, e) in compiled.iter().zip(&eager) {
            common::assert_tensor_eq(c, e)?;
        }
    }
    assert_eq!(function.trace_count(), 1);
    assert_eq!(function.replay_count(), 4);
    Ok(())
}

#[test]
fn raise_inside_fallback_surfaces_as_trace_error() -> Result<()> {
    let body = vec![
        Stmt::if_(
            item(var("x")).gt(int(0)),
            vec![Stmt::raise("positive input")],
            vec![],
        ),
        Stmt::ret(vec![var("x")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("raises", ["x"], body));

    let ok = function.compile_and_run(&[common::tensor(&[-3i64]).into()])?;
    common::assert_tensor_eq(&ok[0], &common::tensor(&[-3i64]))?;

    let err = function
        .compile_and_run(&[common::tensor(&[3i64]).into()])
        .err()
        .ok_or_else(|| anyhow!("expected the raise to propagate"))?;
    assert!(matches!(
        err,
        graftjit::EngineError::Trace(graftjit::TraceError::Raised(_))
    ));
    Ok(())
}

#[test]
fn host_condition_only_classifies_the_taken_branch() -> Result<()> {
    let body = vec![
        Stmt::if_(
            var("k").gt(int(0)),
            vec![Stmt::assign("y", var("x") + var("x"))],
            vec![
                Stmt::for_range(None, int(2), vec![Stmt::assign("x", var("x") * var("x"))]),
                Stmt::assign("y", var("x")),
            ],
        ),
        Stmt::ret(vec![var("y")]),
    ];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("host_branch", ["x", "k"], body));
    let x: Value = common::tensor(&[3i64]).into();

    let positive = vec![x.clone(), Value::Int(1)];
    let out = function.compile_and_run(&positive)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[6i64]))?;
    let artifact = function
        .artifact_for(&positive)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    assert_eq!(artifact.report().state(RegionId(0)), RegionState::GraphNativeCompiled);
    assert_eq!(artifact.report().state(RegionId(1)), RegionState::Untraced);
    assert_eq!(artifact.graph().count_ops(&OpKind::Mul), 0);

    let negative = vec![x, Value::Int(-1)];
    let out = function.compile_and_run(&negative)?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[81i64]))?;
    let artifact = function
        .artifact_for(&negative)?
        .ok_or_else(|| anyhow!("artifact missing"))?;
    assert_eq!(artifact.report().state(RegionId(1)), RegionState::GraphNativeCompiled);
    assert_eq!(artifact.graph().count_ops(&OpKind::Mul), 2);
    assert_eq!(function.trace_count(), 2);
    Ok(())
}

fn repeat_list(count: i64) -> Program {
    let body = vec![
        Stmt::assign("l", list(vec![int(0), int(1)]) * int(count)),
        Stmt::ret(vec![len(var("l")), var("x")]),
    ];
    Program::new("repeat_list", ["x"], body)
}

#[test]
fn list_repetition_builds_host_lists() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(repeat_list(3));
    let out = function.compile_and_run(&[common::tensor(&[1i64]).into()])?;
    common::assert_tensor_eq(&out[0], &TensorValue::from(6i64))?;
    common::assert_tensor_eq(&out[1], &common::tensor(&[1i64]))?;
    Ok(())
}

#[test]
fn oversized_list_repetition_is_a_type_error() -> Result<()> {
    let engine = common::engine()?;
    let function = engine.jit(repeat_list(1 << 62));
    let inputs: Vec<Value> = vec![common::tensor(&[1i64]).into()];

    let err = function
        .compile_and_run(&inputs)
        .err()
        .ok_or_else(|| anyhow!("expected a type error"))?;
    assert!(matches!(err, EngineError::Trace(TraceError::Type(_))), "got {err}");
    assert_eq!(function.cached_artifacts(), 0);

    let eager = function.run_eager(&inputs).err();
    assert!(matches!(eager, Some(EngineError::Trace(TraceError::Type(_)))));
    Ok(())
}
