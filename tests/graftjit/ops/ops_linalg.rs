use anyhow::Result;
use graftjit::program::{call, call_with, var, Program, Stmt};
use graftjit::{AttrValue, DType, OpAttrs, OpKind, OpRegistry, Value};

use crate::common;

#[test]
fn dense_layer_matmul_then_bias_add() -> Result<()> {
    let body = vec![Stmt::ret(vec![call(
        OpKind::BiasAdd,
        vec![call(OpKind::Matmul, vec![var("x"), var("w")]), var("b")],
    )])];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("dense", ["x", "w", "b"], body));
    let inputs: Vec<Value> = vec![
        common::tensor_shaped(&[1.0f32; 64], &[1, 64])?.into(),
        common::tensor_shaped(&[1.0f32; 640], &[64, 10])?.into(),
        common::tensor(&[1.0f32; 10]).into(),
    ];

    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor_shaped(&[65.0f32; 10], &[1, 10])?)?;
    let replay = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&replay[0], &out[0])?;
    assert_eq!(function.replay_count(), 1);
    Ok(())
}

#[test]
fn gather_rows_then_add() -> Result<()> {
    let gathered = call_with(
        OpKind::Gather,
        vec![var("w1"), var("indices")],
        OpAttrs::none().with("axis", AttrValue::Int(0)),
    );
    let body = vec![Stmt::ret(vec![gathered + var("w2")])];
    let engine = common::engine()?;
    let function = engine.jit(Program::new("sparse_gather", ["w1", "indices", "w2"], body));
    let inputs: Vec<Value> = vec![
        common::tensor_shaped(&[1.0f32; 6], &[3, 1, 2])?.into(),
        common::tensor(&[0i32, 1]).into(),
        common::tensor_shaped(&[1.0f32; 4], &[2, 1, 2])?.into(),
    ];
    let out = function.compile_and_run(&inputs)?;
    common::assert_tensor_eq(&out[0], &common::tensor_shaped(&[2.0f32; 4], &[2, 1, 2])?)?;
    Ok(())
}

#[test]
fn gather_picks_requested_rows() -> Result<()> {
    let registry = OpRegistry::shared();
    let params = common::tensor_shaped(&[1i64, 2, 3, 4, 5, 6], &[3, 2])?;
    let out = registry.invoke(
        &OpKind::Gather,
        &[params.clone(), common::tensor(&[2i32, 0])],
        &OpAttrs::none(),
    )?;
    common::assert_tensor_eq(&out[0], &common::tensor_shaped(&[5i64, 6, 1, 2], &[2, 2])?)?;

    let columns = registry.invoke(
        &OpKind::Gather,
        &[params.clone(), common::tensor(&[1i32])],
        &OpAttrs::none().with("axis", AttrValue::Int(-1)),
    )?;
    common::assert_tensor_eq(&columns[0], &common::tensor_shaped(&[2i64, 4, 6], &[3, 1])?)?;

    let out_of_range = registry.invoke(&OpKind::Gather, &[params, common::tensor(&[3i32])], &OpAttrs::none());
    assert!(out_of_range.is_err());
    Ok(())
}

#[test]
fn integer_division_truncates_and_rejects_zero() -> Result<()> {
    let registry = OpRegistry::shared();
    let out = registry.invoke(
        &OpKind::Div,
        &[common::tensor(&[7i32, -7]), common::tensor(&[2i32, 2])],
        &OpAttrs::none(),
    )?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[3i32, -3]))?;

    let zero = registry.invoke(
        &OpKind::Div,
        &[common::tensor(&[1i32]), common::tensor(&[0i32])],
        &OpAttrs::none(),
    );
    assert!(zero.is_err());
    Ok(())
}

#[test]
fn cast_requires_target_dtype() -> Result<()> {
    let registry = OpRegistry::shared();
    let out = registry.invoke(
        &OpKind::Cast,
        &[common::tensor(&[1i32, -2])],
        &OpAttrs::none().with("dtype", AttrValue::DType(DType::F32)),
    )?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[1.0f32, -2.0]))?;
    assert!(registry
        .invoke(&OpKind::Cast, &[common::tensor(&[1i32])], &OpAttrs::none())
        .is_err());
    Ok(())
}

#[test]
fn matmul_rejects_inner_dim_mismatch() -> Result<()> {
    let registry = OpRegistry::shared();
    let result = registry.invoke(
        &OpKind::Matmul,
        &[
            common::tensor_shaped(&[1.0f32; 6], &[2, 3])?,
            common::tensor_shaped(&[1.0f32; 4], &[2, 2])?,
        ],
        &OpAttrs::none(),
    );
    assert!(result.is_err());
    Ok(())
}
