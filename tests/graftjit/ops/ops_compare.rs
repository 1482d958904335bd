use anyhow::Result;
use graftjit::program::{int, var, Program, Stmt};
use graftjit::{OpAttrs, OpKind, OpRegistry, TensorValue, Value};

use crate::common;

struct GeCase {
    lhs: TensorValue,
    rhs: TensorValue,
    expected: [bool; 3],
}

fn ge_cases() -> Vec<GeCase> {
    vec![
        GeCase {
            lhs: common::tensor(&[1i32, 2, 3]),
            rhs: common::tensor(&[3i32, 2, 1]),
            expected: [false, true, true],
        },
        GeCase {
            lhs: common::tensor(&[1.0f32, 2.0, -1.0]),
            rhs: common::tensor(&[-3.0f32, 2.0, -1.0]),
            expected: [true, true, true],
        },
        GeCase {
            lhs: common::tensor(&[1.0f64, 2.0, -1.0]),
            rhs: common::tensor(&[-3.0f64, 2.0, -1.0]),
            expected: [true, true, true],
        },
        GeCase {
            lhs: common::tensor(&[1u8, 2, 250]),
            rhs: common::tensor(&[3u8, 2, 1]),
            expected: [false, true, true],
        },
        GeCase {
            lhs: common::tensor(&[-1i8, 2, -128]),
            rhs: common::tensor(&[-3i8, 2, 127]),
            expected: [true, true, false],
        },
    ]
}

#[test]
fn ge_matches_reference_per_dtype() -> Result<()> {
    let registry = OpRegistry::shared();
    for case in ge_cases() {
        let out = registry.invoke(&OpKind::Ge, &[case.lhs.clone(), case.rhs.clone()], &OpAttrs::none())?;
        common::assert_tensor_eq(&out[0], &common::tensor(&case.expected))?;
    }
    Ok(())
}

#[test]
fn ge_through_compiled_function_matches_eager() -> Result<()> {
    let engine = common::engine()?;
    let body = vec![Stmt::ret(vec![var("x").ge(var("y"))])];
    let function = engine.jit(Program::new("ge", ["x", "y"], body));
    for case in ge_cases() {
        let inputs: Vec<Value> = vec![case.lhs.into(), case.rhs.into()];
        let compiled = function.compile_and_run(&inputs)?;
        let eager = function.run_eager(&inputs)?;
        common::assert_tensor_eq(&compiled[0], &common::tensor(&case.expected))?;
        common::assert_tensor_eq(&compiled[0], &eager[0])?;
    }
    assert_eq!(function.trace_count(), 5);
    Ok(())
}

#[test]
fn compare_broadcasts_host_scalars() -> Result<()> {
    let engine = common::engine()?;
    let body = vec![Stmt::ret(vec![var("x").lt(int(2))])];
    let function = engine.jit(Program::new("lt_two", ["x"], body));
    let out = function.compile_and_run(&[common::tensor(&[1i64, 2, 3]).into()])?;
    common::assert_tensor_eq(&out[0], &common::tensor(&[true, false, false]))?;
    Ok(())
}

#[test]
fn mismatched_dtypes_are_rejected() {
    let registry = OpRegistry::shared();
    let result = registry.invoke(
        &OpKind::Ge,
        &[common::tensor(&[1i32]), common::tensor(&[1.0f32])],
        &OpAttrs::none(),
    );
    assert!(result.is_err());
}
