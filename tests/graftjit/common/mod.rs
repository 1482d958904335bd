#![allow(dead_code)]

use anyhow::{anyhow, Result};
use graftjit::program::{int, var, BinOp, Expr, Program, Stmt};
use graftjit::{Engine, ExecConfig, Tensor, TensorElement, TensorValue};

pub fn tensor<T: TensorElement>(data: &[T]) -> TensorValue {
    T::into_value(Tensor::new(data.to_vec()))
}

pub fn tensor_shaped<T: TensorElement>(data: &[T], shape: &[usize]) -> Result<TensorValue> {
    Ok(T::into_value(Tensor::with_shape(data.to_vec(), shape.to_vec())?))
}

pub fn engine() -> Result<Engine> {
    Ok(Engine::new(ExecConfig::default())?)
}

pub fn assert_tensor_eq(actual: &TensorValue, expected: &TensorValue) -> Result<()> {
    if actual.dtype() != expected.dtype() {
        return Err(anyhow!(
            "dtype mismatch: actual {:?} expected {:?}",
            actual.dtype(),
            expected.dtype()
        ));
    }
    if actual.shape() != expected.shape() {
        return Err(anyhow!(
            "shape mismatch: actual {:?} expected {:?}",
            actual.shape(),
            expected.shape()
        ));
    }
    for index in 0..expected.len() {
        let (a, e) = (actual.get_f64(index), expected.get_f64(index));
        let close = match (a, e) {
            (Some(a), Some(e)) => (a - e).abs() <= 1e-6 * e.abs().max(1.0),
            _ => false,
        };
        if !close {
            return Err(anyhow!("element {} differs: actual {:?} expected {:?}", index, a, e));
        }
    }
    Ok(())
}

/// `if y > x and x < z: (for _ in range(3): y -= x); z = z + y`,
/// then `if x + y >= z: y = y * x - z`, returning `y + z`.
pub fn if_after_for_in_if() -> Program {
    let body = vec![
        Stmt::if_(
            Expr::and(var("y").gt(var("x")), var("x").lt(var("z"))),
            vec![
                Stmt::for_range(None, int(3), vec![Stmt::aug_assign("y", BinOp::Sub, var("x"))]),
                Stmt::assign("z", var("z") + var("y")),
            ],
            vec![],
        ),
        Stmt::if_(
            (var("x") + var("y")).ge(var("z")),
            vec![Stmt::assign("y", var("y") * var("x") - var("z"))],
            vec![],
        ),
        Stmt::ret(vec![var("y") + var("z")]),
    ];
    Program::new("if_after_for_in_if", ["x", "y", "z"], body)
}
