use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::tensor::{broadcast_shape, DType, TensorValue};

use super::broadcast::broadcast_indices;
use super::wide::{narrow, widen, Wide};

fn shape_error(op: &OpKind, err: anyhow::Error) -> OperatorError {
    OperatorError::kernel(op, err.to_string())
}

pub(crate) fn logical(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    if let OpKind::LogicalNot = op {
        let input = &inputs[0];
        let values = widen(input).into_bool().into_iter().map(|x| !x).collect();
        return Ok(vec![narrow(DType::Bool, Wide::Bool(values), input.shape().to_vec())]);
    }
    let (lhs, rhs) = (&inputs[0], &inputs[1]);
    let shape = broadcast_shape(lhs.shape(), rhs.shape()).map_err(|err| shape_error(op, err))?;
    let a = widen(lhs).into_bool();
    let b = widen(rhs).into_bool();
    let li = broadcast_indices(lhs.shape(), &shape);
    let ri = broadcast_indices(rhs.shape(), &shape);
    let values = li
        .iter()
        .zip(ri.iter())
        .map(|(&i, &j)| match op {
            OpKind::LogicalAnd => a[i] && b[j],
            _ => a[i] || b[j],
        })
        .collect();
    Ok(vec![narrow(DType::Bool, Wide::Bool(values), shape)])
}

/// `select(pred, on_true, on_false)` with three-way broadcasting.
pub(crate) fn select(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (pred, on_true, on_false) = (&inputs[0], &inputs[1], &inputs[2]);
    let shape = broadcast_shape(on_true.shape(), on_false.shape())
        .and_then(|shape| broadcast_shape(pred.shape(), &shape))
        .map_err(|err| shape_error(op, err))?;
    let mask = widen(pred).take(&broadcast_indices(pred.shape(), &shape)).into_bool();
    let a = widen(on_true).take(&broadcast_indices(on_true.shape(), &shape));
    let b = widen(on_false).take(&broadcast_indices(on_false.shape(), &shape));
    let out = match (a, b) {
        (Wide::Int(a), Wide::Int(b)) => Wide::Int(pick(&mask, a, b)),
        (Wide::Float(a), Wide::Float(b)) => Wide::Float(pick(&mask, a, b)),
        (Wide::Bool(a), Wide::Bool(b)) => Wide::Bool(pick(&mask, a, b)),
        _ => {
            return Err(OperatorError::DTypeMismatch {
                op: op.to_string(),
                lhs: on_true.dtype(),
                rhs: on_false.dtype(),
            })
        }
    };
    Ok(vec![narrow(on_true.dtype(), out, shape)])
}

fn pick<T: Copy>(mask: &[bool], a: Vec<T>, b: Vec<T>) -> Vec<T> {
    mask.iter()
        .zip(a.into_iter().zip(b))
        .map(|(&m, (x, y))| if m { x } else { y })
        .collect()
}
