use std::cmp::Ordering;

use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::tensor::{broadcast_shape, DType, TensorValue};

use super::broadcast::broadcast_indices;
use super::wide::{narrow, widen, Wide};

fn holds(op: &OpKind, ordering: Option<Ordering>) -> bool {
    match (op, ordering) {
        (OpKind::Ne, None) => true,
        (_, None) => false,
        (OpKind::Eq, Some(ord)) => ord == Ordering::Equal,
        (OpKind::Ne, Some(ord)) => ord != Ordering::Equal,
        (OpKind::Lt, Some(ord)) => ord == Ordering::Less,
        (OpKind::Le, Some(ord)) => ord != Ordering::Greater,
        (OpKind::Gt, Some(ord)) => ord == Ordering::Greater,
        (OpKind::Ge, Some(ord)) => ord != Ordering::Less,
        _ => false,
    }
}

/// Elementwise comparison. NaN compares unordered, so only `ne` holds.
pub(crate) fn compare(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (lhs, rhs) = (&inputs[0], &inputs[1]);
    let shape = broadcast_shape(lhs.shape(), rhs.shape()).map_err(|err| OperatorError::kernel(op, err.to_string()))?;
    let li = broadcast_indices(lhs.shape(), &shape);
    let ri = broadcast_indices(rhs.shape(), &shape);
    let pairs = li.iter().zip(ri.iter());
    let values: Vec<bool> = match (widen(lhs), widen(rhs)) {
        (Wide::Int(a), Wide::Int(b)) => pairs.map(|(&i, &j)| holds(op, Some(a[i].cmp(&b[j])))).collect(),
        (Wide::Float(a), Wide::Float(b)) => pairs.map(|(&i, &j)| holds(op, a[i].partial_cmp(&b[j]))).collect(),
        (Wide::Bool(a), Wide::Bool(b)) => pairs.map(|(&i, &j)| holds(op, Some(a[i].cmp(&b[j])))).collect(),
        _ => {
            return Err(OperatorError::DTypeMismatch {
                op: op.to_string(),
                lhs: lhs.dtype(),
                rhs: rhs.dtype(),
            })
        }
    };
    Ok(vec![narrow(DType::Bool, Wide::Bool(values), shape)])
}
