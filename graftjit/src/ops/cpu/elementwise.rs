use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::tensor::{broadcast_shape, TensorValue};

use super::broadcast::broadcast_indices;
use super::wide::{narrow, widen, Wide};

pub(crate) fn arithmetic(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (lhs, rhs) = (&inputs[0], &inputs[1]);
    let shape = broadcast_shape(lhs.shape(), rhs.shape()).map_err(|err| OperatorError::kernel(op, err.to_string()))?;
    let li = broadcast_indices(lhs.shape(), &shape);
    let ri = broadcast_indices(rhs.shape(), &shape);
    let out = match (widen(lhs), widen(rhs)) {
        (Wide::Int(a), Wide::Int(b)) => {
            let pairs = li.iter().zip(ri.iter()).map(|(&i, &j)| (a[i], b[j]));
            let values = match op {
                OpKind::Add | OpKind::BiasAdd => pairs.map(|(x, y)| x.wrapping_add(y)).collect(),
                OpKind::Sub => pairs.map(|(x, y)| x.wrapping_sub(y)).collect(),
                OpKind::Mul => pairs.map(|(x, y)| x.wrapping_mul(y)).collect(),
                OpKind::Div => {
                    let mut out = Vec::with_capacity(li.len());
                    for (x, y) in pairs {
                        if y == 0 {
                            return Err(OperatorError::kernel(op, "integer division by zero"));
                        }
                        out.push(x.wrapping_div(y));
                    }
                    out
                }
                _ => return Err(OperatorError::kernel(op, "not an arithmetic operator")),
            };
            Wide::Int(values)
        }
        (Wide::Float(a), Wide::Float(b)) => {
            let pairs = li.iter().zip(ri.iter()).map(|(&i, &j)| (a[i], b[j]));
            let values = match op {
                OpKind::Add | OpKind::BiasAdd => pairs.map(|(x, y)| x + y).collect(),
                OpKind::Sub => pairs.map(|(x, y)| x - y).collect(),
                OpKind::Mul => pairs.map(|(x, y)| x * y).collect(),
                OpKind::Div => pairs.map(|(x, y)| x / y).collect(),
                _ => return Err(OperatorError::kernel(op, "not an arithmetic operator")),
            };
            Wide::Float(values)
        }
        _ => {
            return Err(OperatorError::UnsupportedDType {
                op: op.to_string(),
                dtype: lhs.dtype(),
            })
        }
    };
    Ok(vec![narrow(lhs.dtype(), out, shape)])
}

pub(crate) fn neg(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let input = &inputs[0];
    let out = match widen(input) {
        Wide::Int(v) => Wide::Int(v.into_iter().map(i64::wrapping_neg).collect()),
        Wide::Float(v) => Wide::Float(v.into_iter().map(|x| -x).collect()),
        Wide::Bool(_) => {
            return Err(OperatorError::UnsupportedDType {
                op: op.to_string(),
                dtype: input.dtype(),
            })
        }
    };
    Ok(vec![narrow(input.dtype(), out, input.shape().to_vec())])
}

pub(crate) fn cast(op: &OpKind, attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let dtype = match attrs.get("dtype") {
        Some(crate::graph::AttrValue::DType(dtype)) => *dtype,
        _ => return Err(OperatorError::kernel(op, "missing target dtype")),
    };
    let input = &inputs[0];
    Ok(vec![narrow(dtype, widen(input), input.shape().to_vec())])
}
