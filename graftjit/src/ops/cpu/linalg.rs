use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::tensor::TensorValue;

use super::elementwise::arithmetic;
use super::wide::{narrow, widen, Wide};

/// `[m, k] x [k, n]`. Floats accumulate in f64, integers wrap in i64.
pub(crate) fn matmul(op: &OpKind, _attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (lhs, rhs) = (&inputs[0], &inputs[1]);
    let (m, k, n) = match (lhs.shape(), rhs.shape()) {
        ([m, k], [k2, n]) if k == k2 => (*m, *k, *n),
        _ => {
            return Err(OperatorError::ShapeMismatch {
                op: op.to_string(),
                lhs: lhs.shape().to_vec(),
                rhs: rhs.shape().to_vec(),
            })
        }
    };
    let out = match (widen(lhs), widen(rhs)) {
        (Wide::Int(a), Wide::Int(b)) => {
            let mut out = vec![0i64; m * n];
            for i in 0..m {
                for j in 0..n {
                    let mut acc = 0i64;
                    for p in 0..k {
                        acc = acc.wrapping_add(a[i * k + p].wrapping_mul(b[p * n + j]));
                    }
                    out[i * n + j] = acc;
                }
            }
            Wide::Int(out)
        }
        (Wide::Float(a), Wide::Float(b)) => {
            let mut out = vec![0f64; m * n];
            for i in 0..m {
                for j in 0..n {
                    let mut acc = 0f64;
                    for p in 0..k {
                        acc += a[i * k + p] * b[p * n + j];
                    }
                    out[i * n + j] = acc;
                }
            }
            Wide::Float(out)
        }
        _ => {
            return Err(OperatorError::UnsupportedDType {
                op: op.to_string(),
                dtype: lhs.dtype(),
            })
        }
    };
    Ok(vec![narrow(lhs.dtype(), out, vec![m, n])])
}

/// Adds a rank-1 bias along the last dimension.
pub(crate) fn bias_add(op: &OpKind, attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (input, bias) = (&inputs[0], &inputs[1]);
    if bias.shape().len() != 1 || input.shape().last() != bias.shape().first() {
        return Err(OperatorError::ShapeMismatch {
            op: op.to_string(),
            lhs: input.shape().to_vec(),
            rhs: bias.shape().to_vec(),
        });
    }
    arithmetic(op, attrs, inputs)
}
