//! Output signatures of the built-in operators.
use crate::error::OperatorError;
use crate::graph::{AttrValue, OpAttrs, OpKind};
use crate::tensor::{broadcast_shape, DType, TensorSig};

type InferResult = Result<Vec<TensorSig>, OperatorError>;

pub(crate) fn infer_builtin(op: &OpKind, inputs: &[TensorSig], attrs: &OpAttrs) -> InferResult {
    match op {
        OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div => arithmetic(op, &inputs[0], &inputs[1]),
        OpKind::Neg => {
            require_numeric(op, inputs[0].dtype)?;
            Ok(vec![inputs[0].clone()])
        }
        OpKind::Eq | OpKind::Ne | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge => {
            same_dtype(op, &inputs[0], &inputs[1])?;
            let shape = broadcast(op, &inputs[0].shape, &inputs[1].shape)?;
            Ok(vec![TensorSig::new(DType::Bool, shape)])
        }
        OpKind::LogicalAnd | OpKind::LogicalOr => {
            require_bool(op, inputs[0].dtype)?;
            require_bool(op, inputs[1].dtype)?;
            let shape = broadcast(op, &inputs[0].shape, &inputs[1].shape)?;
            Ok(vec![TensorSig::new(DType::Bool, shape)])
        }
        OpKind::LogicalNot => {
            require_bool(op, inputs[0].dtype)?;
            Ok(vec![inputs[0].clone()])
        }
        OpKind::Select => {
            require_bool(op, inputs[0].dtype)?;
            same_dtype(op, &inputs[1], &inputs[2])?;
            let shape = broadcast(op, &inputs[1].shape, &inputs[2].shape)?;
            let shape = broadcast(op, &inputs[0].shape, &shape)?;
            Ok(vec![TensorSig::new(inputs[1].dtype, shape)])
        }
        OpKind::Matmul => matmul(op, &inputs[0], &inputs[1]),
        OpKind::BiasAdd => bias_add(op, &inputs[0], &inputs[1]),
        OpKind::Gather => gather(op, &inputs[0], &inputs[1], attrs),
        OpKind::Cast => {
            let dtype = match attrs.get("dtype") {
                Some(AttrValue::DType(dtype)) => *dtype,
                _ => {
                    return Err(OperatorError::Attr {
                        op: op.to_string(),
                        name: "dtype".to_string(),
                        reason: "missing target dtype".to_string(),
                    })
                }
            };
            Ok(vec![TensorSig::new(dtype, inputs[0].shape.clone())])
        }
        OpKind::Custom(name) => Err(OperatorError::Unknown(name.clone())),
    }
}

fn arithmetic(op: &OpKind, lhs: &TensorSig, rhs: &TensorSig) -> InferResult {
    same_dtype(op, lhs, rhs)?;
    require_numeric(op, lhs.dtype)?;
    let shape = broadcast(op, &lhs.shape, &rhs.shape)?;
    Ok(vec![TensorSig::new(lhs.dtype, shape)])
}

fn matmul(op: &OpKind, lhs: &TensorSig, rhs: &TensorSig) -> InferResult {
    same_dtype(op, lhs, rhs)?;
    require_numeric(op, lhs.dtype)?;
    match (lhs.shape.as_slice(), rhs.shape.as_slice()) {
        ([m, k], [k2, n]) if k == k2 => Ok(vec![TensorSig::new(lhs.dtype, vec![*m, *n])]),
        _ => Err(shape_mismatch(op, &lhs.shape, &rhs.shape)),
    }
}

fn bias_add(op: &OpKind, input: &TensorSig, bias: &TensorSig) -> InferResult {
    same_dtype(op, input, bias)?;
    require_numeric(op, input.dtype)?;
    match (input.shape.last(), bias.shape.as_slice()) {
        (Some(channels), [len]) if channels == len => Ok(vec![input.clone()]),
        _ => Err(shape_mismatch(op, &input.shape, &bias.shape)),
    }
}

fn gather(op: &OpKind, params: &TensorSig, indices: &TensorSig, attrs: &OpAttrs) -> InferResult {
    if !indices.dtype.is_int() {
        return Err(OperatorError::UnsupportedDType {
            op: op.to_string(),
            dtype: indices.dtype,
        });
    }
    let axis = gather_axis(op, params.shape.len(), attrs)?;
    let mut shape = params.shape[..axis].to_vec();
    shape.extend_from_slice(&indices.shape);
    shape.extend_from_slice(&params.shape[axis + 1..]);
    Ok(vec![TensorSig::new(params.dtype, shape)])
}

/// Resolve the gather axis, accepting negative values from the end.
pub(crate) fn gather_axis(op: &OpKind, rank: usize, attrs: &OpAttrs) -> Result<usize, OperatorError> {
    let raw = match attrs.get("axis") {
        Some(AttrValue::Int(axis)) => *axis,
        _ => 0,
    };
    let resolved = if raw < 0 { raw + rank as i64 } else { raw };
    if resolved < 0 || resolved >= rank as i64 {
        return Err(OperatorError::Attr {
            op: op.to_string(),
            name: "axis".to_string(),
            reason: format!("axis {} out of range for rank {}", raw, rank),
        });
    }
    Ok(resolved as usize)
}

fn same_dtype(op: &OpKind, lhs: &TensorSig, rhs: &TensorSig) -> Result<(), OperatorError> {
    if lhs.dtype != rhs.dtype {
        return Err(OperatorError::DTypeMismatch {
            op: op.to_string(),
            lhs: lhs.dtype,
            rhs: rhs.dtype,
        });
    }
    Ok(())
}

fn require_numeric(op: &OpKind, dtype: DType) -> Result<(), OperatorError> {
    if !dtype.is_numeric() {
        return Err(OperatorError::UnsupportedDType {
            op: op.to_string(),
            dtype,
        });
    }
    Ok(())
}

fn require_bool(op: &OpKind, dtype: DType) -> Result<(), OperatorError> {
    if dtype != DType::Bool {
        return Err(OperatorError::UnsupportedDType {
            op: op.to_string(),
            dtype,
        });
    }
    Ok(())
}

fn broadcast(op: &OpKind, lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, OperatorError> {
    broadcast_shape(lhs, rhs).map_err(|_| shape_mismatch(op, lhs, rhs))
}

fn shape_mismatch(op: &OpKind, lhs: &[usize], rhs: &[usize]) -> OperatorError {
    OperatorError::ShapeMismatch {
        op: op.to_string(),
        lhs: lhs.to_vec(),
        rhs: rhs.to_vec(),
    }
}
