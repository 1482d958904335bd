use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::registry::gather_axis;
use crate::tensor::TensorValue;

use super::wide::{narrow, widen};

/// Gather slices of `params` along `axis` at the given indices.
pub(crate) fn gather(op: &OpKind, attrs: &OpAttrs, inputs: &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> {
    let (params, indices) = (&inputs[0], &inputs[1]);
    let shape = params.shape();
    let axis = gather_axis(op, shape.len(), attrs)?;
    let outer: usize = shape[..axis].iter().product();
    let inner: usize = shape[axis + 1..].iter().product();
    let dim = shape[axis];

    let positions = widen(indices).into_i64();
    let mut resolved = Vec::with_capacity(positions.len());
    for &position in &positions {
        if position < 0 || position as usize >= dim {
            return Err(OperatorError::kernel(
                op,
                format!("index {} out of range for axis {} of size {}", position, axis, dim),
            ));
        }
        resolved.push(position as usize);
    }

    let mut source = Vec::with_capacity(outer * resolved.len() * inner);
    for o in 0..outer {
        for &row in &resolved {
            let base = (o * dim + row) * inner;
            source.extend(base..base + inner);
        }
    }

    let mut out_shape = shape[..axis].to_vec();
    out_shape.extend_from_slice(indices.shape());
    out_shape.extend_from_slice(&shape[axis + 1..]);
    Ok(vec![narrow(params.dtype(), widen(params).take(&source), out_shape)])
}
