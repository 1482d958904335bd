use anyhow::{anyhow, Result};

pub fn numel(shape: &[usize]) -> usize {
    shape.iter().copied().product::<usize>()
}

pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1usize;
    for (i, dim) in shape.iter().enumerate().rev() {
        strides[i] = stride;
        stride = stride.saturating_mul(*dim);
    }
    strides
}

pub fn linear_to_indices(linear: usize, shape: &[usize]) -> Vec<usize> {
    let mut rem = linear;
    let mut out = vec![0; shape.len()];
    for (i, dim) in shape.iter().enumerate().rev() {
        if *dim == 0 {
            continue;
        }
        out[i] = rem % dim;
        rem /= dim;
    }
    out
}

/// Numpy-style broadcast of two shapes, aligned from the trailing dimension.
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let rank = lhs.len().max(rhs.len());
    let mut out = vec![0; rank];
    for i in 0..rank {
        let l = dim_from_end(lhs, rank - 1 - i);
        let r = dim_from_end(rhs, rank - 1 - i);
        out[i] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(anyhow!(
                    "shapes {:?} and {:?} cannot be broadcast",
                    lhs,
                    rhs
                ))
            }
        };
    }
    Ok(out)
}

fn dim_from_end(shape: &[usize], from_end: usize) -> usize {
    if from_end < shape.len() {
        shape[shape.len() - 1 - from_end]
    } else {
        1
    }
}

/// Map an index into a broadcast output back to the flat index of an input.
pub fn broadcast_source_index(out_coords: &[usize], in_shape: &[usize], in_strides: &[usize]) -> usize {
    let offset = out_coords.len() - in_shape.len();
    let mut flat = 0usize;
    for (i, (dim, stride)) in in_shape.iter().zip(in_strides.iter()).enumerate() {
        if *dim != 1 {
            flat += out_coords[offset + i] * stride;
        }
    }
    flat
}
