use crate::tensor::{broadcast_source_index, compute_strides, linear_to_indices, numel};

/// Flat source index in `in_shape` for every element of `out_shape`.
pub(crate) fn broadcast_indices(in_shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let total = numel(out_shape);
    if in_shape == out_shape {
        return (0..total).collect();
    }
    let in_strides = compute_strides(in_shape);
    (0..total)
        .map(|linear| {
            let coords = linear_to_indices(linear, out_shape);
            broadcast_source_index(&coords, in_shape, &in_strides)
        })
        .collect()
}
