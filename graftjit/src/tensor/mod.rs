mod scalar;
mod shape;
mod tensor;
mod value;

pub use scalar::F16;
pub use shape::{broadcast_shape, broadcast_source_index, compute_strides, linear_to_indices, numel};
pub use tensor::{Tensor, TensorOptions};
pub use value::{DType, TensorElement, TensorSig, TensorValue};
pub(crate) use value::with_tensor;
