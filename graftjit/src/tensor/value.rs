use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::{numel, Tensor, F16};

/// Element type that can be converted to/from `TensorValue`.
pub trait TensorElement: Sized + Clone {
    const DTYPE: DType;
    /// Attempt to extract a typed tensor from a generic value.
    fn from_value(value: &TensorValue) -> Option<&Tensor<Self>>;
    /// Wrap a typed tensor into a generic value.
    fn into_value(tensor: Tensor<Self>) -> TensorValue;
}

macro_rules! tensor_elements {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl TensorElement for $ty {
                const DTYPE: DType = DType::$variant;

                fn from_value(value: &TensorValue) -> Option<&Tensor<Self>> {
                    match value {
                        TensorValue::$variant(tensor) => Some(tensor),
                        _ => None,
                    }
                }

                fn into_value(tensor: Tensor<Self>) -> TensorValue {
                    TensorValue::$variant(tensor)
                }
            }

            impl From<Tensor<$ty>> for TensorValue {
                fn from(value: Tensor<$ty>) -> Self {
                    TensorValue::$variant(value)
                }
            }

            impl From<$ty> for TensorValue {
                fn from(value: $ty) -> Self {
                    TensorValue::$variant(Tensor::from_scalar(value))
                }
            }
        )*
    };
}

tensor_elements! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    F16 => F16,
    f32 => F32,
    f64 => F64,
    bool => Bool,
}

/// Run `$body` with `$tensor` bound to the typed tensor inside a value.
macro_rules! with_tensor {
    ($value:expr, $tensor:ident => $body:expr) => {
        match $value {
            TensorValue::I8($tensor) => $body,
            TensorValue::I16($tensor) => $body,
            TensorValue::I32($tensor) => $body,
            TensorValue::I64($tensor) => $body,
            TensorValue::U8($tensor) => $body,
            TensorValue::F16($tensor) => $body,
            TensorValue::F32($tensor) => $body,
            TensorValue::F64($tensor) => $body,
            TensorValue::Bool($tensor) => $body,
        }
    };
}

/// Supported element dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    I8,
    I16,
    I32,
    I64,
    U8,
    F16,
    F32,
    F64,
    Bool,
}

impl DType {
    pub const ALL: [DType; 9] = [
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::F16,
        DType::F32,
        DType::F64,
        DType::Bool,
    ];

    /// Parse a dtype from its identifier string.
    pub fn from_ident(ident: &str) -> Result<Self> {
        match ident {
            "i8" => Ok(DType::I8),
            "i16" => Ok(DType::I16),
            "i32" => Ok(DType::I32),
            "i64" => Ok(DType::I64),
            "u8" => Ok(DType::U8),
            "f16" => Ok(DType::F16),
            "f32" => Ok(DType::F32),
            "f64" => Ok(DType::F64),
            "bool" => Ok(DType::Bool),
            _ => Err(anyhow!("unsupported dtype: {}", ident)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::F16 => "f16",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Bool => "bool",
        }
    }

    /// True if the dtype is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    /// True for every integer dtype, signed or not.
    pub fn is_int(self) -> bool {
        matches!(
            self,
            DType::I8 | DType::I16 | DType::I32 | DType::I64 | DType::U8
        )
    }

    pub fn is_numeric(self) -> bool {
        self != DType::Bool
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static dtype and shape of a tensor value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSig {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl TensorSig {
    pub fn new(dtype: DType, shape: Vec<usize>) -> Self {
        Self { dtype, shape }
    }

    pub fn scalar(dtype: DType) -> Self {
        Self {
            dtype,
            shape: Vec::new(),
        }
    }

    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }
}

impl fmt::Display for TensorSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.dtype, self.shape)
    }
}

/// Runtime tensor value with an enum over concrete dtypes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "tensor", rename_all = "lowercase")]
pub enum TensorValue {
    I8(Tensor<i8>),
    I16(Tensor<i16>),
    I32(Tensor<i32>),
    I64(Tensor<i64>),
    U8(Tensor<u8>),
    F16(Tensor<F16>),
    F32(Tensor<f32>),
    F64(Tensor<f64>),
    Bool(Tensor<bool>),
}

impl TensorValue {
    /// Return the dtype of this value.
    pub fn dtype(&self) -> DType {
        match self {
            TensorValue::I8(_) => DType::I8,
            TensorValue::I16(_) => DType::I16,
            TensorValue::I32(_) => DType::I32,
            TensorValue::I64(_) => DType::I64,
            TensorValue::U8(_) => DType::U8,
            TensorValue::F16(_) => DType::F16,
            TensorValue::F32(_) => DType::F32,
            TensorValue::F64(_) => DType::F64,
            TensorValue::Bool(_) => DType::Bool,
        }
    }

    /// Return the tensor shape.
    pub fn shape(&self) -> &[usize] {
        with_tensor!(self, tensor => tensor.shape())
    }

    /// Return the logical element count.
    pub fn len(&self) -> usize {
        with_tensor!(self, tensor => tensor.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sig(&self) -> TensorSig {
        TensorSig::new(self.dtype(), self.shape().to_vec())
    }

    /// Construct a zero-filled tensor for a dtype and shape.
    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        let len = numel(shape);
        let shape = shape.to_vec();
        match dtype {
            DType::I8 => TensorValue::I8(Tensor::from_parts(vec![0; len], shape)),
            DType::I16 => TensorValue::I16(Tensor::from_parts(vec![0; len], shape)),
            DType::I32 => TensorValue::I32(Tensor::from_parts(vec![0; len], shape)),
            DType::I64 => TensorValue::I64(Tensor::from_parts(vec![0; len], shape)),
            DType::U8 => TensorValue::U8(Tensor::from_parts(vec![0; len], shape)),
            DType::F16 => TensorValue::F16(Tensor::from_parts(vec![F16::ZERO; len], shape)),
            DType::F32 => TensorValue::F32(Tensor::from_parts(vec![0.0; len], shape)),
            DType::F64 => TensorValue::F64(Tensor::from_parts(vec![0.0; len], shape)),
            DType::Bool => TensorValue::Bool(Tensor::from_parts(vec![false; len], shape)),
        }
    }

    /// Rank-0 tensor of `dtype` holding `value`, converted with `as` rules.
    pub fn scalar_from_i64(dtype: DType, value: i64) -> Self {
        match dtype {
            DType::I8 => TensorValue::from(value as i8),
            DType::I16 => TensorValue::from(value as i16),
            DType::I32 => TensorValue::from(value as i32),
            DType::I64 => TensorValue::from(value),
            DType::U8 => TensorValue::from(value as u8),
            DType::F16 => TensorValue::from(F16::from_f64(value as f64)),
            DType::F32 => TensorValue::from(value as f32),
            DType::F64 => TensorValue::from(value as f64),
            DType::Bool => TensorValue::from(value != 0),
        }
    }

    /// Rank-0 float tensor. Returns `None` for non-float dtypes.
    pub fn scalar_from_f64(dtype: DType, value: f64) -> Option<Self> {
        match dtype {
            DType::F16 => Some(TensorValue::from(F16::from_f64(value))),
            DType::F32 => Some(TensorValue::from(value as f32)),
            DType::F64 => Some(TensorValue::from(value)),
            _ => None,
        }
    }

    /// Borrow as a typed tensor.
    pub fn as_typed<T: TensorElement>(&self) -> Result<&Tensor<T>> {
        T::from_value(self)
            .ok_or_else(|| anyhow!("expected {} tensor, got {}", T::DTYPE, self.dtype()))
    }

    /// Element at a flat index widened to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        Some(match self {
            TensorValue::I8(t) => *t.data.get(index)? as f64,
            TensorValue::I16(t) => *t.data.get(index)? as f64,
            TensorValue::I32(t) => *t.data.get(index)? as f64,
            TensorValue::I64(t) => *t.data.get(index)? as f64,
            TensorValue::U8(t) => *t.data.get(index)? as f64,
            TensorValue::F16(t) => t.data.get(index)?.to_f64(),
            TensorValue::F32(t) => *t.data.get(index)? as f64,
            TensorValue::F64(t) => *t.data.get(index)?,
            TensorValue::Bool(t) => {
                if *t.data.get(index)? {
                    1.0
                } else {
                    0.0
                }
            }
        })
    }

    /// Element at a flat index as `i64`. Float dtypes are rejected.
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        Some(match self {
            TensorValue::I8(t) => *t.data.get(index)? as i64,
            TensorValue::I16(t) => *t.data.get(index)? as i64,
            TensorValue::I32(t) => *t.data.get(index)? as i64,
            TensorValue::I64(t) => *t.data.get(index)?,
            TensorValue::U8(t) => *t.data.get(index)? as i64,
            TensorValue::Bool(t) => *t.data.get(index)? as i64,
            TensorValue::F16(_) | TensorValue::F32(_) | TensorValue::F64(_) => return None,
        })
    }
}

pub(crate) use with_tensor;
