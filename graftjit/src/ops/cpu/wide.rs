//! Widened element views used by the reference kernels.
//!
//! Integer dtypes widen to `i64`, float dtypes to `f64`. Narrowing back
//! with `as` reproduces the wrapping behaviour of native arithmetic in the
//! target width, and a single f32 operation computed in f64 rounds to the
//! same result as the native one.
use crate::tensor::{DType, Tensor, TensorValue, F16};

#[derive(Debug, Clone)]
pub(crate) enum Wide {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Bool(Vec<bool>),
}

impl Wide {
    /// Pick elements by source index.
    pub(crate) fn take(&self, indices: &[usize]) -> Wide {
        match self {
            Wide::Int(v) => Wide::Int(indices.iter().map(|&i| v[i]).collect()),
            Wide::Float(v) => Wide::Float(indices.iter().map(|&i| v[i]).collect()),
            Wide::Bool(v) => Wide::Bool(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    pub(crate) fn into_i64(self) -> Vec<i64> {
        match self {
            Wide::Int(v) => v,
            Wide::Float(v) => v.into_iter().map(|x| x as i64).collect(),
            Wide::Bool(v) => v.into_iter().map(i64::from).collect(),
        }
    }

    pub(crate) fn into_f64(self) -> Vec<f64> {
        match self {
            Wide::Int(v) => v.into_iter().map(|x| x as f64).collect(),
            Wide::Float(v) => v,
            Wide::Bool(v) => v.into_iter().map(|x| if x { 1.0 } else { 0.0 }).collect(),
        }
    }

    pub(crate) fn into_bool(self) -> Vec<bool> {
        match self {
            Wide::Int(v) => v.into_iter().map(|x| x != 0).collect(),
            Wide::Float(v) => v.into_iter().map(|x| x != 0.0).collect(),
            Wide::Bool(v) => v,
        }
    }
}

pub(crate) fn widen(value: &TensorValue) -> Wide {
    match value {
        TensorValue::I8(t) => Wide::Int(t.data.iter().map(|&x| x as i64).collect()),
        TensorValue::I16(t) => Wide::Int(t.data.iter().map(|&x| x as i64).collect()),
        TensorValue::I32(t) => Wide::Int(t.data.iter().map(|&x| x as i64).collect()),
        TensorValue::I64(t) => Wide::Int(t.data.clone()),
        TensorValue::U8(t) => Wide::Int(t.data.iter().map(|&x| x as i64).collect()),
        TensorValue::F16(t) => Wide::Float(t.data.iter().map(|x| x.to_f64()).collect()),
        TensorValue::F32(t) => Wide::Float(t.data.iter().map(|&x| x as f64).collect()),
        TensorValue::F64(t) => Wide::Float(t.data.clone()),
        TensorValue::Bool(t) => Wide::Bool(t.data.clone()),
    }
}

/// Convert widened elements back into a tensor of `dtype`.
pub(crate) fn narrow(dtype: DType, wide: Wide, shape: Vec<usize>) -> TensorValue {
    match dtype {
        DType::I8 => TensorValue::I8(Tensor::from_parts(
            wide.into_i64().into_iter().map(|x| x as i8).collect(),
            shape,
        )),
        DType::I16 => TensorValue::I16(Tensor::from_parts(
            wide.into_i64().into_iter().map(|x| x as i16).collect(),
            shape,
        )),
        DType::I32 => TensorValue::I32(Tensor::from_parts(
            wide.into_i64().into_iter().map(|x| x as i32).collect(),
            shape,
        )),
        DType::I64 => TensorValue::I64(Tensor::from_parts(wide.into_i64(), shape)),
        DType::U8 => TensorValue::U8(Tensor::from_parts(
            wide.into_i64().into_iter().map(|x| x as u8).collect(),
            shape,
        )),
        DType::F16 => TensorValue::F16(Tensor::from_parts(
            wide.into_f64().into_iter().map(F16::from_f64).collect(),
            shape,
        )),
        DType::F32 => TensorValue::F32(Tensor::from_parts(
            wide.into_f64().into_iter().map(|x| x as f32).collect(),
            shape,
        )),
        DType::F64 => TensorValue::F64(Tensor::from_parts(wide.into_f64(), shape)),
        DType::Bool => TensorValue::Bool(Tensor::from_parts(wide.into_bool(), shape)),
    }
}
