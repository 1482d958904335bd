//! Owned tensor container.
//!
//! `Tensor<T>` keeps flat row-major storage plus its shape. Rank-0 tensors
//! hold exactly one element.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::shape::numel;

/// Tensor construction options.
#[derive(Debug, Clone, Default)]
pub struct TensorOptions {
    /// Optional explicit shape. Defaults to a 1-D shape over the data.
    pub shape: Option<Vec<usize>>,
}

/// Owned tensor with row-major storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor<T> {
    pub data: Vec<T>,
    shape: Vec<usize>,
}

impl<T> Tensor<T> {
    /// Build a 1-D tensor from a flat data vector.
    ///
    /// # Example
    /// ```no_run
    /// # use graftjit::Tensor;
    /// # fn main() -> anyhow::Result<()> {
    /// let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0])?;
    /// # Ok(()) }
    /// ```
    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        Self::from_vec_with_opts(data, TensorOptions::default())
    }

    /// Build a tensor with an explicit shape.
    ///
    /// # Example
    /// ```no_run
    /// # use graftjit::{Tensor, TensorOptions};
    /// # fn main() -> anyhow::Result<()> {
    /// let t = Tensor::from_vec_with_opts(
    ///     vec![1.0f32, 2.0, 3.0, 4.0],
    ///     TensorOptions { shape: Some(vec![2, 2]) },
    /// )?;
    /// # Ok(()) }
    /// ```
    pub fn from_vec_with_opts(data: Vec<T>, opts: TensorOptions) -> Result<Self> {
        let shape = match opts.shape {
            Some(shape) => shape,
            None => vec![data.len()],
        };
        let expected = numel(&shape);
        if expected != data.len() {
            return Err(anyhow!(
                "tensor shape {:?} expects {} values, got {}",
                shape,
                expected,
                data.len()
            ));
        }
        Ok(Self { data, shape })
    }

    /// Shorthand for `from_vec_with_opts` with a shape.
    pub fn with_shape(data: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        Self::from_vec_with_opts(data, TensorOptions { shape: Some(shape) })
    }

    /// Create a rank-0 tensor from a single value.
    pub fn from_scalar(value: T) -> Self {
        Self {
            data: vec![value],
            shape: Vec::new(),
        }
    }

    /// Build a tensor from parts already known to agree.
    pub(crate) fn from_parts(data: Vec<T>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(numel(&shape), data.len());
        Self { data, shape }
    }

    /// Create a 1-D tensor.
    pub fn new(data: Vec<T>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    /// Return the element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Clone the tensor data into a vector.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.data.clone()
    }
}

impl<T> From<Vec<T>> for Tensor<T> {
    fn from(value: Vec<T>) -> Self {
        Tensor::new(value)
    }
}
