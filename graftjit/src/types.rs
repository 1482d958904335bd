use std::fmt;

use serde::{Deserialize, Serialize};

use crate::formatting::FormatValue;
use crate::tensor::{Tensor, TensorElement, TensorSig, TensorValue};

/// A value bound to a name while a program runs.
///
/// Tensors flow through operators. The host variants are ordinary
/// interpreter values: loop counters, flags, literal constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Tensor(TensorValue),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
}

/// Coarse kind of a value, used for guards and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Tensor(TensorSig),
    Int,
    Float,
    Bool,
    List,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Tensor(tensor) => ValueKind::Tensor(tensor.sig()),
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::List(_) => ValueKind::List,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Tensor(_) => "tensor",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Value::Tensor(_))
    }

    pub fn as_tensor(&self) -> Option<&TensorValue> {
        match self {
            Value::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    /// Materialize a host scalar as a rank-0 tensor of its natural dtype.
    pub fn to_tensor(&self) -> Option<TensorValue> {
        match self {
            Value::Tensor(tensor) => Some(tensor.clone()),
            Value::Int(v) => Some(TensorValue::from(*v)),
            Value::Float(v) => Some(TensorValue::from(*v)),
            Value::Bool(v) => Some(TensorValue::from(*v)),
            Value::List(_) => None,
        }
    }
}

impl From<TensorValue> for Value {
    fn from(value: TensorValue) -> Self {
        Value::Tensor(value)
    }
}

impl<T: TensorElement> From<Tensor<T>> for Value {
    fn from(value: Tensor<T>) -> Self {
        Value::Tensor(T::into_value(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tensor(tensor) => write!(f, "{}", tensor.format_value()),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::List(items) => {
                let joined = items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", joined)
            }
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Tensor(sig) => write!(f, "tensor {}", sig),
            ValueKind::Int => f.write_str("int"),
            ValueKind::Float => f.write_str("float"),
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::List => f.write_str("list"),
        }
    }
}
