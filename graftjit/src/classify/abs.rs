use std::collections::HashMap;
use std::fmt;

use crate::tensor::TensorSig;
use crate::types::Value;

/// What the classifier knows about a name.
///
/// `dynamic` marks values produced by, or computed from, an interpreted
/// region: their signature is guarded at replay but their content may
/// change between calls, so no control-flow decision may rest on them.
#[derive(Debug, Clone, PartialEq)]
pub enum Abs {
    Tensor { sig: TensorSig, dynamic: bool },
    Host { value: Value, dynamic: bool },
    /// Assigned by an enclosing region that is itself interpreted.
    Unknown,
}

pub type AbsEnv = HashMap<String, Abs>;

impl Abs {
    pub fn of_value(value: &Value, dynamic: bool) -> Self {
        match value {
            Value::Tensor(tensor) => Abs::Tensor {
                sig: tensor.sig(),
                dynamic,
            },
            host => Abs::Host {
                value: host.clone(),
                dynamic,
            },
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Abs::Tensor { dynamic, .. } | Abs::Host { dynamic, .. } => *dynamic,
            Abs::Unknown => true,
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Abs::Tensor { .. })
    }

    /// The constant value, if this is a host value fixed for the signature.
    pub fn static_host(&self) -> Option<&Value> {
        match self {
            Abs::Host {
                value,
                dynamic: false,
            } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Abs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_dynamic() { "dynamic " } else { "" };
        match self {
            Abs::Tensor { sig, .. } => write!(f, "{}tensor {}", tag, sig),
            Abs::Host { value, .. } => write!(f, "{}{} {}", tag, value.type_name(), value),
            Abs::Unknown => f.write_str("unknown"),
        }
    }
}
