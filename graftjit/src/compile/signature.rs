//! Cache keys for compiled artifacts.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SignatureMismatch;
use crate::tensor::TensorSig;
use crate::types::Value;

const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

pub(crate) fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV1A_PRIME);
    }
    hash
}

/// Per-input part of a signature. Tensors contribute dtype and shape; host
/// values contribute their exact value, since tracing folds them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSig {
    Tensor(TensorSig),
    Host(HostSig),
}

/// Exact host value. Floats are kept as their bit pattern so every
/// non-finite value stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostSig {
    Int(i64),
    Float(u64),
    Bool(bool),
    List(Vec<InputSig>),
}

impl InputSig {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Tensor(tensor) => InputSig::Tensor(tensor.sig()),
            Value::Int(value) => InputSig::Host(HostSig::Int(*value)),
            Value::Float(value) => InputSig::Host(HostSig::Float(value.to_bits())),
            Value::Bool(value) => InputSig::Host(HostSig::Bool(*value)),
            Value::List(items) => InputSig::Host(HostSig::List(items.iter().map(InputSig::of).collect())),
        }
    }

    fn hash_into(&self, mut hash: u64) -> u64 {
        match self {
            InputSig::Tensor(sig) => {
                hash = fnv1a_bytes(hash, &[0, sig.dtype as u8]);
                hash = fnv1a_bytes(hash, &(sig.shape.len() as u64).to_le_bytes());
                for dim in &sig.shape {
                    hash = fnv1a_bytes(hash, &(*dim as u64).to_le_bytes());
                }
                hash
            }
            InputSig::Host(HostSig::Int(value)) => {
                fnv1a_bytes(fnv1a_bytes(hash, &[1]), &value.to_le_bytes())
            }
            InputSig::Host(HostSig::Float(bits)) => {
                fnv1a_bytes(fnv1a_bytes(hash, &[2]), &bits.to_le_bytes())
            }
            InputSig::Host(HostSig::Bool(value)) => fnv1a_bytes(hash, &[3, u8::from(*value)]),
            InputSig::Host(HostSig::List(items)) => {
                hash = fnv1a_bytes(hash, &[4]);
                hash = fnv1a_bytes(hash, &(items.len() as u64).to_le_bytes());
                items.iter().fold(hash, |hash, item| item.hash_into(hash))
            }
        }
    }
}

impl fmt::Display for InputSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSig::Tensor(sig) => write!(f, "{}", sig),
            InputSig::Host(HostSig::Int(value)) => write!(f, "{}", value),
            InputSig::Host(HostSig::Float(bits)) => write!(f, "{:?}", f64::from_bits(*bits)),
            InputSig::Host(HostSig::Bool(value)) => write!(f, "{}", value),
            InputSig::Host(HostSig::List(items)) => {
                let items = items.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<InputSig>,
    pub max_unroll: usize,
}

impl Signature {
    pub fn of(inputs: &[Value], max_unroll: usize) -> Self {
        Self {
            inputs: inputs.iter().map(InputSig::of).collect(),
            max_unroll,
        }
    }

    /// FNV-1a over the signature's fields.
    pub fn key(&self) -> u64 {
        let hash = fnv1a_bytes(FNV1A_OFFSET, &(self.inputs.len() as u64).to_le_bytes());
        let hash = self.inputs.iter().fold(hash, |hash, input| input.hash_into(hash));
        fnv1a_bytes(hash, &(self.max_unroll as u64).to_le_bytes())
    }

    pub(crate) fn check(&self, current: &Signature) -> Result<(), SignatureMismatch> {
        if self == current {
            return Ok(());
        }
        Err(SignatureMismatch(format!("artifact traced for {}, called with {}", self, current)))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.inputs.iter().map(ToString::to_string).collect::<Vec<_>>();
        write!(f, "({}; unroll {})", parts.join(", "), self.max_unroll)
    }
}
