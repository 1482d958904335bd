//! Error taxonomy.
//!
//! `EngineError` is what callers see. `OperatorError` comes from a single
//! kernel or shape check and is wrapped with the failing operator's name.
//! Classification and signature failures are internal: the engine recovers
//! from them and they never reach callers.
use thiserror::Error;

use crate::graph::OpKind;
use crate::tensor::DType;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperatorError {
    #[error("operator `{0}` is not registered")]
    Unknown(String),
    #[error("`{op}` expects {expected} inputs, got {actual}")]
    Arity {
        op: String,
        expected: usize,
        actual: usize,
    },
    #[error("`{op}` operands disagree on dtype: {lhs} vs {rhs}")]
    DTypeMismatch { op: String, lhs: DType, rhs: DType },
    #[error("`{op}` does not support dtype {dtype}")]
    UnsupportedDType { op: String, dtype: DType },
    #[error("`{op}` got incompatible shapes {lhs:?} and {rhs:?}")]
    ShapeMismatch {
        op: String,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
    #[error("`{op}` attribute `{name}`: {reason}")]
    Attr {
        op: String,
        name: String,
        reason: String,
    },
    #[error("`{op}`: {reason}")]
    Kernel { op: String, reason: String },
}

impl OperatorError {
    pub(crate) fn kernel(op: &OpKind, reason: impl Into<String>) -> Self {
        OperatorError::Kernel {
            op: op.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure while tracing or replaying a function body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error("operator `{op}` failed: {source}")]
    Operator {
        op: String,
        #[source]
        source: OperatorError,
    },
    #[error("name `{0}` is not bound")]
    Unbound(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("raised: {0}")]
    Raised(String),
    #[error("function `{name}` takes {expected} inputs, got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("invalid compiled graph: {0}")]
    InvalidGraph(String),
    #[error("inconsistent trace state: {0}")]
    Internal(String),
}

impl TraceError {
    pub(crate) fn operator(op: &OpKind, source: OperatorError) -> Self {
        TraceError::Operator {
            op: op.to_string(),
            source,
        }
    }

    pub(crate) fn type_error(reason: impl Into<String>) -> Self {
        TraceError::Type(reason.into())
    }
}

/// Invalid engine or optimizer configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Public error returned by engine entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("parameter `{name}`: {reason}")]
    Parameter { name: String, reason: String },
}

/// Raised when a cached artifact's full signature disagrees with the
/// current call, or a fallback region produced values of a different kind
/// than the ones the artifact was traced with.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("signature mismatch: {0}")]
pub(crate) struct SignatureMismatch(pub String);
