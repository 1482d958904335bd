//! Operator registry.
//!
//! Every tensor operation, whether traced into a graph or run by the
//! fallback interpreter, goes through `OpRegistry::invoke`. It checks arity
//! and attributes, infers the output signatures, runs the kernel and
//! verifies the kernel honoured the inferred signatures.
mod infer;
mod op_attrs;
mod op_defs;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::OperatorError;
use crate::graph::{OpAttrs, OpKind};
use crate::ops::cpu::builtin_kernel;
use crate::tensor::{TensorSig, TensorValue};

pub(crate) use infer::gather_axis;
pub use op_attrs::{OpAttrDef, OpAttrType, AXIS_ATTR, DTYPE_ATTR};
pub use op_defs::{op_def, OpDef, OPS};

pub type InferFn =
    Arc<dyn Fn(&OpKind, &[TensorSig], &OpAttrs) -> Result<Vec<TensorSig>, OperatorError> + Send + Sync>;
pub type KernelFn =
    Arc<dyn Fn(&OpKind, &OpAttrs, &[TensorValue]) -> Result<Vec<TensorValue>, OperatorError> + Send + Sync>;

#[derive(Clone)]
struct OpEntry {
    def: OpDef,
    infer: InferFn,
    kernel: KernelFn,
}

static SHARED: Lazy<Arc<OpRegistry>> = Lazy::new(|| Arc::new(OpRegistry::with_builtins()));

#[derive(Clone, Default)]
pub struct OpRegistry {
    entries: HashMap<OpKind, OpEntry>,
}

impl std::fmt::Debug for OpRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.entries.keys().map(OpKind::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        f.debug_struct("OpRegistry").field("ops", &names).finish()
    }
}

impl OpRegistry {
    /// Registry with no operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in operator with its reference kernel.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for op in OpKind::BUILTIN.iter() {
            let (Some(def), Some(kernel)) = (op_def(op), builtin_kernel(op)) else {
                continue;
            };
            registry.entries.insert(
                op.clone(),
                OpEntry {
                    def: *def,
                    infer: Arc::new(infer::infer_builtin),
                    kernel,
                },
            );
        }
        registry
    }

    /// Process-wide registry of built-ins.
    pub fn shared() -> Arc<OpRegistry> {
        SHARED.clone()
    }

    /// Register or replace an operator.
    pub fn register(&mut self, op: OpKind, def: OpDef, infer: InferFn, kernel: KernelFn) {
        self.entries.insert(op, OpEntry { def, infer, kernel });
    }

    pub fn contains(&self, op: &OpKind) -> bool {
        self.entries.contains_key(op)
    }

    pub fn def(&self, op: &OpKind) -> Result<&OpDef, OperatorError> {
        self.entry(op).map(|entry| &entry.def)
    }

    fn entry(&self, op: &OpKind) -> Result<&OpEntry, OperatorError> {
        self.entries
            .get(op)
            .ok_or_else(|| OperatorError::Unknown(op.to_string()))
    }

    /// Output signatures for the given input signatures.
    pub fn infer(&self, op: &OpKind, inputs: &[TensorSig], attrs: &OpAttrs) -> Result<Vec<TensorSig>, OperatorError> {
        let entry = self.entry(op)?;
        if inputs.len() != entry.def.inputs {
            return Err(OperatorError::Arity {
                op: op.to_string(),
                expected: entry.def.inputs,
                actual: inputs.len(),
            });
        }
        op_attrs::check_attrs(op, entry.def.attrs, attrs)?;
        let outputs = (entry.infer)(op, inputs, attrs)?;
        if outputs.len() != entry.def.outputs {
            return Err(OperatorError::kernel(
                op,
                format!("inferred {} outputs, declared {}", outputs.len(), entry.def.outputs),
            ));
        }
        Ok(outputs)
    }

    /// Signature-checked kernel invocation.
    pub fn invoke(&self, op: &OpKind, inputs: &[TensorValue], attrs: &OpAttrs) -> Result<Vec<TensorValue>, OperatorError> {
        let sigs = inputs.iter().map(TensorValue::sig).collect::<Vec<_>>();
        let expected = self.infer(op, &sigs, attrs)?;
        let entry = self.entry(op)?;
        let outputs = (entry.kernel)(op, attrs, inputs)?;
        if outputs.len() != expected.len() {
            return Err(OperatorError::kernel(
                op,
                format!("kernel produced {} outputs, expected {}", outputs.len(), expected.len()),
            ));
        }
        for (output, sig) in outputs.iter().zip(expected.iter()) {
            if output.sig() != *sig {
                return Err(OperatorError::kernel(
                    op,
                    format!("kernel produced {}, expected {}", output.sig(), sig),
                ));
            }
        }
        Ok(outputs)
    }
}
