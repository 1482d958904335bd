mod classify;
mod compile;
mod config;
mod engine;
mod error;
mod executor;
mod formatting;
mod graph;
mod interp;
#[doc(hidden)]
pub mod logging;
mod macros;
mod ops;
mod optim;
pub mod program;
mod registry;
mod tensor;
mod trace;
mod types;

pub use classify::{Classification, ClassificationReport, RegionClass, RegionState, StmtPlan};
pub use compile::{ArtifactStats, CompiledArtifact, HostSig, InputSig, Signature};
pub use config::{ExecConfig, ExecMode};
pub use engine::{compile_and_run, Engine, JitFunction};
pub use error::{ConfigError, EngineError, OperatorError, TraceError};
pub use formatting::{format_truncated, FormatValue};
pub use graph::{
    describe_node, render_graph, validate_graph, AttrValue, FallbackHole, GraphDeserialize, GraphOutputs,
    GraphSerialize, NodeKind, OpAttr, OpAttrs, OpKind, OutputGuard, TraceGraph, TraceNode, ValueRef,
};
pub use interp::{Env, Flow, Interpreter};
pub use optim::{apply_update, AdamConfig, LazyAdamConfig, OptimizerConfig, Parameter, ParameterUpdate};
pub use registry::{op_def, InferFn, KernelFn, OpAttrDef, OpAttrType, OpDef, OpRegistry, AXIS_ATTR, DTYPE_ATTR, OPS};
pub use tensor::{DType, Tensor, TensorElement, TensorOptions, TensorSig, TensorValue, F16};
pub use trace::{Recorded, TraceEvent, TraceEventKind, TraceRecorder, TraceTiming};
pub use types::{Value, ValueKind};
