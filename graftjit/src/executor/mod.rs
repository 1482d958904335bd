//! Replay of compiled trace graphs.
//!
//! Graph nodes run in recorded order through the registry. A `Cond` node
//! evaluates its predicate and runs only the taken body. A fallback node
//! runs a fresh interpreter over its statements and checks that what they
//! produced still matches the kinds the graph was traced with.
use std::collections::HashMap;
use std::time::Instant;

use crate::error::{SignatureMismatch, TraceError};
use crate::graph::{describe_node, FallbackHole, GraphOutputs, NodeKind, OutputGuard, TraceGraph, TraceNode, ValueRef};
use crate::interp::{tensor_to_bool, truthy, Flow, Interpreter};
use crate::registry::OpRegistry;
use crate::tensor::TensorValue;
use crate::trace::{format_trace_timing, TraceEvent, TraceEventKind};
use crate::types::Value;

/// Why a replay stopped.
#[derive(Debug)]
pub(crate) enum ReplayError {
    Trace(TraceError),
    /// The artifact no longer describes this call; retrace.
    Mismatch(SignatureMismatch),
}

impl From<TraceError> for ReplayError {
    fn from(value: TraceError) -> Self {
        ReplayError::Trace(value)
    }
}

impl From<SignatureMismatch> for ReplayError {
    fn from(value: SignatureMismatch) -> Self {
        ReplayError::Mismatch(value)
    }
}

pub struct Executor<'a> {
    registry: &'a OpRegistry,
    trace_enabled: bool,
    timer_enabled: bool,
    events: Vec<TraceEvent>,
    values: HashMap<ValueRef, Value>,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a OpRegistry) -> Self {
        Self {
            registry,
            trace_enabled: false,
            timer_enabled: false,
            events: Vec::new(),
            values: HashMap::new(),
        }
    }

    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn with_timer(mut self) -> Self {
        self.timer_enabled = true;
        self
    }

    /// Events of the last replay, empty unless tracing is enabled.
    pub fn trace(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_trace(self) -> Vec<TraceEvent> {
        self.events
    }

    pub(crate) fn run(&mut self, graph: &TraceGraph, inputs: &[Value]) -> Result<Vec<Value>, ReplayError> {
        if inputs.len() != graph.inputs {
            return Err(ReplayError::Trace(TraceError::InvalidGraph(format!(
                "graph takes {} inputs, got {}",
                graph.inputs,
                inputs.len()
            ))));
        }
        self.events.clear();
        self.values.clear();
        for (index, value) in inputs.iter().enumerate() {
            self.values.insert(ValueRef::Input(index), value.clone());
        }
        let tail = self.exec_nodes(&graph.nodes, "graph")?;
        let outputs = match (&graph.outputs, tail) {
            (GraphOutputs::Values(refs), _) => refs
                .iter()
                .map(|value_ref| self.resolve(value_ref))
                .collect::<Result<Vec<_>, _>>()?,
            (GraphOutputs::Tail { .. }, Some(values)) => values,
            (GraphOutputs::Tail { node }, None) => {
                return Err(ReplayError::Trace(TraceError::InvalidGraph(format!(
                    "tail node %{} did not run",
                    node
                ))))
            }
        };
        if self.trace_enabled {
            self.events.push(TraceEvent {
                kind: TraceEventKind::Return,
                node_index: graph.node_count(),
                node_uuid: uuid::Uuid::nil(),
                scope: "graph".to_string(),
                node_desc: format!("return {} values", outputs.len()),
                op_name: String::new(),
                params: Vec::new(),
                output: outputs.iter().map(ToString::to_string).collect(),
                micros: String::new(),
                micros_parts: [0; 3],
            });
        }
        Ok(outputs)
    }

    /// Run a node list. Returns the tail fallback's results if one ran.
    fn exec_nodes(&mut self, nodes: &[TraceNode], scope: &str) -> Result<Option<Vec<Value>>, ReplayError> {
        for node in nodes {
            let start = self.timer_enabled.then(Instant::now);
            let (kind, tail) = match &node.kind {
                NodeKind::Const { value } => {
                    self.values.insert(output_ref(node.index, 0), value.clone());
                    (TraceEventKind::Const, None)
                }
                NodeKind::Op { op, attrs, inputs, .. } => {
                    let tensors = inputs
                        .iter()
                        .map(|value_ref| self.resolve_tensor(value_ref))
                        .collect::<Result<Vec<_>, _>>()?;
                    let outputs = self
                        .registry
                        .invoke(op, &tensors, attrs)
                        .map_err(|err| TraceError::operator(op, err))?;
                    for (output, tensor) in outputs.into_iter().enumerate() {
                        self.values.insert(output_ref(node.index, output), Value::Tensor(tensor));
                    }
                    (TraceEventKind::OpExecute, None)
                }
                NodeKind::Cond {
                    pred,
                    then_body,
                    else_body,
                    then_outputs,
                    else_outputs,
                    ..
                } => {
                    let taken = match self.resolve(pred)? {
                        Value::Tensor(tensor) => tensor_to_bool(&tensor)?,
                        other => truthy(&other)?,
                    };
                    let (body, outputs, branch) = if taken {
                        (then_body, then_outputs, "then")
                    } else {
                        (else_body, else_outputs, "else")
                    };
                    let inner = format!("cond%{}.{}", node.index, branch);
                    self.exec_nodes(body, &inner)?;
                    for (output, value_ref) in outputs.iter().enumerate() {
                        let value = self.resolve(value_ref)?;
                        self.values.insert(output_ref(node.index, output), value);
                    }
                    (TraceEventKind::Cond, None)
                }
                NodeKind::Fallback(hole) => (TraceEventKind::Fallback, self.exec_fallback(node.index, hole)?),
            };
            if self.trace_enabled {
                self.emit(node, kind, scope, start);
            }
            if tail.is_some() {
                return Ok(tail);
            }
        }
        Ok(None)
    }

    fn exec_fallback(&mut self, index: usize, hole: &FallbackHole) -> Result<Option<Vec<Value>>, ReplayError> {
        let mut env = HashMap::with_capacity(hole.inputs.len());
        for (name, value_ref) in &hole.inputs {
            env.insert(name.clone(), self.resolve(value_ref)?);
        }
        let flow = Interpreter::new(self.registry).exec_block(&mut env, &hole.statements)?;
        if hole.tail {
            return Ok(Some(match flow {
                Flow::Return(values) => values,
                Flow::Normal => Vec::new(),
            }));
        }
        if let Flow::Return(_) = flow {
            return Err(SignatureMismatch(format!("fallback node %{} returned early", index)).into());
        }
        for (output, (name, guard)) in hole.outputs.iter().zip(&hole.guards).enumerate() {
            let value = env.remove(name);
            let actual = match &value {
                Some(value) => OutputGuard::Bound(value.kind()),
                None => OutputGuard::Unbound,
            };
            if actual != *guard {
                return Err(SignatureMismatch(format!(
                    "fallback node %{} bound `{}` to {:?}, traced as {:?}",
                    index, name, actual, guard
                ))
                .into());
            }
            if let Some(value) = value {
                self.values.insert(output_ref(index, output), value);
            }
        }
        Ok(None)
    }

    fn resolve(&self, value_ref: &ValueRef) -> Result<Value, TraceError> {
        self.values
            .get(value_ref)
            .cloned()
            .ok_or_else(|| TraceError::InvalidGraph(format!("{} has no value", value_ref)))
    }

    fn resolve_tensor(&self, value_ref: &ValueRef) -> Result<TensorValue, TraceError> {
        match self.resolve(value_ref)? {
            Value::Tensor(tensor) => Ok(tensor),
            other => Err(TraceError::InvalidGraph(format!(
                "{} holds a {} where a tensor is expected",
                value_ref,
                other.type_name()
            ))),
        }
    }

    fn emit(&mut self, node: &TraceNode, kind: TraceEventKind, scope: &str, start: Option<Instant>) {
        let timing = start.map(|start| format_trace_timing(start.elapsed())).unwrap_or_default();
        let (op_name, params, outputs) = match &node.kind {
            NodeKind::Op { op, inputs, outputs, .. } => (
                op.to_string(),
                inputs.iter().map(ToString::to_string).collect(),
                *outputs,
            ),
            NodeKind::Cond { pred, then_outputs, .. } => ("cond".to_string(), vec![pred.to_string()], then_outputs.len()),
            NodeKind::Fallback(hole) => (
                "fallback".to_string(),
                hole.inputs.values().map(ToString::to_string).collect(),
                hole.outputs.len(),
            ),
            NodeKind::Const { .. } => ("const".to_string(), Vec::new(), 1),
        };
        let output = (0..outputs)
            .map(|output| output_ref(node.index, output).to_string())
            .collect();
        self.events.push(TraceEvent {
            kind,
            node_index: node.index,
            node_uuid: node.uuid,
            scope: scope.to_string(),
            node_desc: describe_node(&node.kind),
            op_name,
            params,
            output,
            micros: timing.micros,
            micros_parts: timing.micros_parts,
        });
    }
}

fn output_ref(node: usize, output: usize) -> ValueRef {
    ValueRef::Node { node, output }
}
