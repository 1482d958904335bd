//! Compiled trace graph types.
//!
//! A trace graph is a flat list of nodes in creation order. Conditional
//! nodes own their two bodies; fallback nodes own the statements they
//! re-interpret on every call. Node indices grow monotonically across the
//! whole graph, bodies included, so an input reference always points at a
//! smaller index than the node using it.
use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::program::{RegionId, Stmt};
use crate::tensor::DType;
use crate::trace::Recorded;
use crate::types::{Value, ValueKind};

/// Attribute value attached to an operator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    IntList(Vec<i64>),
    DType(DType),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Float(_) => "float",
            AttrValue::Int(_) => "int",
            AttrValue::Bool(_) => "bool",
            AttrValue::Str(_) => "str",
            AttrValue::IntList(_) => "int_list",
            AttrValue::DType(_) => "dtype",
        }
    }
}

/// Named attribute for an op invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpAttr {
    pub name: String,
    pub value: AttrValue,
}

/// Collection of op attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpAttrs {
    pub items: Vec<OpAttr>,
}

impl OpAttrs {
    /// Build an empty attribute set.
    pub fn none() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.items.push(OpAttr {
            name: name.into(),
            value,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.items
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }
}

/// Operator identity. The built-in set has reference kernels; `Custom`
/// names an operator registered by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Select,
    Matmul,
    BiasAdd,
    Gather,
    Cast,
    Custom(String),
}

impl OpKind {
    pub const BUILTIN: [OpKind; 19] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Div,
        OpKind::Neg,
        OpKind::Eq,
        OpKind::Ne,
        OpKind::Lt,
        OpKind::Le,
        OpKind::Gt,
        OpKind::Ge,
        OpKind::LogicalAnd,
        OpKind::LogicalOr,
        OpKind::LogicalNot,
        OpKind::Select,
        OpKind::Matmul,
        OpKind::BiasAdd,
        OpKind::Gather,
        OpKind::Cast,
    ];

    /// String identifier for the op kind.
    pub fn as_str(&self) -> &str {
        match self {
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Div => "div",
            OpKind::Neg => "neg",
            OpKind::Eq => "eq",
            OpKind::Ne => "ne",
            OpKind::Lt => "lt",
            OpKind::Le => "le",
            OpKind::Gt => "gt",
            OpKind::Ge => "ge",
            OpKind::LogicalAnd => "logical_and",
            OpKind::LogicalOr => "logical_or",
            OpKind::LogicalNot => "logical_not",
            OpKind::Select => "select",
            OpKind::Matmul => "matmul",
            OpKind::BiasAdd => "bias_add",
            OpKind::Gather => "gather",
            OpKind::Cast => "cast",
            OpKind::Custom(name) => name,
        }
    }

    pub fn custom(name: impl Into<String>) -> Self {
        OpKind::Custom(name.into())
    }

    /// Parse a built-in op kind from its string name.
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse()
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OpKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        OpKind::BUILTIN
            .iter()
            .find(|op| op.as_str() == value)
            .cloned()
            .ok_or_else(|| anyhow!("unsupported op {}", value))
    }
}

/// Reference to a value produced inside a trace graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueRef {
    /// Positional function input.
    Input(usize),
    /// Output `output` of node `node`.
    Node { node: usize, output: usize },
}

impl std::fmt::Display for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueRef::Input(index) => write!(f, "%in{}", index),
            ValueRef::Node { node, output: 0 } => write!(f, "%{}", node),
            ValueRef::Node { node, output } => write!(f, "%{}.{}", node, output),
        }
    }
}

/// Expected kind of a fallback output, checked on every replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputGuard {
    Bound(ValueKind),
    Unbound,
}

/// A region executed by the interpreter on every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackHole {
    /// Control-flow region at the head of the hole, if any.
    pub region: Option<RegionId>,
    /// Top-level statement index where the hole starts.
    pub first_stmt: usize,
    pub statements: Vec<Stmt>,
    /// Names read by the hole, with the graph values feeding them.
    pub inputs: BTreeMap<String, ValueRef>,
    /// Names the hole may rebind, in output order.
    pub outputs: Vec<String>,
    pub guards: Vec<OutputGuard>,
    /// True when the hole runs to the end of the function and produces
    /// its return values.
    pub tail: bool,
    /// Operators the interpreter ran while tracing this hole.
    pub recorded: Vec<Recorded>,
}

/// Node variants that make up a trace graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    Const {
        value: Value,
    },
    Op {
        op: OpKind,
        attrs: OpAttrs,
        inputs: Vec<ValueRef>,
        outputs: usize,
    },
    Cond {
        region: RegionId,
        pred: ValueRef,
        then_body: Vec<TraceNode>,
        else_body: Vec<TraceNode>,
        then_outputs: Vec<ValueRef>,
        else_outputs: Vec<ValueRef>,
    },
    Fallback(FallbackHole),
}

impl NodeKind {
    pub fn output_count(&self) -> usize {
        match self {
            NodeKind::Const { .. } => 1,
            NodeKind::Op { outputs, .. } => *outputs,
            NodeKind::Cond { then_outputs, .. } => then_outputs.len(),
            NodeKind::Fallback(hole) => hole.outputs.len(),
        }
    }
}

/// A graph node with index and kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceNode {
    pub index: usize,
    pub uuid: Uuid,
    pub kind: NodeKind,
}

/// Where the compiled function's results come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphOutputs {
    Values(Vec<ValueRef>),
    /// Results are whatever the tail fallback node returns.
    Tail { node: usize },
}

/// A complete compiled trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceGraph {
    pub inputs: usize,
    pub nodes: Vec<TraceNode>,
    pub outputs: GraphOutputs,
    pub(crate) next_index: usize,
}

impl TraceGraph {
    /// Total nodes including conditional bodies.
    pub fn node_count(&self) -> usize {
        self.next_index
    }

    /// Depth-first walk over every node, bodies included.
    pub fn walk(&self) -> Vec<&TraceNode> {
        let mut out = Vec::with_capacity(self.next_index);
        walk_nodes(&self.nodes, &mut out);
        out
    }

    pub fn fallback_nodes(&self) -> Vec<&FallbackHole> {
        self.walk()
            .into_iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Fallback(hole) => Some(hole),
                _ => None,
            })
            .collect()
    }

    /// Count of operator nodes with the given kind.
    pub fn count_ops(&self, op: &OpKind) -> usize {
        self.walk()
            .into_iter()
            .filter(|node| matches!(&node.kind, NodeKind::Op { op: kind, .. } if kind == op))
            .count()
    }

    pub fn count_consts(&self) -> usize {
        self.walk()
            .into_iter()
            .filter(|node| matches!(node.kind, NodeKind::Const { .. }))
            .count()
    }
}

fn walk_nodes<'a>(nodes: &'a [TraceNode], out: &mut Vec<&'a TraceNode>) {
    for node in nodes {
        if let NodeKind::Cond {
            then_body,
            else_body,
            ..
        } = &node.kind
        {
            walk_nodes(then_body, out);
            walk_nodes(else_body, out);
        }
        out.push(node);
    }
}
