use std::fmt;
use std::time::Duration;

use serde::ser::{SerializeStruct, Serializer};
use uuid::Uuid;

/// Kind of trace event emitted while replaying a compiled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TraceEventKind {
    Const,
    OpExecute,
    Cond,
    Fallback,
    Return,
}

impl fmt::Display for TraceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEventKind::Const => write!(f, "Const"),
            TraceEventKind::OpExecute => write!(f, "OpExecute"),
            TraceEventKind::Cond => write!(f, "Cond"),
            TraceEventKind::Fallback => write!(f, "Fallback"),
            TraceEventKind::Return => write!(f, "Return"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceTiming {
    pub micros: String,
    pub micros_parts: [u64; 3],
}

pub(crate) fn format_trace_timing(duration: Duration) -> TraceTiming {
    let total_ns = duration.as_nanos();
    let ms = (total_ns / 1_000_000) as u64;
    let us = ((total_ns / 1_000) % 1_000) as u64;
    let ns = (total_ns % 1_000) as u64;
    TraceTiming {
        micros: format!("{ms}ms {us}us {ns}ns"),
        micros_parts: [ms, us, ns],
    }
}

/// Execution record for a single replayed node.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub kind: TraceEventKind,
    pub node_index: usize,
    pub node_uuid: Uuid,
    /// `graph` for top-level nodes, `cond%N.then` or `cond%N.else` inside bodies.
    pub scope: String,
    pub node_desc: String,
    pub op_name: String,
    pub params: Vec<String>,
    pub output: Vec<String>,
    pub micros: String,
    pub micros_parts: [u64; 3],
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] #{} {} -- {}", self.scope, self.node_index, self.kind, self.node_desc)?;
        if !self.micros.is_empty() {
            write!(f, " ({})", self.micros)?;
        }
        Ok(())
    }
}

impl serde::Serialize for TraceEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("TraceEvent", 8)?;
        state.serialize_field("scope", &self.scope)?;
        state.serialize_field("node_index", &self.node_index)?;
        state.serialize_field("node_uuid", &self.node_uuid)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("op_name", &self.op_name)?;
        state.serialize_field("params", &self.params)?;
        state.serialize_field("output", &self.output)?;
        state.serialize_field("micros", &self.micros_parts)?;
        state.end()
    }
}
