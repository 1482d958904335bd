//! JSON form of a trace graph.
//!
//! Graphs are wrapped in a small envelope carrying a format tag and
//! version. Loading checks both and validates the graph before handing it
//! back, so a deserialized graph is always safe to replay.
use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::{validate_graph, TraceGraph};

const FORMAT: &str = "graftjit.trace";
const VERSION: u64 = 1;

pub struct GraphSerialize;

impl GraphSerialize {
    pub fn json(graph: &TraceGraph) -> Result<Value> {
        Ok(json!({
            "format": FORMAT,
            "version": VERSION,
            "graph": serde_json::to_value(graph)?,
        }))
    }
}

pub struct GraphDeserialize;

impl GraphDeserialize {
    pub fn from_json(mut value: Value) -> Result<TraceGraph> {
        match value.get("format").and_then(Value::as_str) {
            Some(FORMAT) => {}
            other => return Err(anyhow!("not a trace graph (format {:?})", other)),
        }
        match value.get("version").and_then(Value::as_u64) {
            Some(VERSION) => {}
            other => return Err(anyhow!("unsupported trace graph version {:?}", other)),
        }
        let graph = value
            .get_mut("graph")
            .map(Value::take)
            .ok_or_else(|| anyhow!("trace graph envelope has no `graph`"))?;
        let graph: TraceGraph = serde_json::from_value(graph)?;
        validate_graph(&graph)?;
        Ok(graph)
    }
}
