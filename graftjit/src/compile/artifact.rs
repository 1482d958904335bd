use serde::Serialize;

use super::signature::Signature;
use crate::classify::ClassificationReport;
use crate::error::TraceError;
use crate::graph::{validate_graph, NodeKind, TraceGraph};

/// Node counts of a compiled graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArtifactStats {
    pub nodes: usize,
    pub ops: usize,
    pub consts: usize,
    pub conds: usize,
    pub fallback_holes: usize,
    /// Operators the interpreter ran inside fallback holes while tracing.
    pub recorded_invocations: usize,
}

impl ArtifactStats {
    fn of(graph: &TraceGraph) -> Self {
        let mut stats = ArtifactStats {
            nodes: graph.node_count(),
            ..Default::default()
        };
        for node in graph.walk() {
            match &node.kind {
                NodeKind::Const { .. } => stats.consts += 1,
                NodeKind::Op { .. } => stats.ops += 1,
                NodeKind::Cond { .. } => stats.conds += 1,
                NodeKind::Fallback(hole) => {
                    stats.fallback_holes += 1;
                    stats.recorded_invocations +=
                        hole.recorded.iter().map(|entry| entry.invocation_count()).sum::<usize>();
                }
            }
        }
        stats
    }
}

/// Immutable result of one successful trace, shared between calls.
#[derive(Debug, Serialize)]
pub struct CompiledArtifact {
    key: u64,
    signature: Signature,
    graph: TraceGraph,
    report: ClassificationReport,
    stats: ArtifactStats,
}

impl CompiledArtifact {
    /// Validate the graph and seal it into an artifact.
    pub fn new(signature: Signature, graph: TraceGraph, report: ClassificationReport) -> Result<Self, TraceError> {
        validate_graph(&graph).map_err(|err| TraceError::InvalidGraph(err.to_string()))?;
        Ok(Self {
            key: signature.key(),
            stats: ArtifactStats::of(&graph),
            signature,
            graph,
            report,
        })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn graph(&self) -> &TraceGraph {
        &self.graph
    }

    pub fn report(&self) -> &ClassificationReport {
        &self.report
    }

    pub fn stats(&self) -> ArtifactStats {
        self.stats
    }

    pub fn to_json(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
