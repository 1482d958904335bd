//! Per-trace recording state.
//!
//! The recorder holds a stack of scopes. Graph scopes collect trace nodes:
//! the root graph, and each body of a conditional while it is being traced.
//! Interpreted scopes collect the operators the fallback interpreter runs;
//! a nested interpreted scope folds into its parent when it closes.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TraceError;
use crate::graph::{GraphOutputs, NodeKind, OpKind, TraceGraph, TraceNode, ValueRef};
use crate::program::RegionId;
use crate::tensor::TensorSig;
use crate::types::Value;

/// One entry in a fallback region's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Recorded {
    Invoke {
        op: OpKind,
        inputs: Vec<TensorSig>,
        outputs: Vec<TensorSig>,
    },
    Region {
        region: RegionId,
        entries: Vec<Recorded>,
    },
}

impl Recorded {
    /// Operator invocations in this entry, nested regions included.
    pub fn invocation_count(&self) -> usize {
        match self {
            Recorded::Invoke { .. } => 1,
            Recorded::Region { entries, .. } => entries.iter().map(Recorded::invocation_count).sum(),
        }
    }
}

#[derive(Debug)]
enum Scope {
    Graph {
        nodes: Vec<TraceNode>,
        shadow: bool,
    },
    Interpreted {
        region: Option<RegionId>,
        entries: Vec<Recorded>,
    },
}

#[derive(Debug)]
pub struct TraceRecorder {
    next_index: usize,
    scopes: Vec<Scope>,
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self {
            next_index: 0,
            scopes: vec![Scope::Graph {
                nodes: Vec::new(),
                shadow: false,
            }],
        }
    }

    /// True while tracing a conditional body that will not run on this call.
    pub fn is_shadow(&self) -> bool {
        self.scopes.iter().rev().any(|scope| matches!(scope, Scope::Graph { shadow: true, .. }))
    }

    /// Append a node to the innermost graph scope.
    pub fn push(&mut self, kind: NodeKind) -> Result<usize, TraceError> {
        let index = self.next_index;
        match self.scopes.last_mut() {
            Some(Scope::Graph { nodes, .. }) => {
                nodes.push(TraceNode {
                    index,
                    uuid: Uuid::new_v4(),
                    kind,
                });
                self.next_index += 1;
                Ok(index)
            }
            _ => Err(TraceError::Internal(
                "graph node recorded inside an interpreted scope".to_string(),
            )),
        }
    }

    pub fn constant(&mut self, value: Value) -> Result<ValueRef, TraceError> {
        let node = self.push(NodeKind::Const { value })?;
        Ok(ValueRef::Node { node, output: 0 })
    }

    pub fn open_body(&mut self, shadow: bool) {
        self.scopes.push(Scope::Graph {
            nodes: Vec::new(),
            shadow,
        });
    }

    pub fn close_body(&mut self) -> Result<Vec<TraceNode>, TraceError> {
        if self.scopes.len() < 2 {
            return Err(TraceError::Internal("closing the root graph scope".to_string()));
        }
        match self.scopes.pop() {
            Some(Scope::Graph { nodes, .. }) => Ok(nodes),
            _ => Err(TraceError::Internal("body scope is not a graph scope".to_string())),
        }
    }

    pub fn open_interpreted(&mut self, region: Option<RegionId>) {
        self.scopes.push(Scope::Interpreted {
            region,
            entries: Vec::new(),
        });
    }

    /// Close a nested interpreted region and fold it into its parent.
    pub fn close_region(&mut self) -> Result<(), TraceError> {
        let (region, entries) = match self.scopes.pop() {
            Some(Scope::Interpreted {
                region: Some(region),
                entries,
            }) => (region, entries),
            _ => return Err(TraceError::Internal("no open interpreted region".to_string())),
        };
        match self.scopes.last_mut() {
            Some(Scope::Interpreted { entries: parent, .. }) => {
                parent.push(Recorded::Region { region, entries });
                Ok(())
            }
            _ => Err(TraceError::Internal(
                "interpreted region has no interpreted parent".to_string(),
            )),
        }
    }

    /// Close the interpreted scope of a fallback node and hand back its log.
    pub fn close_fallback(&mut self) -> Result<Vec<Recorded>, TraceError> {
        match self.scopes.pop() {
            Some(Scope::Interpreted { entries, .. }) => Ok(entries),
            _ => Err(TraceError::Internal("no open fallback scope".to_string())),
        }
    }

    pub fn log_invocation(&mut self, op: &OpKind, inputs: Vec<TensorSig>, outputs: Vec<TensorSig>) {
        if let Some(Scope::Interpreted { entries, .. }) = self.scopes.last_mut() {
            entries.push(Recorded::Invoke {
                op: op.clone(),
                inputs,
                outputs,
            });
        }
    }

    pub fn finish(mut self, inputs: usize, outputs: GraphOutputs) -> Result<TraceGraph, TraceError> {
        if self.scopes.len() != 1 {
            return Err(TraceError::Internal(format!(
                "{} scopes still open at the end of the trace",
                self.scopes.len() - 1
            )));
        }
        match self.scopes.pop() {
            Some(Scope::Graph { nodes, .. }) => Ok(TraceGraph {
                inputs,
                nodes,
                outputs,
                next_index: self.next_index,
            }),
            _ => Err(TraceError::Internal("root scope is not a graph".to_string())),
        }
    }
}
