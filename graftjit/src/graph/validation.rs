//! Structural checks run on every trace graph before it is cached.
use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::{GraphOutputs, NodeKind, TraceGraph, TraceNode, ValueRef};

#[derive(Debug, Clone, Default)]
struct ValidationContext {
    /// Node index to output arity, for nodes visible in the current scope.
    visible: HashMap<usize, usize>,
    last_index: Option<usize>,
}

impl ValidationContext {
    fn check_ref(&self, graph: &TraceGraph, value: &ValueRef, user: usize) -> Result<()> {
        match *value {
            ValueRef::Input(index) => {
                if index >= graph.inputs {
                    return Err(anyhow!(
                        "node {} reads input {} but the graph has {} inputs",
                        user,
                        index,
                        graph.inputs
                    ));
                }
            }
            ValueRef::Node { node, output } => {
                if node >= user {
                    return Err(anyhow!("node {} references later node {}", user, node));
                }
                let arity = self
                    .visible
                    .get(&node)
                    .ok_or_else(|| anyhow!("node {} references node {} outside its scope", user, node))?;
                if output >= *arity {
                    return Err(anyhow!(
                        "node {} reads output {} of node {} which has {}",
                        user,
                        output,
                        node,
                        arity
                    ));
                }
            }
        }
        Ok(())
    }

    fn admit(&mut self, node: &TraceNode) -> Result<()> {
        if let Some(last) = self.last_index {
            if node.index <= last {
                return Err(anyhow!(
                    "node index {} does not follow {}",
                    node.index,
                    last
                ));
            }
        }
        self.last_index = Some(node.index);
        self.visible.insert(node.index, node.kind.output_count());
        Ok(())
    }
}

/// Validate scoping, ordering and arity of a trace graph.
pub fn validate_graph(graph: &TraceGraph) -> Result<()> {
    let mut ctx = ValidationContext::default();
    validate_nodes(graph, &graph.nodes, &mut ctx)?;
    match &graph.outputs {
        GraphOutputs::Values(refs) => {
            for value in refs {
                ctx.check_ref(graph, value, graph.next_index)?;
            }
        }
        GraphOutputs::Tail { node } => {
            let last = graph
                .nodes
                .last()
                .ok_or_else(|| anyhow!("tail output on an empty graph"))?;
            match &last.kind {
                NodeKind::Fallback(hole) if hole.tail && last.index == *node => {}
                _ => return Err(anyhow!("tail output {} is not the final fallback node", node)),
            }
        }
    }
    Ok(())
}

fn validate_nodes(graph: &TraceGraph, nodes: &[TraceNode], ctx: &mut ValidationContext) -> Result<()> {
    for (position, node) in nodes.iter().enumerate() {
        match &node.kind {
            NodeKind::Const { .. } => {}
            NodeKind::Op { inputs, outputs, .. } => {
                if *outputs == 0 {
                    return Err(anyhow!("op node {} has no outputs", node.index));
                }
                for input in inputs {
                    ctx.check_ref(graph, input, node.index)?;
                }
            }
            NodeKind::Cond {
                pred,
                then_body,
                else_body,
                then_outputs,
                else_outputs,
                ..
            } => {
                ctx.check_ref(graph, pred, node.index)?;
                if then_outputs.len() != else_outputs.len() {
                    return Err(anyhow!(
                        "cond node {} yields {} values on one path and {} on the other",
                        node.index,
                        then_outputs.len(),
                        else_outputs.len()
                    ));
                }
                for (body, outputs) in [(then_body, then_outputs), (else_body, else_outputs)] {
                    let mut inner = ctx.clone();
                    validate_nodes(graph, body, &mut inner)?;
                    for value in outputs {
                        inner.check_ref(graph, value, node.index)?;
                    }
                    ctx.last_index = inner.last_index;
                }
            }
            NodeKind::Fallback(hole) => {
                for value in hole.inputs.values() {
                    ctx.check_ref(graph, value, node.index)?;
                }
                if hole.guards.len() != hole.outputs.len() {
                    return Err(anyhow!(
                        "fallback node {} has {} guards for {} outputs",
                        node.index,
                        hole.guards.len(),
                        hole.outputs.len()
                    ));
                }
                if hole.tail && position + 1 != nodes.len() {
                    return Err(anyhow!("tail fallback node {} is not last", node.index));
                }
            }
        }
        ctx.admit(node)?;
    }
    Ok(())
}
