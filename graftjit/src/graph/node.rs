use super::{GraphOutputs, NodeKind, TraceGraph, TraceNode, ValueRef};

pub fn describe_node(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Const { value } => format!("const {}", value),
        NodeKind::Op { op, inputs, .. } => format!("op {}({})", op, join_refs(inputs)),
        NodeKind::Cond {
            region,
            pred,
            then_body,
            else_body,
            ..
        } => format!(
            "cond {} on {} (then {} nodes, else {} nodes)",
            region,
            pred,
            then_body.len(),
            else_body.len()
        ),
        NodeKind::Fallback(hole) => {
            let inputs = hole.inputs.keys().cloned().collect::<Vec<_>>().join(",");
            let tail = if hole.tail { " tail" } else { "" };
            let head = match hole.region {
                Some(region) => region.to_string(),
                None => format!("stmt{}", hole.first_stmt),
            };
            format!(
                "fallback{} {} ({}) >> {}",
                tail,
                head,
                inputs,
                hole.outputs.join(",")
            )
        }
    }
}

/// Render the whole graph, one node per line, bodies indented.
pub fn render_graph(graph: &TraceGraph) -> String {
    let mut out = String::new();
    render_nodes(&graph.nodes, 0, &mut out);
    match &graph.outputs {
        GraphOutputs::Values(refs) => out.push_str(&format!("return {}\n", join_refs(refs))),
        GraphOutputs::Tail { node } => out.push_str(&format!("return tail %{}\n", node)),
    }
    out
}

fn render_nodes(nodes: &[TraceNode], depth: usize, out: &mut String) {
    for node in nodes {
        if let NodeKind::Cond {
            then_body,
            else_body,
            ..
        } = &node.kind
        {
            render_nodes(then_body, depth + 1, out);
            render_nodes(else_body, depth + 1, out);
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("%{} = {}\n", node.index, describe_node(&node.kind)));
    }
}

fn join_refs(refs: &[ValueRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
