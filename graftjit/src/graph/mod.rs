mod node;
mod serialize;
mod types;
mod validation;

pub use node::{describe_node, render_graph};
pub use serialize::{GraphDeserialize, GraphSerialize};
pub use types::{
    AttrValue, FallbackHole, GraphOutputs, NodeKind, OpAttr, OpAttrs, OpKind, OutputGuard,
    TraceGraph, TraceNode, ValueRef,
};
pub use validation::validate_graph;
