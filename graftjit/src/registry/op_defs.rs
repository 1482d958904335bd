use crate::graph::OpKind;

use super::{OpAttrDef, AXIS_ATTR, DTYPE_ATTR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDef {
    pub name: &'static str,
    pub inputs: usize,
    pub outputs: usize,
    pub attrs: &'static [OpAttrDef],
    pub supports_broadcast: bool,
}

impl OpDef {
    pub const fn new(name: &'static str, inputs: usize, outputs: usize) -> Self {
        Self {
            name,
            inputs,
            outputs,
            attrs: &[],
            supports_broadcast: false,
        }
    }

    pub const fn with_attrs(mut self, attrs: &'static [OpAttrDef]) -> Self {
        self.attrs = attrs;
        self
    }

    pub const fn broadcasting(mut self) -> Self {
        self.supports_broadcast = true;
        self
    }
}

pub const OPS: &[OpDef] = &[
    OpDef::new("add", 2, 1).broadcasting(),
    OpDef::new("sub", 2, 1).broadcasting(),
    OpDef::new("mul", 2, 1).broadcasting(),
    OpDef::new("div", 2, 1).broadcasting(),
    OpDef::new("neg", 1, 1),
    OpDef::new("eq", 2, 1).broadcasting(),
    OpDef::new("ne", 2, 1).broadcasting(),
    OpDef::new("lt", 2, 1).broadcasting(),
    OpDef::new("le", 2, 1).broadcasting(),
    OpDef::new("gt", 2, 1).broadcasting(),
    OpDef::new("ge", 2, 1).broadcasting(),
    OpDef::new("logical_and", 2, 1).broadcasting(),
    OpDef::new("logical_or", 2, 1).broadcasting(),
    OpDef::new("logical_not", 1, 1),
    OpDef::new("select", 3, 1).broadcasting(),
    OpDef::new("matmul", 2, 1),
    OpDef::new("bias_add", 2, 1),
    OpDef::new("gather", 2, 1).with_attrs(&[AXIS_ATTR]),
    OpDef::new("cast", 1, 1).with_attrs(&[DTYPE_ATTR]),
];

/// Definition of a built-in operator.
pub fn op_def(op: &OpKind) -> Option<&'static OpDef> {
    OPS.iter().find(|def| def.name == op.as_str() && !matches!(op, OpKind::Custom(_)))
}
