mod broadcast;
mod compare;
mod elementwise;
mod gather;
mod linalg;
mod logical;
mod wide;

use std::sync::Arc;

use crate::graph::OpKind;
use crate::registry::KernelFn;

/// Reference kernel for a built-in operator.
pub(crate) fn builtin_kernel(op: &OpKind) -> Option<KernelFn> {
    let kernel: KernelFn = match op {
        OpKind::Add | OpKind::Sub | OpKind::Mul | OpKind::Div => Arc::new(elementwise::arithmetic),
        OpKind::Neg => Arc::new(elementwise::neg),
        OpKind::Cast => Arc::new(elementwise::cast),
        OpKind::Eq | OpKind::Ne | OpKind::Lt | OpKind::Le | OpKind::Gt | OpKind::Ge => {
            Arc::new(compare::compare)
        }
        OpKind::LogicalAnd | OpKind::LogicalOr | OpKind::LogicalNot => Arc::new(logical::logical),
        OpKind::Select => Arc::new(logical::select),
        OpKind::Matmul => Arc::new(linalg::matmul),
        OpKind::BiasAdd => Arc::new(linalg::bias_add),
        OpKind::Gather => Arc::new(gather::gather),
        OpKind::Custom(_) => return None,
    };
    Some(kernel)
}
