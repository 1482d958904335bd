use crate::error::OperatorError;
use crate::graph::{AttrValue, OpAttrs, OpKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpAttrType {
    Int,
    Float,
    Bool,
    Str,
    IntList,
    DType,
}

impl OpAttrType {
    fn accepts(self, value: &AttrValue) -> bool {
        matches!(
            (self, value),
            (OpAttrType::Int, AttrValue::Int(_))
                | (OpAttrType::Float, AttrValue::Float(_))
                | (OpAttrType::Float, AttrValue::Int(_))
                | (OpAttrType::Bool, AttrValue::Bool(_))
                | (OpAttrType::Str, AttrValue::Str(_))
                | (OpAttrType::IntList, AttrValue::IntList(_))
                | (OpAttrType::DType, AttrValue::DType(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpAttrDef {
    pub name: &'static str,
    pub kind: OpAttrType,
    pub required: bool,
}

impl OpAttrDef {
    pub const fn optional(name: &'static str, kind: OpAttrType) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    pub const fn required(name: &'static str, kind: OpAttrType) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }
}

pub const AXIS_ATTR: OpAttrDef = OpAttrDef::optional("axis", OpAttrType::Int);
pub const DTYPE_ATTR: OpAttrDef = OpAttrDef::required("dtype", OpAttrType::DType);

/// Reject unknown, missing or mistyped attributes.
pub(crate) fn check_attrs(op: &OpKind, defs: &[OpAttrDef], attrs: &OpAttrs) -> Result<(), OperatorError> {
    for attr in &attrs.items {
        let def = defs
            .iter()
            .find(|def| def.name == attr.name)
            .ok_or_else(|| OperatorError::Attr {
                op: op.to_string(),
                name: attr.name.clone(),
                reason: "unknown attribute".to_string(),
            })?;
        if !def.kind.accepts(&attr.value) {
            return Err(OperatorError::Attr {
                op: op.to_string(),
                name: attr.name.clone(),
                reason: format!("expected {:?}, got {}", def.kind, attr.value.type_name()),
            });
        }
    }
    for def in defs.iter().filter(|def| def.required) {
        if attrs.get(def.name).is_none() {
            return Err(OperatorError::Attr {
                op: op.to_string(),
                name: def.name.to_string(),
                reason: "missing required attribute".to_string(),
            });
        }
    }
    Ok(())
}
