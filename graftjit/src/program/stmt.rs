use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::expr::{int, BinOp, Expr};

/// Identifier of a control-flow region, unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RegionId(pub u32);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region{}", self.0)
    }
}

/// Kind of a control-flow region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    If,
    For,
    While,
    Straight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        target: String,
        value: Expr,
    },
    AugAssign {
        target: String,
        op: BinOp,
        value: Expr,
    },
    If {
        region: RegionId,
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    /// `for var in range(start, end, step)`.
    For {
        region: RegionId,
        var: Option<String>,
        start: Expr,
        end: Expr,
        step: Expr,
        body: Vec<Stmt>,
    },
    While {
        region: RegionId,
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Vec<Expr>),
    Raise(String),
}

impl Stmt {
    pub fn assign(target: impl Into<String>, value: impl Into<Expr>) -> Self {
        Stmt::Assign {
            target: target.into(),
            value: value.into(),
        }
    }

    pub fn aug_assign(target: impl Into<String>, op: BinOp, value: impl Into<Expr>) -> Self {
        Stmt::AugAssign {
            target: target.into(),
            op,
            value: value.into(),
        }
    }

    pub fn if_(cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Stmt::If {
            region: RegionId::default(),
            cond,
            then_body,
            else_body,
        }
    }

    /// `for var in range(end)`.
    pub fn for_range(var: Option<&str>, end: impl Into<Expr>, body: Vec<Stmt>) -> Self {
        Self::for_range_step(var, int(0), end, int(1), body)
    }

    pub fn for_range_step(
        var: Option<&str>,
        start: impl Into<Expr>,
        end: impl Into<Expr>,
        step: impl Into<Expr>,
        body: Vec<Stmt>,
    ) -> Self {
        Stmt::For {
            region: RegionId::default(),
            var: var.map(str::to_string),
            start: start.into(),
            end: end.into(),
            step: step.into(),
            body,
        }
    }

    pub fn while_(cond: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            region: RegionId::default(),
            cond,
            body,
        }
    }

    pub fn ret(values: Vec<Expr>) -> Self {
        Stmt::Return(values)
    }

    pub fn raise(message: impl Into<String>) -> Self {
        Stmt::Raise(message.into())
    }

    pub fn region(&self) -> Option<RegionId> {
        match self {
            Stmt::If { region, .. } | Stmt::For { region, .. } | Stmt::While { region, .. } => {
                Some(*region)
            }
            _ => None,
        }
    }

    pub fn region_kind(&self) -> RegionKind {
        match self {
            Stmt::If { .. } => RegionKind::If,
            Stmt::For { .. } => RegionKind::For,
            Stmt::While { .. } => RegionKind::While,
            _ => RegionKind::Straight,
        }
    }

    /// True if a `return` appears anywhere in this statement.
    pub fn contains_return(&self) -> bool {
        match self {
            Stmt::Return(_) => true,
            Stmt::If {
                then_body,
                else_body,
                ..
            } => then_body.iter().chain(else_body).any(Stmt::contains_return),
            Stmt::For { body, .. } | Stmt::While { body, .. } => body.iter().any(Stmt::contains_return),
            _ => false,
        }
    }
}

pub(super) fn number_regions(body: &mut [Stmt], next: &mut u32) {
    for stmt in body {
        match stmt {
            Stmt::If {
                region,
                then_body,
                else_body,
                ..
            } => {
                *region = RegionId(*next);
                *next += 1;
                number_regions(then_body, next);
                number_regions(else_body, next);
            }
            Stmt::For { region, body, .. } | Stmt::While { region, body, .. } => {
                *region = RegionId(*next);
                *next += 1;
                number_regions(body, next);
            }
            _ => {}
        }
    }
}

/// Names syntactically assigned in a block, loop variables included.
pub fn assigned_names(body: &[Stmt]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_assigned(body, &mut out);
    out
}

fn collect_assigned(body: &[Stmt], out: &mut BTreeSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Assign { target, .. } | Stmt::AugAssign { target, .. } => {
                out.insert(target.clone());
            }
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                collect_assigned(then_body, out);
                collect_assigned(else_body, out);
            }
            Stmt::For { var, body, .. } => {
                if let Some(var) = var {
                    out.insert(var.clone());
                }
                collect_assigned(body, out);
            }
            Stmt::While { body, .. } => collect_assigned(body, out),
            Stmt::Return(_) | Stmt::Raise(_) => {}
        }
    }
}

/// Names read anywhere in a block.
pub fn read_names(body: &[Stmt]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_read(body, &mut out);
    out
}

fn collect_read(body: &[Stmt], out: &mut BTreeSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Assign { value, .. } => value.collect_vars(out),
            Stmt::AugAssign { target, value, .. } => {
                out.insert(target.clone());
                value.collect_vars(out);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                cond.collect_vars(out);
                collect_read(then_body, out);
                collect_read(else_body, out);
            }
            Stmt::For {
                start,
                end,
                step,
                body,
                ..
            } => {
                start.collect_vars(out);
                end.collect_vars(out);
                step.collect_vars(out);
                collect_read(body, out);
            }
            Stmt::While { cond, body, .. } => {
                cond.collect_vars(out);
                collect_read(body, out);
            }
            Stmt::Return(values) => {
                for value in values {
                    value.collect_vars(out);
                }
            }
            Stmt::Raise(_) => {}
        }
    }
}
