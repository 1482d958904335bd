use std::collections::BTreeSet;
use std::ops;

use serde::{Deserialize, Serialize};

use crate::graph::{OpAttrs, OpKind};
use crate::tensor::TensorValue;
use crate::types::Value;

/// Arithmetic operators usable on tensors and host numbers alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn op_kind(self) -> OpKind {
        match self {
            BinOp::Add => OpKind::Add,
            BinOp::Sub => OpKind::Sub,
            BinOp::Mul => OpKind::Mul,
            BinOp::Div => OpKind::Div,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// Comparison operators. On tensors they produce bool tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn op_kind(self) -> OpKind {
        match self {
            CmpOp::Eq => OpKind::Eq,
            CmpOp::Ne => OpKind::Ne,
            CmpOp::Lt => OpKind::Lt,
            CmpOp::Le => OpKind::Le,
            CmpOp::Gt => OpKind::Gt,
            CmpOp::Ge => OpKind::Ge,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Expression tree.
///
/// `And`, `Or` and `Not` follow host truthiness and short-circuit: `And`
/// yields its left operand when that is falsy, otherwise its right operand.
/// Asking a tensor for its truthiness needs its data, so these operators
/// on tensors can only run in a fallback region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Var(String),
    Lit(Value),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Explicit operator call. Yields the operator's first output.
    Call {
        op: OpKind,
        args: Vec<Expr>,
        attrs: OpAttrs,
    },
    /// Length of the leading dimension of a tensor, or of a list.
    Len(Box<Expr>),
    /// Convert a single-element tensor to a host scalar.
    Item(Box<Expr>),
    List(Vec<Expr>),
}

pub fn var(name: impl Into<String>) -> Expr {
    Expr::Var(name.into())
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Lit(value.into())
}

pub fn int(value: i64) -> Expr {
    Expr::Lit(Value::Int(value))
}

pub fn float(value: f64) -> Expr {
    Expr::Lit(Value::Float(value))
}

pub fn boolean(value: bool) -> Expr {
    Expr::Lit(Value::Bool(value))
}

pub fn len(expr: Expr) -> Expr {
    Expr::Len(Box::new(expr))
}

pub fn item(expr: Expr) -> Expr {
    Expr::Item(Box::new(expr))
}

pub fn list(items: Vec<Expr>) -> Expr {
    Expr::List(items)
}

pub fn call(op: OpKind, args: Vec<Expr>) -> Expr {
    call_with(op, args, OpAttrs::none())
}

pub fn call_with(op: OpKind, args: Vec<Expr>, attrs: OpAttrs) -> Expr {
    Expr::Call { op, args, attrs }
}

impl Expr {
    fn compare(self, op: CmpOp, rhs: Expr) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Ge, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Le, rhs)
    }

    pub fn equals(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Expr {
        self.compare(CmpOp::Ne, rhs)
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Names this expression reads.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    pub(crate) fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Lit(_) => {}
            Expr::Binary { lhs, rhs, .. }
            | Expr::Compare { lhs, rhs, .. }
            | Expr::And(lhs, rhs)
            | Expr::Or(lhs, rhs) => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
            Expr::Neg(inner) | Expr::Not(inner) | Expr::Len(inner) | Expr::Item(inner) => {
                inner.collect_vars(out)
            }
            Expr::Call { args, .. } | Expr::List(args) => {
                for arg in args {
                    arg.collect_vars(out);
                }
            }
        }
    }
}

impl From<TensorValue> for Expr {
    fn from(value: TensorValue) -> Self {
        Expr::Lit(Value::Tensor(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        int(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        int(value as i64)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        float(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        var(value)
    }
}

macro_rules! impl_binary_ops {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Expr>> ops::$trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    Expr::binary(BinOp::$op, self, rhs.into())
                }
            }
        )*
    };
}

impl_binary_ops! {
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}
