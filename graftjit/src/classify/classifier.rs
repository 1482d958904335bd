use std::collections::BTreeSet;
use std::slice;

use thiserror::Error;

use super::abs::{Abs, AbsEnv};
use super::report::{Classification, ClassificationReport, StmtPlan};
use crate::error::{OperatorError, TraceError};
use crate::graph::{OpAttrs, OpKind};
use crate::interp::{coerce_args, coerce_scalar, host_binary, host_compare, host_neg, len_of, range_bound, range_len, truthy};
use crate::program::{assigned_names, BinOp, CmpOp, Expr, RegionId, Stmt};
use crate::registry::OpRegistry;
use crate::tensor::{TensorSig, TensorValue};
use crate::types::Value;

/// Why a region cannot be recorded as graph nodes. Never leaves the engine:
/// every error turns into a fallback with the message as its reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    #[error("name `{0}` is not bound")]
    Unbound(String),
    #[error("`{0}` depends on an interpreted region")]
    Dynamic(String),
    #[error("`{op}` rejects its operand signatures: {source}")]
    Inference {
        op: String,
        #[source]
        source: OperatorError,
    },
    #[error("{0} branches on tensor data")]
    HostPredicate(String),
    #[error("tensor-to-host conversion reads tensor data")]
    HostConversion,
    #[error("loop bound depends on tensor data")]
    DataDependentBound,
    #[error("len() of a 0-d tensor")]
    RankZeroLen,
    #[error("branches disagree on `{0}`")]
    BranchMismatch(String),
    #[error("{count} iterations exceed the unroll limit of {limit}")]
    UnrollLimit { count: u64, limit: usize },
    #[error("range() step is zero")]
    ZeroStep,
    #[error("while loops are always interpreted")]
    WhileLoop,
    #[error("return inside a region")]
    EarlyExit,
    #[error("raises `{0}`")]
    Exception(String),
    #[error("host evaluation fails: {0}")]
    Host(#[source] TraceError),
}

type Verdict<T> = Result<T, ClassificationError>;

pub struct Classifier<'a> {
    registry: &'a OpRegistry,
    max_unroll: usize,
}

impl<'a> Classifier<'a> {
    pub fn new(registry: &'a OpRegistry, max_unroll: usize) -> Self {
        Self {
            registry,
            max_unroll,
        }
    }

    /// Classify one top-level statement against the bindings live before
    /// it, and append its plan to the report. Nested regions are recorded
    /// along the way.
    pub fn classify_top(
        &self,
        env: &AbsEnv,
        index: usize,
        stmt: &Stmt,
        report: &mut ClassificationReport,
    ) -> Classification {
        let mut scratch = env.clone();
        let result = match stmt {
            Stmt::Return(values) => values
                .iter()
                .try_for_each(|value| self.expr(&scratch, value).map(drop)),
            _ => self.stmt(&mut scratch, stmt, report),
        };
        let classification = match result {
            Ok(()) => Classification::GraphNative,
            Err(err) => {
                crate::trace!("statement {} falls back: {}", index, err);
                Classification::fallback(err.to_string())
            }
        };
        report.top_level.push(StmtPlan {
            index,
            region: stmt.region(),
            kind: stmt.region_kind(),
            classification: classification.clone(),
            tail: false,
        });
        classification
    }

    fn block(&self, env: &mut AbsEnv, body: &[Stmt], report: &mut ClassificationReport) -> Verdict<()> {
        body.iter().try_for_each(|stmt| self.stmt(env, stmt, report))
    }

    fn stmt(&self, env: &mut AbsEnv, stmt: &Stmt, report: &mut ClassificationReport) -> Verdict<()> {
        match stmt {
            Stmt::Assign { target, value } => {
                let value = self.expr(env, value)?;
                env.insert(target.clone(), value);
                Ok(())
            }
            Stmt::AugAssign { target, op, value } => {
                let current = lookup(env, target)?;
                let rhs = self.expr(env, value)?;
                let value = self.binary(*op, current, rhs)?;
                env.insert(target.clone(), value);
                Ok(())
            }
            Stmt::If { region, .. } | Stmt::For { region, .. } | Stmt::While { region, .. } => {
                let before = env.clone();
                let result = match stmt {
                    Stmt::If {
                        cond,
                        then_body,
                        else_body,
                        ..
                    } => self.if_region(env, cond, then_body, else_body, report),
                    Stmt::For {
                        var,
                        start,
                        end,
                        step,
                        body,
                        ..
                    } => self.for_region(env, var.as_deref(), [start, end, step], body, report),
                    _ => Err(ClassificationError::WhileLoop),
                };
                let classification = match &result {
                    Ok(()) => Classification::GraphNative,
                    Err(err) => Classification::fallback(err.to_string()),
                };
                report.record_region(*region, stmt.region_kind(), region_deps(stmt), classification);
                if result.is_err() {
                    self.survey(&before, stmt, report);
                }
                result
            }
            Stmt::Return(_) => Err(ClassificationError::EarlyExit),
            Stmt::Raise(message) => Err(ClassificationError::Exception(message.clone())),
        }
    }

    fn if_region(
        &self,
        env: &mut AbsEnv,
        cond: &Expr,
        then_body: &[Stmt],
        else_body: &[Stmt],
        report: &mut ClassificationReport,
    ) -> Verdict<()> {
        match self.expr(env, cond)? {
            Abs::Host {
                value,
                dynamic: false,
            } => {
                let taken = truthy(&value).map_err(ClassificationError::Host)?;
                self.block(env, if taken { then_body } else { else_body }, report)
            }
            Abs::Tensor {
                sig,
                dynamic: false,
            } => {
                if sig.numel() != 1 {
                    return Err(ClassificationError::HostPredicate(format!(
                        "a condition on a tensor with {} elements",
                        sig.numel()
                    )));
                }
                let mut then_env = env.clone();
                self.block(&mut then_env, then_body, report)?;
                let mut else_env = env.clone();
                self.block(&mut else_env, else_body, report)?;
                join_branches(env, &then_env, &else_env)
            }
            _ => Err(ClassificationError::Dynamic("if condition".to_string())),
        }
    }

    fn for_region(
        &self,
        env: &mut AbsEnv,
        var: Option<&str>,
        bounds: [&Expr; 3],
        body: &[Stmt],
        report: &mut ClassificationReport,
    ) -> Verdict<()> {
        let mut resolved = [0i64; 3];
        for (slot, bound) in resolved.iter_mut().zip(bounds) {
            *slot = match self.expr(env, bound)? {
                Abs::Host {
                    value,
                    dynamic: false,
                } => range_bound(&value).map_err(ClassificationError::Host)?,
                Abs::Tensor { dynamic: false, .. } => return Err(ClassificationError::DataDependentBound),
                _ => return Err(ClassificationError::Dynamic("loop bound".to_string())),
            };
        }
        let [start, end, step] = resolved;
        if step == 0 {
            return Err(ClassificationError::ZeroStep);
        }
        let count = range_len(start, end, step).map_err(ClassificationError::Host)?;
        if count > self.max_unroll as u64 {
            return Err(ClassificationError::UnrollLimit {
                count,
                limit: self.max_unroll,
            });
        }
        let mut current = start;
        for _ in 0..count {
            if let Some(var) = var {
                env.insert(
                    var.to_string(),
                    Abs::Host {
                        value: Value::Int(current),
                        dynamic: false,
                    },
                );
            }
            self.block(env, body, report)?;
            current = current.wrapping_add(step);
        }
        Ok(())
    }

    /// Classify the regions nested in an interpreted region for the report.
    /// Everything the enclosing region assigns is unknown inside it.
    fn survey(&self, env: &AbsEnv, stmt: &Stmt, report: &mut ClassificationReport) {
        let mut nested = Vec::new();
        collect_nested(stmt, &mut nested);
        report.forget_regions(&nested);

        let mut env = env.clone();
        for name in assigned_names(slice::from_ref(stmt)) {
            env.insert(name, Abs::Unknown);
        }
        match stmt {
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                self.lenient(&mut env.clone(), then_body, report);
                self.lenient(&mut env, else_body, report);
            }
            Stmt::For { body, .. } | Stmt::While { body, .. } => self.lenient(&mut env, body, report),
            _ => {}
        }
    }

    fn lenient(&self, env: &mut AbsEnv, body: &[Stmt], report: &mut ClassificationReport) {
        for stmt in body {
            let mut trial = env.clone();
            match self.stmt(&mut trial, stmt, report) {
                Ok(()) => *env = trial,
                Err(_) => {
                    for name in assigned_names(slice::from_ref(stmt)) {
                        env.insert(name, Abs::Unknown);
                    }
                }
            }
        }
    }

    pub fn expr(&self, env: &AbsEnv, expr: &Expr) -> Verdict<Abs> {
        match expr {
            Expr::Var(name) => lookup(env, name),
            Expr::Lit(value) => Ok(Abs::of_value(value, false)),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.expr(env, lhs)?;
                let rhs = self.expr(env, rhs)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.expr(env, lhs)?;
                let rhs = self.expr(env, rhs)?;
                self.compare(*op, lhs, rhs)
            }
            Expr::Neg(inner) => match self.expr(env, inner)? {
                Abs::Tensor { sig, dynamic } => self.infer(&OpKind::Neg, vec![sig], dynamic, &OpAttrs::none()),
                host => {
                    let value = static_host(&host, "operand of unary -")?;
                    host_neg(value).map(constant).map_err(ClassificationError::Host)
                }
            },
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                let is_and = matches!(expr, Expr::And(..));
                let left = self.expr(env, lhs)?;
                if left.is_tensor() {
                    return Err(ClassificationError::HostPredicate(format!(
                        "`{}` on a tensor",
                        if is_and { "and" } else { "or" }
                    )));
                }
                let taken = truthy(static_host(&left, "boolean operand")?).map_err(ClassificationError::Host)?;
                if taken == is_and {
                    self.expr(env, rhs)
                } else {
                    Ok(left)
                }
            }
            Expr::Not(inner) => {
                let value = self.expr(env, inner)?;
                if value.is_tensor() {
                    return Err(ClassificationError::HostPredicate("`not` on a tensor".to_string()));
                }
                let taken = truthy(static_host(&value, "operand of not")?).map_err(ClassificationError::Host)?;
                Ok(constant(Value::Bool(!taken)))
            }
            Expr::Call { op, args, attrs } => {
                let args = args
                    .iter()
                    .map(|arg| self.expr(env, arg))
                    .collect::<Verdict<Vec<_>>>()?;
                let (sigs, dynamic) = operand_sigs(&args)?;
                self.infer(op, sigs, dynamic, attrs)
            }
            Expr::Len(inner) => match self.expr(env, inner)? {
                Abs::Tensor {
                    sig,
                    dynamic: false,
                } => match sig.shape.first() {
                    Some(dim) => Ok(constant(Value::Int(*dim as i64))),
                    None => Err(ClassificationError::RankZeroLen),
                },
                other => {
                    let value = static_host(&other, "len() operand")?;
                    len_of(value).map(constant).map_err(ClassificationError::Host)
                }
            },
            Expr::Item(_) => Err(ClassificationError::HostConversion),
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let item = self.expr(env, item)?;
                    values.push(static_host(&item, "list element")?.clone());
                }
                Ok(constant(Value::List(values)))
            }
        }
    }

    fn binary(&self, op: BinOp, lhs: Abs, rhs: Abs) -> Verdict<Abs> {
        if !lhs.is_tensor() && !rhs.is_tensor() {
            let a = static_host(&lhs, "arithmetic operand")?;
            let b = static_host(&rhs, "arithmetic operand")?;
            return host_binary(op, a, b).map(constant).map_err(ClassificationError::Host);
        }
        let (sigs, dynamic) = operand_sigs(&[lhs, rhs])?;
        self.infer(&op.op_kind(), sigs, dynamic, &OpAttrs::none())
    }

    fn compare(&self, op: CmpOp, lhs: Abs, rhs: Abs) -> Verdict<Abs> {
        if !lhs.is_tensor() && !rhs.is_tensor() {
            let a = static_host(&lhs, "comparison operand")?;
            let b = static_host(&rhs, "comparison operand")?;
            return host_compare(op, a, b).map(constant).map_err(ClassificationError::Host);
        }
        let (sigs, dynamic) = operand_sigs(&[lhs, rhs])?;
        self.infer(&op.op_kind(), sigs, dynamic, &OpAttrs::none())
    }

    fn infer(&self, op: &OpKind, sigs: Vec<TensorSig>, dynamic: bool, attrs: &OpAttrs) -> Verdict<Abs> {
        let outputs = self
            .registry
            .infer(op, &sigs, attrs)
            .map_err(|source| ClassificationError::Inference {
                op: op.to_string(),
                source,
            })?;
        outputs
            .into_iter()
            .next()
            .map(|sig| Abs::Tensor { sig, dynamic })
            .ok_or_else(|| ClassificationError::Host(TraceError::Internal(format!("`{}` has no outputs", op))))
    }
}

fn constant(value: Value) -> Abs {
    Abs::Host {
        value,
        dynamic: false,
    }
}

fn lookup(env: &AbsEnv, name: &str) -> Verdict<Abs> {
    match env.get(name) {
        Some(Abs::Unknown) => Err(ClassificationError::Dynamic(name.to_string())),
        Some(value) => Ok(value.clone()),
        None => Err(ClassificationError::Unbound(name.to_string())),
    }
}

fn static_host<'v>(value: &'v Abs, what: &str) -> Verdict<&'v Value> {
    value
        .static_host()
        .ok_or_else(|| ClassificationError::Dynamic(what.to_string()))
}

/// Operand signatures of a tensor operator, mirroring the interpreter's
/// coercion of host scalars. The result is dynamic if any operand is.
fn operand_sigs(args: &[Abs]) -> Verdict<(Vec<TensorSig>, bool)> {
    let dtype = args.iter().find_map(|arg| match arg {
        Abs::Tensor { sig, .. } => Some(sig.dtype),
        _ => None,
    });
    let mut sigs = Vec::with_capacity(args.len());
    let mut dynamic = false;
    for arg in args {
        match arg {
            Abs::Tensor { sig, dynamic: d } => {
                dynamic |= *d;
                sigs.push(sig.clone());
            }
            other => {
                let value = static_host(other, "tensor operand")?;
                let tensor = match dtype {
                    Some(dtype) => coerce_scalar(value, dtype),
                    None => coerce_args(slice::from_ref(value)).map(|mut out| out.remove(0)),
                }
                .map_err(ClassificationError::Host)?;
                sigs.push(TensorValue::sig(&tensor));
            }
        }
    }
    Ok((sigs, dynamic))
}

/// Merge the bindings of the two branches of a tensor conditional.
fn join_branches(env: &mut AbsEnv, then_env: &AbsEnv, else_env: &AbsEnv) -> Verdict<()> {
    let names = then_env
        .keys()
        .chain(else_env.keys())
        .cloned()
        .collect::<BTreeSet<_>>();
    for name in names {
        let before = env.get(&name);
        let (then_value, else_value) = (then_env.get(&name), else_env.get(&name));
        if then_value == before && else_value == before {
            continue;
        }
        let joined = match (then_value, else_value) {
            (Some(a), Some(b)) if a.is_dynamic() || b.is_dynamic() => {
                return Err(ClassificationError::Dynamic(name));
            }
            (
                Some(Abs::Tensor { sig: a, .. }),
                Some(Abs::Tensor { sig: b, .. }),
            ) if a == b => Abs::Tensor {
                sig: a.clone(),
                dynamic: false,
            },
            (Some(a @ Abs::Host { .. }), Some(b)) if a == b => a.clone(),
            _ => return Err(ClassificationError::BranchMismatch(name)),
        };
        env.insert(name, joined);
    }
    Ok(())
}

fn region_deps(stmt: &Stmt) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    match stmt {
        Stmt::If { cond, .. } | Stmt::While { cond, .. } => cond.collect_vars(&mut deps),
        Stmt::For { start, end, step, .. } => {
            start.collect_vars(&mut deps);
            end.collect_vars(&mut deps);
            step.collect_vars(&mut deps);
        }
        _ => {}
    }
    deps
}

fn collect_nested(stmt: &Stmt, out: &mut Vec<RegionId>) {
    let bodies: Vec<&[Stmt]> = match stmt {
        Stmt::If {
            then_body,
            else_body,
            ..
        } => vec![then_body, else_body],
        Stmt::For { body, .. } | Stmt::While { body, .. } => vec![body],
        _ => Vec::new(),
    };
    for body in bodies {
        for inner in body {
            if let Some(region) = inner.region() {
                out.push(region);
            }
            collect_nested(inner, out);
        }
    }
}
