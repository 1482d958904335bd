//! The trace pass.
//!
//! Runs the function body once on concrete values. Before each top-level
//! statement the classifier decides how it is compiled: graph-native
//! statements are recorded as nodes, everything else becomes a fallback
//! node that the interpreter runs now and on every replay. A fallback that
//! contains a `return` absorbs the rest of the body.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::classify::{Abs, AbsEnv, Classification, ClassificationReport, Classifier};
use crate::error::TraceError;
use crate::graph::{FallbackHole, GraphOutputs, NodeKind, OpAttrs, OpKind, OutputGuard, TraceGraph, ValueRef};
use crate::interp::{
    coerce_args, host_binary, host_compare, host_neg, len_of, range_bound, range_len, tensor_to_bool, truthy, Flow,
    Interpreter,
};
use crate::program::{assigned_names, read_names, BinOp, CmpOp, Expr, Program, RegionId, Stmt};
use crate::registry::OpRegistry;
use crate::tensor::TensorValue;
use crate::trace::TraceRecorder;
use crate::types::Value;

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Ref(ValueRef),
    /// Known at trace time; becomes a `Const` node when the graph needs it.
    Const,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    source: Source,
    /// Produced by, or computed from, a fallback node.
    dynamic: bool,
}

impl Binding {
    fn constant(value: Value) -> Self {
        Self {
            value,
            source: Source::Const,
            dynamic: false,
        }
    }
}

type Bindings = HashMap<String, Binding>;

/// Result of a successful trace pass.
#[derive(Debug)]
pub struct TraceOutcome {
    pub graph: TraceGraph,
    pub report: ClassificationReport,
    /// Values the function returned on the traced call.
    pub outputs: Vec<Value>,
}

pub struct Tracer<'a> {
    registry: &'a OpRegistry,
    classifier: Classifier<'a>,
    recorder: TraceRecorder,
    report: ClassificationReport,
}

impl<'a> Tracer<'a> {
    pub fn new(registry: &'a OpRegistry, max_unroll: usize) -> Self {
        Self {
            registry,
            classifier: Classifier::new(registry, max_unroll),
            recorder: TraceRecorder::new(),
            report: ClassificationReport::new(),
        }
    }

    pub fn trace(mut self, program: &Program, inputs: &[Value]) -> Result<TraceOutcome, TraceError> {
        if inputs.len() != program.params().len() {
            return Err(TraceError::Arity {
                name: program.name().to_string(),
                expected: program.params().len(),
                actual: inputs.len(),
            });
        }
        let mut env = Bindings::new();
        for (index, (name, value)) in program.params().iter().zip(inputs).enumerate() {
            let source = match value {
                Value::Tensor(_) => Source::Ref(ValueRef::Input(index)),
                _ => Source::Const,
            };
            env.insert(
                name.clone(),
                Binding {
                    value: value.clone(),
                    source,
                    dynamic: false,
                },
            );
        }

        let body = program.body();
        let mut graph_outputs = GraphOutputs::Values(Vec::new());
        let mut outputs = Vec::new();
        for (index, stmt) in body.iter().enumerate() {
            let abstract_env = abstract_env(&env);
            let classification = self
                .classifier
                .classify_top(&abstract_env, index, stmt, &mut self.report);
            match (classification, stmt) {
                (Classification::GraphNative, Stmt::Return(values)) => {
                    let mut refs = Vec::with_capacity(values.len());
                    for value in values {
                        let binding = self.expr(&env, value)?;
                        refs.push(self.materialize(&binding, None)?);
                        outputs.push(binding.value);
                    }
                    graph_outputs = GraphOutputs::Values(refs);
                    break;
                }
                (Classification::GraphNative, _) => self.stmt(&mut env, stmt)?,
                (Classification::Fallback { .. }, _) if stmt.contains_return() => {
                    if let Some(plan) = self.report.top_level.last_mut() {
                        plan.tail = true;
                    }
                    let (node, flow) = self.fallback(&mut env, index, stmt.region(), &body[index..], true)?;
                    if let Flow::Return(values) = flow {
                        outputs = values;
                    }
                    graph_outputs = GraphOutputs::Tail { node };
                    break;
                }
                (Classification::Fallback { .. }, _) => {
                    self.fallback(&mut env, index, stmt.region(), std::slice::from_ref(stmt), false)?;
                }
            }
        }

        let graph = self.recorder.finish(program.params().len(), graph_outputs)?;
        crate::trace!(
            "traced `{}`: {} nodes, {} fallback statements",
            program.name(),
            graph.node_count(),
            self.report.fallback_statements()
        );
        Ok(TraceOutcome {
            graph,
            report: self.report,
            outputs,
        })
    }

    /// Run statements through the interpreter and record them as one
    /// fallback node whose outputs rebind every name the statements assign.
    fn fallback(
        &mut self,
        env: &mut Bindings,
        first_stmt: usize,
        region: Option<RegionId>,
        statements: &[Stmt],
        tail: bool,
    ) -> Result<(usize, Flow), TraceError> {
        let assigned = assigned_names(statements);
        let touched = read_names(statements)
            .into_iter()
            .chain(assigned.iter().cloned())
            .collect::<BTreeSet<_>>();

        let mut inputs = BTreeMap::new();
        let mut interp_env = HashMap::new();
        for name in touched {
            if let Some(binding) = env.get(&name) {
                let value_ref = self.materialize(binding, None)?;
                interp_env.insert(name.clone(), binding.value.clone());
                inputs.insert(name, value_ref);
            }
        }

        self.recorder.open_interpreted(None);
        let flow = {
            let mut interpreter = Interpreter::with_recorder(self.registry, &mut self.recorder);
            interpreter.exec_block(&mut interp_env, statements)?
        };
        let recorded = self.recorder.close_fallback()?;
        if matches!(flow, Flow::Return(_)) && !tail {
            return Err(TraceError::Internal("return escaped a fallback region".to_string()));
        }

        let outputs = if tail { Vec::new() } else { assigned.into_iter().collect::<Vec<_>>() };
        let guards = outputs
            .iter()
            .map(|name| match interp_env.get(name) {
                Some(value) => OutputGuard::Bound(value.kind()),
                None => OutputGuard::Unbound,
            })
            .collect();
        let node = self.recorder.push(NodeKind::Fallback(FallbackHole {
            region,
            first_stmt,
            statements: statements.to_vec(),
            inputs,
            outputs: outputs.clone(),
            guards,
            tail,
            recorded,
        }))?;

        for (output, name) in outputs.into_iter().enumerate() {
            match interp_env.remove(&name) {
                Some(value) => {
                    env.insert(
                        name,
                        Binding {
                            value,
                            source: Source::Ref(ValueRef::Node { node, output }),
                            dynamic: true,
                        },
                    );
                }
                None => {
                    env.remove(&name);
                }
            }
        }
        Ok((node, flow))
    }

    fn block(&mut self, env: &mut Bindings, body: &[Stmt]) -> Result<(), TraceError> {
        body.iter().try_for_each(|stmt| self.stmt(env, stmt))
    }

    /// Record a statement the classifier accepted as graph-native.
    fn stmt(&mut self, env: &mut Bindings, stmt: &Stmt) -> Result<(), TraceError> {
        match stmt {
            Stmt::Assign { target, value } => {
                let binding = self.expr(env, value)?;
                env.insert(target.clone(), binding);
                Ok(())
            }
            Stmt::AugAssign { target, op, value } => {
                let current = lookup(env, target)?;
                let rhs = self.expr(env, value)?;
                let binding = self.binary(*op, current, rhs)?;
                env.insert(target.clone(), binding);
                Ok(())
            }
            Stmt::If {
                region,
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.expr(env, cond)?;
                if cond.value.is_tensor() {
                    self.cond(env, *region, cond, then_body, else_body)
                } else {
                    let body = if truthy(&cond.value)? { then_body } else { else_body };
                    self.block(env, body)
                }
            }
            Stmt::For {
                var,
                start,
                end,
                step,
                body,
                ..
            } => {
                let start = range_bound(&self.expr(env, start)?.value)?;
                let end = range_bound(&self.expr(env, end)?.value)?;
                let step = range_bound(&self.expr(env, step)?.value)?;
                let mut current = start;
                for _ in 0..range_len(start, end, step)? {
                    if let Some(var) = var {
                        env.insert(var.clone(), Binding::constant(Value::Int(current)));
                    }
                    self.block(env, body)?;
                    current = current.wrapping_add(step);
                }
                Ok(())
            }
            Stmt::While { region, .. } => Err(TraceError::Internal(format!(
                "while loop {} reached the graph recorder",
                region
            ))),
            Stmt::Return(_) | Stmt::Raise(_) => Err(TraceError::Internal(
                "early exit reached the graph recorder".to_string(),
            )),
        }
    }

    /// Record a conditional on a one-element tensor as a `Cond` node. Both
    /// bodies are recorded; the one that does not run on this call is
    /// recorded in shadow mode.
    fn cond(
        &mut self,
        env: &mut Bindings,
        region: RegionId,
        pred: Binding,
        then_body: &[Stmt],
        else_body: &[Stmt],
    ) -> Result<(), TraceError> {
        let pred_ref = self.materialize(&pred, None)?;
        let taken = match &pred.value {
            Value::Tensor(tensor) => tensor_to_bool(tensor)?,
            other => truthy(other)?,
        };
        let shadowed = self.recorder.is_shadow();
        let candidates = assigned_names(then_body)
            .into_iter()
            .chain(assigned_names(else_body))
            .collect::<BTreeSet<_>>();

        let mut then_env = env.clone();
        self.recorder.open_body(shadowed || !taken);
        self.block(&mut then_env, then_body)?;
        let then_outputs = self.body_outputs(&then_env, &candidates)?;
        let then_nodes = self.recorder.close_body()?;

        let mut else_env = env.clone();
        self.recorder.open_body(shadowed || taken);
        self.block(&mut else_env, else_body)?;
        let else_outputs = self.body_outputs(&else_env, &candidates)?;
        let else_nodes = self.recorder.close_body()?;

        let names = then_outputs.iter().map(|(name, _)| name).collect::<Vec<_>>();
        if names != else_outputs.iter().map(|(name, _)| name).collect::<Vec<_>>() {
            return Err(TraceError::Internal(format!(
                "branches of {} bind different tensors",
                region
            )));
        }
        let names = names.into_iter().cloned().collect::<Vec<_>>();

        let (taken_env, then_refs, else_refs) = {
            let refs = |outputs: Vec<(String, ValueRef)>| outputs.into_iter().map(|(_, r)| r).collect::<Vec<_>>();
            let taken_env = if taken { then_env } else { else_env };
            (taken_env, refs(then_outputs), refs(else_outputs))
        };
        let node = self.recorder.push(NodeKind::Cond {
            region,
            pred: pred_ref,
            then_body: then_nodes,
            else_body: else_nodes,
            then_outputs: then_refs,
            else_outputs: else_refs,
        })?;

        for name in &candidates {
            match taken_env.get(name) {
                Some(binding) if !binding.value.is_tensor() => {
                    env.insert(name.clone(), binding.clone());
                }
                _ => {}
            }
        }
        for (output, name) in names.into_iter().enumerate() {
            let binding = taken_env
                .get(&name)
                .ok_or_else(|| TraceError::Unbound(name.clone()))?;
            env.insert(
                name,
                Binding {
                    value: binding.value.clone(),
                    source: Source::Ref(ValueRef::Node { node, output }),
                    dynamic: pred.dynamic || binding.dynamic,
                },
            );
        }
        Ok(())
    }

    fn expr(&mut self, env: &Bindings, expr: &Expr) -> Result<Binding, TraceError> {
        match expr {
            Expr::Var(name) => lookup(env, name),
            Expr::Lit(value) => Ok(Binding::constant(value.clone())),
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
            Expr::Neg(inner) => {
                let inner = self.expr(env, inner)?;
                if inner.value.is_tensor() {
                    self.op(&OpKind::Neg, vec![inner], &OpAttrs::none())
                } else {
                    Ok(derived(host_neg(&inner.value)?, &[&inner]))
                }
            }
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                let left = self.expr(env, lhs)?;
                let taken = host_truth(&left)?;
                if taken == matches!(expr, Expr::And(..)) {
                    self.expr(env, rhs)
                } else {
                    Ok(left)
                }
            }
            Expr::Not(inner) => {
                let inner = self.expr(env, inner)?;
                Ok(derived(Value::Bool(!host_truth(&inner)?), &[&inner]))
            }
            Expr::Call { op, args, attrs } => {
                let args = args
                    .iter()
                    .map(|arg| self.expr(env, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.op(op, args, attrs)
            }
            Expr::Len(inner) => {
                let inner = self.expr(env, inner)?;
                Ok(derived(len_of(&inner.value)?, &[&inner]))
            }
            Expr::Item(_) => Err(TraceError::Internal(
                "tensor-to-host conversion reached the graph recorder".to_string(),
            )),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.expr(env, item))
                    .collect::<Result<Vec<_>, _>>()?;
                let parts = items.iter().collect::<Vec<_>>();
                let value = Value::List(items.iter().map(|item| item.value.clone()).collect());
                Ok(derived(value, &parts))
            }
        }
    }

    fn binary(&mut self, op: BinOp, lhs: Binding, rhs: Binding) -> Result<Binding, TraceError> {
        if !lhs.value.is_tensor() && !rhs.value.is_tensor() {
            return Ok(derived(host_binary(op, &lhs.value, &rhs.value)?, &[&lhs, &rhs]));
        }
        self.op(&op.op_kind(), vec![lhs, rhs], &OpAttrs::none())
    }

    fn compare(&mut self, op: CmpOp, lhs: Binding, rhs: Binding) -> Result<Binding, TraceError> {
        if !lhs.value.is_tensor() && !rhs.value.is_tensor() {
            return Ok(derived(host_compare(op, &lhs.value, &rhs.value)?, &[&lhs, &rhs]));
        }
        self.op(&op.op_kind(), vec![lhs, rhs], &OpAttrs::none())
    }

    /// Record one operator node. Inside a shadow body only shape inference
    /// runs and the outputs are zero placeholders.
    fn op(&mut self, op: &OpKind, args: Vec<Binding>, attrs: &OpAttrs) -> Result<Binding, TraceError> {
        let values = args.iter().map(|arg| arg.value.clone()).collect::<Vec<_>>();
        let tensors = coerce_args(&values)?;
        let mut refs = Vec::with_capacity(args.len());
        for (arg, tensor) in args.iter().zip(&tensors) {
            refs.push(self.materialize(arg, Some(tensor))?);
        }

        let outputs = if self.recorder.is_shadow() {
            let sigs = tensors.iter().map(TensorValue::sig).collect::<Vec<_>>();
            self.registry
                .infer(op, &sigs, attrs)
                .map_err(|err| TraceError::operator(op, err))?
                .into_iter()
                .map(|sig| TensorValue::zeros(sig.dtype, &sig.shape))
                .collect::<Vec<_>>()
        } else {
            self.registry
                .invoke(op, &tensors, attrs)
                .map_err(|err| TraceError::operator(op, err))?
        };
        let count = outputs.len();
        let first = outputs
            .into_iter()
            .next()
            .ok_or_else(|| TraceError::Internal(format!("`{}` produced no outputs", op)))?;
        let node = self.recorder.push(NodeKind::Op {
            op: op.clone(),
            attrs: attrs.clone(),
            inputs: refs,
            outputs: count,
        })?;
        Ok(Binding {
            value: Value::Tensor(first),
            source: Source::Ref(ValueRef::Node { node, output: 0 }),
            dynamic: args.iter().any(|arg| arg.dynamic),
        })
    }

    /// Tensor-valued names among `candidates`, with the references a body
    /// hands back to its enclosing `Cond` node. Runs while the body's scope
    /// is still open so constants land inside it.
    fn body_outputs(
        &mut self,
        env: &Bindings,
        candidates: &BTreeSet<String>,
    ) -> Result<Vec<(String, ValueRef)>, TraceError> {
        let mut out = Vec::new();
        for name in candidates {
            if let Some(binding) = env.get(name).filter(|binding| binding.value.is_tensor()) {
                out.push((name.clone(), self.materialize(binding, None)?));
            }
        }
        Ok(out)
    }

    /// Graph reference for a binding. Trace-time constants become `Const`
    /// nodes; `coerced` is the tensor form an operator consumes.
    fn materialize(&mut self, binding: &Binding, coerced: Option<&TensorValue>) -> Result<ValueRef, TraceError> {
        match (&binding.source, coerced) {
            (Source::Ref(value_ref), None) => Ok(*value_ref),
            (Source::Ref(value_ref), Some(_)) if binding.value.is_tensor() => Ok(*value_ref),
            (Source::Ref(_), Some(_)) => Err(TraceError::Internal(
                "host value from an interpreted region used as a tensor operand".to_string(),
            )),
            (Source::Const, Some(tensor)) => self.recorder.constant(Value::Tensor(tensor.clone())),
            (Source::Const, None) => self.recorder.constant(binding.value.clone()),
        }
    }
}

fn lookup(env: &Bindings, name: &str) -> Result<Binding, TraceError> {
    env.get(name)
        .cloned()
        .ok_or_else(|| TraceError::Unbound(name.to_string()))
}

fn derived(value: Value, parts: &[&Binding]) -> Binding {
    Binding {
        value,
        source: Source::Const,
        dynamic: parts.iter().any(|part| part.dynamic),
    }
}

fn host_truth(binding: &Binding) -> Result<bool, TraceError> {
    if binding.value.is_tensor() {
        return Err(TraceError::Internal(
            "tensor truthiness reached the graph recorder".to_string(),
        ));
    }
    truthy(&binding.value)
}

fn abstract_env(env: &Bindings) -> AbsEnv {
    env.iter()
        .map(|(name, binding)| (name.clone(), Abs::of_value(&binding.value, binding.dynamic)))
        .collect()
}
