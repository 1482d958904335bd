//! Host-semantics interpreter.
//!
//! Runs statements on concrete values. With a recorder attached it logs
//! every operator call into the recorder's innermost interpreted scope; that
//! is how fallback regions are recorded during a trace. Without one it is
//! the reference eager evaluator.
mod value_eval;

pub use value_eval::{
    coerce_args, coerce_scalar, host_binary, host_compare, host_neg, item_of, len_of, output_tensor,
    range_bound, range_len, tensor_to_bool, tensor_to_i64, truthy,
};

use std::collections::HashMap;

use crate::error::TraceError;
use crate::graph::{OpAttrs, OpKind};
use crate::program::{BinOp, CmpOp, Expr, Program, RegionId, Stmt};
use crate::registry::OpRegistry;
use crate::tensor::TensorValue;
use crate::trace::TraceRecorder;
use crate::types::Value;

pub type Env = HashMap<String, Value>;

/// How control left a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Vec<Value>),
}

pub struct Interpreter<'a> {
    registry: &'a OpRegistry,
    recorder: Option<&'a mut TraceRecorder>,
}

impl<'a> Interpreter<'a> {
    pub fn new(registry: &'a OpRegistry) -> Self {
        Self {
            registry,
            recorder: None,
        }
    }

    pub fn with_recorder(registry: &'a OpRegistry, recorder: &'a mut TraceRecorder) -> Self {
        Self {
            registry,
            recorder: Some(recorder),
        }
    }

    /// Run a whole program. A body that falls off its end returns nothing.
    pub fn run(&mut self, program: &Program, inputs: &[Value]) -> Result<Vec<Value>, TraceError> {
        if inputs.len() != program.params().len() {
            return Err(TraceError::Arity {
                name: program.name().to_string(),
                expected: program.params().len(),
                actual: inputs.len(),
            });
        }
        let mut env: Env = program
            .params()
            .iter()
            .cloned()
            .zip(inputs.iter().cloned())
            .collect();
        match self.exec_block(&mut env, program.body())? {
            Flow::Return(values) => Ok(values),
            Flow::Normal => Ok(Vec::new()),
        }
    }

    pub fn exec_block(&mut self, env: &mut Env, body: &[Stmt]) -> Result<Flow, TraceError> {
        for stmt in body {
            if let Flow::Return(values) = self.exec_stmt(env, stmt)? {
                return Ok(Flow::Return(values));
            }
        }
        Ok(Flow::Normal)
    }

    pub fn exec_stmt(&mut self, env: &mut Env, stmt: &Stmt) -> Result<Flow, TraceError> {
        match stmt {
            Stmt::Assign { target, value } => {
                let value = self.eval(env, value)?;
                env.insert(target.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::AugAssign { target, op, value } => {
                let current = lookup(env, target)?;
                let rhs = self.eval(env, value)?;
                let value = self.binary(*op, current, rhs)?;
                env.insert(target.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::If {
                region,
                cond,
                then_body,
                else_body,
            } => {
                self.open_region(*region);
                let cond = self.eval(env, cond)?;
                let body = if truthy(&cond)? { then_body } else { else_body };
                let flow = self.exec_block(env, body)?;
                self.close_region()?;
                Ok(flow)
            }
            Stmt::For {
                region,
                var,
                start,
                end,
                step,
                body,
            } => {
                self.open_region(*region);
                let start = range_bound(&self.eval(env, start)?)?;
                let end = range_bound(&self.eval(env, end)?)?;
                let step = range_bound(&self.eval(env, step)?)?;
                let count = range_len(start, end, step)?;
                let mut flow = Flow::Normal;
                let mut current = start;
                for _ in 0..count {
                    if let Some(var) = var {
                        env.insert(var.clone(), Value::Int(current));
                    }
                    flow = self.exec_block(env, body)?;
                    if matches!(flow, Flow::Return(_)) {
                        break;
                    }
                    current = current.wrapping_add(step);
                }
                self.close_region()?;
                Ok(flow)
            }
            Stmt::While { region, cond, body } => {
                self.open_region(*region);
                let mut flow = Flow::Normal;
                loop {
                    let test = self.eval(env, cond)?;
                    if !truthy(&test)? {
                        break;
                    }
                    flow = self.exec_block(env, body)?;
                    if matches!(flow, Flow::Return(_)) {
                        break;
                    }
                }
                self.close_region()?;
                Ok(flow)
            }
            Stmt::Return(values) => {
                let values = values
                    .iter()
                    .map(|value| self.eval(env, value))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Flow::Return(values))
            }
            Stmt::Raise(message) => Err(TraceError::Raised(message.clone())),
        }
    }

    pub fn eval(&mut self, env: &Env, expr: &Expr) -> Result<Value, TraceError> {
        match expr {
            Expr::Var(name) => lookup(env, name),
            Expr::Lit(value) => Ok(value.clone()),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(env, lhs)?;
                let rhs = self.eval(env, rhs)?;
                self.binary(*op, lhs, rhs)
            }
            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval(env, lhs)?;
                let rhs = self.eval(env, rhs)?;
                self.compare(*op, lhs, rhs)
            }
            Expr::Neg(inner) => match self.eval(env, inner)? {
                Value::Tensor(tensor) => self.invoke_first(&OpKind::Neg, vec![tensor], &OpAttrs::none()),
                host => host_neg(&host),
            },
            Expr::And(lhs, rhs) => {
                let lhs = self.eval(env, lhs)?;
                if truthy(&lhs)? {
                    self.eval(env, rhs)
                } else {
                    Ok(lhs)
                }
            }
            Expr::Or(lhs, rhs) => {
                let lhs = self.eval(env, lhs)?;
                if truthy(&lhs)? {
                    Ok(lhs)
                } else {
                    self.eval(env, rhs)
                }
            }
            Expr::Not(inner) => {
                let value = self.eval(env, inner)?;
                Ok(Value::Bool(!truthy(&value)?))
            }
            Expr::Call { op, args, attrs } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(env, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let tensors = coerce_args(&args)?;
                self.invoke_first(op, tensors, attrs)
            }
            Expr::Len(inner) => len_of(&self.eval(env, inner)?),
            Expr::Item(inner) => item_of(&self.eval(env, inner)?),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(env, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }

    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, TraceError> {
        if !lhs.is_tensor() && !rhs.is_tensor() {
            return host_binary(op, &lhs, &rhs);
        }
        let tensors = coerce_args(&[lhs, rhs])?;
        self.invoke_first(&op.op_kind(), tensors, &OpAttrs::none())
    }

    pub fn compare(&mut self, op: CmpOp, lhs: Value, rhs: Value) -> Result<Value, TraceError> {
        if !lhs.is_tensor() && !rhs.is_tensor() {
            return host_compare(op, &lhs, &rhs);
        }
        let tensors = coerce_args(&[lhs, rhs])?;
        self.invoke_first(&op.op_kind(), tensors, &OpAttrs::none())
    }

    fn invoke_first(&mut self, op: &OpKind, inputs: Vec<TensorValue>, attrs: &OpAttrs) -> Result<Value, TraceError> {
        self.invoke(op, &inputs, attrs)?
            .into_iter()
            .next()
            .map(Value::Tensor)
            .ok_or_else(|| TraceError::Internal(format!("`{}` produced no outputs", op)))
    }

    /// Run one operator through the registry and log it when recording.
    pub fn invoke(&mut self, op: &OpKind, inputs: &[TensorValue], attrs: &OpAttrs) -> Result<Vec<TensorValue>, TraceError> {
        let outputs = self
            .registry
            .invoke(op, inputs, attrs)
            .map_err(|err| TraceError::operator(op, err))?;
        if let Some(recorder) = self.recorder.as_deref_mut() {
            recorder.log_invocation(
                op,
                inputs.iter().map(TensorValue::sig).collect(),
                outputs.iter().map(TensorValue::sig).collect(),
            );
        }
        Ok(outputs)
    }

    fn open_region(&mut self, region: RegionId) {
        if let Some(recorder) = self.recorder.as_deref_mut() {
            recorder.open_interpreted(Some(region));
        }
    }

    fn close_region(&mut self) -> Result<(), TraceError> {
        match self.recorder.as_deref_mut() {
            Some(recorder) => recorder.close_region(),
            None => Ok(()),
        }
    }
}

fn lookup(env: &Env, name: &str) -> Result<Value, TraceError> {
    env.get(name)
        .cloned()
        .ok_or_else(|| TraceError::Unbound(name.to_string()))
}
