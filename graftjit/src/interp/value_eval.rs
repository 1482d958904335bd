//! Host-value semantics shared by the interpreter, the tracer and the
//! classifier, so all three agree on what a program means.
use crate::error::TraceError;
use crate::program::{BinOp, CmpOp};
use crate::tensor::{DType, TensorValue};
use crate::types::Value;

pub fn tensor_to_bool(value: &TensorValue) -> Result<bool, TraceError> {
    if value.len() != 1 {
        return Err(TraceError::type_error(format!(
            "the truth value of a tensor with {} elements is ambiguous",
            value.len()
        )));
    }
    value
        .get_f64(0)
        .map(|x| x != 0.0)
        .ok_or_else(|| TraceError::Internal("empty scalar tensor".to_string()))
}

pub fn tensor_to_i64(value: &TensorValue) -> Result<i64, TraceError> {
    if value.len() != 1 {
        return Err(TraceError::type_error(format!(
            "only single-element tensors convert to an index, got {} elements",
            value.len()
        )));
    }
    value.get_i64(0).ok_or_else(|| {
        TraceError::type_error(format!("a {} tensor cannot be interpreted as an integer", value.dtype()))
    })
}

pub fn truthy(value: &Value) -> Result<bool, TraceError> {
    match value {
        Value::Tensor(tensor) => tensor_to_bool(tensor),
        Value::Int(v) => Ok(*v != 0),
        Value::Float(v) => Ok(*v != 0.0),
        Value::Bool(v) => Ok(*v),
        Value::List(items) => Ok(!items.is_empty()),
    }
}

/// Value of a `range` bound.
pub fn range_bound(value: &Value) -> Result<i64, TraceError> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Bool(v) => Ok(i64::from(*v)),
        Value::Tensor(tensor) => tensor_to_i64(tensor),
        other => Err(TraceError::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            other.type_name()
        ))),
    }
}

/// Number of iterations of `range(start, end, step)` without materializing it.
pub fn range_len(start: i64, end: i64, step: i64) -> Result<u64, TraceError> {
    if step == 0 {
        return Err(TraceError::type_error("range() step must not be zero"));
    }
    let (span, step) = if step > 0 {
        (end as i128 - start as i128, step as i128)
    } else {
        (start as i128 - end as i128, -(step as i128))
    };
    if span <= 0 {
        return Ok(0);
    }
    Ok(((span + step - 1) / step) as u64)
}

pub fn len_of(value: &Value) -> Result<Value, TraceError> {
    match value {
        Value::Tensor(tensor) => match tensor.shape().first() {
            Some(dim) => Ok(Value::Int(*dim as i64)),
            None => Err(TraceError::type_error("len() of a 0-d tensor")),
        },
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        other => Err(TraceError::type_error(format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

/// Convert a single-element tensor to the matching host scalar.
pub fn item_of(value: &Value) -> Result<Value, TraceError> {
    let tensor = match value {
        Value::Tensor(tensor) => tensor,
        other => return Ok(other.clone()),
    };
    if tensor.len() != 1 {
        return Err(TraceError::type_error(format!(
            "only single-element tensors convert to scalars, got {} elements",
            tensor.len()
        )));
    }
    let dtype = tensor.dtype();
    let converted = if dtype == DType::Bool {
        tensor.get_i64(0).map(|v| Value::Bool(v != 0))
    } else if dtype.is_float() {
        tensor.get_f64(0).map(Value::Float)
    } else {
        tensor.get_i64(0).map(Value::Int)
    };
    converted.ok_or_else(|| TraceError::Internal("empty scalar tensor".to_string()))
}

/// Materialize a host scalar as a rank-0 tensor matching a tensor operand.
pub fn coerce_scalar(value: &Value, dtype: DType) -> Result<TensorValue, TraceError> {
    match value {
        Value::Tensor(tensor) => Ok(tensor.clone()),
        Value::Int(v) if dtype.is_numeric() => Ok(TensorValue::scalar_from_i64(dtype, *v)),
        Value::Bool(v) => Ok(TensorValue::scalar_from_i64(dtype, i64::from(*v))),
        Value::Float(v) => TensorValue::scalar_from_f64(dtype, *v).ok_or_else(|| {
            TraceError::type_error(format!("cannot combine a float with a {} tensor", dtype))
        }),
        other => Err(TraceError::type_error(format!(
            "cannot combine a {} with a {} tensor",
            other.type_name(),
            dtype
        ))),
    }
}

enum Num {
    Int(i64),
    Float(f64),
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(v) => Some(Num::Int(*v)),
        Value::Bool(v) => Some(Num::Int(i64::from(*v))),
        Value::Float(v) => Some(Num::Float(*v)),
        _ => None,
    }
}

fn unsupported(symbol: &str, lhs: &Value, rhs: &Value) -> TraceError {
    TraceError::type_error(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        symbol,
        lhs.type_name(),
        rhs.type_name()
    ))
}

/// Longest list host arithmetic may build.
const MAX_LIST_LEN: usize = 1 << 24;

/// Arithmetic on two host values.
pub fn host_binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, TraceError> {
    match (lhs, rhs, op) {
        (Value::List(a), Value::List(b), BinOp::Add) => {
            return Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Value::List(items), Value::Int(n), BinOp::Mul) | (Value::Int(n), Value::List(items), BinOp::Mul) => {
            let count = usize::try_from((*n).max(0)).unwrap_or(usize::MAX);
            let len = items
                .len()
                .checked_mul(count)
                .filter(|len| *len <= MAX_LIST_LEN)
                .ok_or_else(|| TraceError::type_error("repeated list is too long"))?;
            return Ok(Value::List(items.iter().cloned().cycle().take(len).collect()));
        }
        _ => {}
    }
    let (a, b) = match (as_num(lhs), as_num(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(op.symbol(), lhs, rhs)),
    };
    let overflow = || TraceError::type_error(format!("integer overflow in {}", op.symbol()));
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => match op {
            BinOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(overflow),
            BinOp::Div => float_binary(op, x as f64, y as f64),
        },
        (Num::Int(x), Num::Float(y)) => float_binary(op, x as f64, y),
        (Num::Float(x), Num::Int(y)) => float_binary(op, x, y as f64),
        (Num::Float(x), Num::Float(y)) => float_binary(op, x, y),
    }
}

fn float_binary(op: BinOp, x: f64, y: f64) -> Result<Value, TraceError> {
    Ok(Value::Float(match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(TraceError::type_error("division by zero"));
            }
            x / y
        }
    }))
}

/// Comparison of two host values.
pub fn host_compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, TraceError> {
    if let (Some(a), Some(b)) = (as_num(lhs), as_num(rhs)) {
        let ordering = match (a, b) {
            (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
            (Num::Int(x), Num::Float(y)) => (x as f64).partial_cmp(&y),
            (Num::Float(x), Num::Int(y)) => x.partial_cmp(&(y as f64)),
            (Num::Float(x), Num::Float(y)) => x.partial_cmp(&y),
        };
        let result = match ordering {
            None => op == CmpOp::Ne,
            Some(ord) => match op {
                CmpOp::Eq => ord.is_eq(),
                CmpOp::Ne => ord.is_ne(),
                CmpOp::Lt => ord.is_lt(),
                CmpOp::Le => ord.is_le(),
                CmpOp::Gt => ord.is_gt(),
                CmpOp::Ge => ord.is_ge(),
            },
        };
        return Ok(Value::Bool(result));
    }
    match op {
        CmpOp::Eq => Ok(Value::Bool(lhs == rhs)),
        CmpOp::Ne => Ok(Value::Bool(lhs != rhs)),
        _ => Err(unsupported(op.symbol(), lhs, rhs)),
    }
}

pub fn host_neg(value: &Value) -> Result<Value, TraceError> {
    match value {
        Value::Int(v) => v
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| TraceError::type_error("integer overflow in unary -")),
        Value::Bool(v) => Ok(Value::Int(-i64::from(*v))),
        Value::Float(v) => Ok(Value::Float(-v)),
        other => Err(TraceError::type_error(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

/// Tensor operands for an operator call. Host scalars take the dtype of
/// the first tensor argument, or their natural dtype when there is none.
pub fn coerce_args(args: &[Value]) -> Result<Vec<TensorValue>, TraceError> {
    let dtype = args.iter().find_map(|arg| arg.as_tensor().map(TensorValue::dtype));
    args.iter()
        .map(|arg| match dtype {
            Some(dtype) => coerce_scalar(arg, dtype),
            None => arg.to_tensor().ok_or_else(|| {
                TraceError::type_error(format!("a {} is not a tensor operand", arg.type_name()))
            }),
        })
        .collect()
}

/// Convert a function result to the tensor handed back to callers.
/// Host scalars become rank-0 tensors.
pub fn output_tensor(value: Value) -> Result<TensorValue, TraceError> {
    match value {
        Value::Tensor(tensor) => Ok(tensor),
        Value::List(_) => Err(TraceError::type_error("a list cannot be returned as a tensor")),
        other => other
            .to_tensor()
            .ok_or_else(|| TraceError::Internal("scalar conversion failed".to_string())),
    }
}
