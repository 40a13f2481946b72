//! Operator semantics
//!
//! Best-effort arithmetic: ints promote to floats, `+` concatenates strings
//! and lists, `str * int` repeats. Everything else is a type error.

use std::cmp::Ordering;

use crate::frontend::parser::ast::BinOp;
use crate::runtime::error::ScriptError;
use crate::runtime::value::Value;

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Neq => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
    }
}

fn mismatch(
    op: BinOp,
    left: &Value,
    right: &Value,
) -> ScriptError {
    ScriptError::TypeMismatch {
        op: op_symbol(op),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Both operands as numbers, kept integral when both are ints
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(
    left: &Value,
    right: &Value,
) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Numbers::Ints(*a, *b)),
        (Value::Str(_), _) | (_, Value::Str(_)) => None,
        _ => Some(Numbers::Floats(left.as_f64()?, right.as_f64()?)),
    }
}

/// Longest string or list an operator may build
pub const MAX_SEQUENCE_LEN: usize = 1_000_000;

fn checked_len(len: Option<usize>) -> Result<usize, ScriptError> {
    match len {
        Some(len) if len <= MAX_SEQUENCE_LEN => Ok(len),
        _ => Err(ScriptError::TooLarge(MAX_SEQUENCE_LEN)),
    }
}

fn repeat<T: Clone>(
    items: &[T],
    times: i64,
) -> Result<Vec<T>, ScriptError> {
    let times = usize::try_from(times).unwrap_or(0);
    let mut out = Vec::with_capacity(checked_len(items.len().checked_mul(times))?);
    for _ in 0..times {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn concat<T: Clone>(
    a: &[T],
    b: &[T],
) -> Result<Vec<T>, ScriptError> {
    checked_len(a.len().checked_add(b.len()))?;
    Ok([a, b].concat())
}

/// Evaluate a non-short-circuit binary operator
pub fn binary(
    op: BinOp,
    left: &Value,
    right: &Value,
) -> Result<Value, ScriptError> {
    match op {
        BinOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinOp::Neq => Ok(Value::Bool(!values_equal(left, right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = compare(left, right).ok_or_else(|| mismatch(op, left, right))?;
            let holds = match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::Bool(holds))
        }
        BinOp::Add => match (left, right) {
            (Value::Str(a), Value::Str(b)) => {
                checked_len(a.chars().count().checked_add(b.chars().count()))?;
                Ok(Value::Str(format!("{}{}", a, b)))
            }
            (Value::List(a), Value::List(b)) => Ok(Value::List(concat(a, b)?)),
            _ => arithmetic(op, left, right),
        },
        BinOp::Mul => match (left, right) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::Str(repeat(&chars, *n)?.into_iter().collect()))
            }
            (Value::List(items), Value::Int(n)) | (Value::Int(n), Value::List(items)) => {
                Ok(Value::List(repeat(items, *n)?))
            }
            _ => arithmetic(op, left, right),
        },
        BinOp::Sub | BinOp::Div | BinOp::FloorDiv | BinOp::Mod => arithmetic(op, left, right),
        // short-circuit operators are evaluated by the interpreter
        BinOp::And | BinOp::Or => Err(mismatch(op, left, right)),
    }
}

fn arithmetic(
    op: BinOp,
    left: &Value,
    right: &Value,
) -> Result<Value, ScriptError> {
    match numbers(left, right).ok_or_else(|| mismatch(op, left, right))? {
        Numbers::Ints(a, b) => int_arithmetic(op, a, b),
        Numbers::Floats(a, b) => float_arithmetic(op, a, b).map(Value::Float),
    }
}

fn int_arithmetic(
    op: BinOp,
    a: i64,
    b: i64,
) -> Result<Value, ScriptError> {
    let value = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            // floor division rounds toward negative infinity
            match (a.checked_div(b), a.checked_rem(b)) {
                (Some(q), Some(r)) if r != 0 && ((a < 0) != (b < 0)) => Some(q - 1),
                (Some(q), Some(_)) => Some(q),
                _ => None,
            }
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(ScriptError::DivisionByZero);
            }
            a.checked_rem(b).map(|r| {
                if r != 0 && ((r < 0) != (b < 0)) {
                    r + b
                } else {
                    r
                }
            })
        }
        _ => None,
    };
    value.map(Value::Int).ok_or(ScriptError::Overflow)
}

fn float_arithmetic(
    op: BinOp,
    a: f64,
    b: f64,
) -> Result<f64, ScriptError> {
    if matches!(op, BinOp::Div | BinOp::FloorDiv | BinOp::Mod) && b == 0.0 {
        return Err(ScriptError::DivisionByZero);
    }
    Ok(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => a - b * (a / b).floor(),
        _ => f64::NAN,
    })
}

/// Equality with int/float promotion
pub fn values_equal(
    left: &Value,
    right: &Value,
) -> bool {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            compare(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

/// Ordering of numbers, strings and lists
pub fn compare(
    left: &Value,
    right: &Value,
) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        (Value::Str(_), _) | (_, Value::Str(_)) => None,
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

pub fn negate(value: &Value) -> Result<Value, ScriptError> {
    match value {
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(ScriptError::Overflow),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Bool(b) => Ok(Value::Int(-(*b as i64))),
        other => Err(ScriptError::BadOperand {
            op: "-",
            operand: other.type_name(),
        }),
    }
}

/// `container[index]`; negative list indices count from the end
pub fn index(
    container: &Value,
    index: &Value,
) -> Result<Value, ScriptError> {
    let bad = || ScriptError::BadIndex {
        container: container.type_name(),
        index: index.type_name(),
    };
    match container {
        Value::List(items) => {
            let i = index.as_i64().ok_or_else(bad)?;
            let pos = resolve_index(i, items.len())?;
            Ok(items[pos].clone())
        }
        Value::Str(s) => {
            let i = index.as_i64().ok_or_else(bad)?;
            let chars: Vec<char> = s.chars().collect();
            let pos = resolve_index(i, chars.len())?;
            Ok(Value::Str(chars[pos].to_string()))
        }
        Value::Map(entries) => {
            let key = index.as_str().ok_or_else(bad)?;
            entries
                .get(key)
                .cloned()
                .ok_or_else(|| ScriptError::KeyNotFound(key.to_string()))
        }
        _ => Err(bad()),
    }
}

fn resolve_index(
    index: i64,
    len: usize,
) -> Result<usize, ScriptError> {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let pos = if index < 0 { index + len_i } else { index };
    if pos < 0 || pos >= len_i {
        return Err(ScriptError::IndexOutOfRange { index, len });
    }
    usize::try_from(pos).map_err(|_| ScriptError::IndexOutOfRange { index, len })
}

/// Items a `for` loop walks over
pub fn iterate(value: &Value) -> Result<Vec<Value>, ScriptError> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Map(entries) => Ok(entries.keys().map(|k| Value::Str(k.clone())).collect()),
        other => Err(ScriptError::NotIterable(other.type_name())),
    }
}
