//! Operand normalisation shared by the operator library.
//!
//! Operators see their operands as `Option<ProcessingValue>`: `None` when the
//! child expression produced nothing (absent variable, `null` expression),
//! `Some` with a `None` payload for a typed QTI NULL. Both count as NULL.
//!
//! `parse_operands` turns a heterogeneous operand list into one linear stream
//! of scalars, with `None` markers standing in for NULL operands. Values of
//! `multiple` containers are sorted so that multiset comparisons do not
//! depend on insertion order.

use qti_core::cast;
use qti_core::{BaseType, Cardinality, Data, ProcessingValue, Value, Variable};
use tracing::debug;

/// One operand as handed to an operator processor.
pub type Operand = Option<ProcessingValue>;

/// True when the operand is absent or holds the QTI NULL value.
pub fn is_null(operand: &Operand) -> bool {
    operand.as_ref().map_or(true, ProcessingValue::is_null)
}

pub fn any_null(operands: &[Operand]) -> bool {
    operands.iter().any(is_null)
}

/// Flatten operands one level into a scalar stream.
///
/// NULL operands become `None` markers; record operands contribute every
/// field in field-name order.
pub fn parse_operands(operands: &[Operand]) -> Vec<Option<Value>> {
    let mut out = Vec::new();
    for operand in operands {
        match operand {
            None => out.push(None),
            Some(pv) => parse_into(pv, &mut out),
        }
    }
    out
}

fn parse_into(pv: &ProcessingValue, out: &mut Vec<Option<Value>>) {
    match &pv.value {
        None => out.push(None),
        Some(Data::Record(fields)) => {
            for field in fields.values() {
                parse_into(field, out);
            }
        }
        Some(data) => {
            out.extend(
                parse_value(pv.cardinality, pv.base_type, data)
                    .into_iter()
                    .map(Some),
            );
        }
    }
}

/// Cast a payload's scalars to its base type and return them as a list,
/// sorting `multiple` containers.
pub fn parse_value(cardinality: Cardinality, base_type: Option<BaseType>, data: &Data) -> Vec<Value> {
    let mut values: Vec<Value> = data
        .values()
        .iter()
        .map(|v| match base_type {
            Some(bt) => cast_value(bt, v),
            None => v.clone(),
        })
        .collect();
    if cardinality == Cardinality::Multiple {
        sort_multiple(&mut values);
    }
    values
}

/// Values of a declared variable, normalised like any other operand.
pub fn parse_variable(variable: &Variable) -> Vec<Value> {
    match &variable.value {
        Some(data) => parse_value(variable.cardinality, variable.base_type, data),
        None => Vec::new(),
    }
}

/// Canonical order for multiset comparison. Stable, so equal elements keep
/// their relative order.
pub fn sort_multiple(values: &mut [Value]) {
    values.sort_by(|a, b| a.total_cmp(b));
}

/// Re-cast a scalar whose variant disagrees with its declared base type.
/// Structurally uncastable values are kept unchanged.
pub fn cast_value(base_type: BaseType, value: &Value) -> Value {
    let consistent = matches!(
        (base_type, value),
        (BaseType::Identifier, Value::Identifier(_))
            | (BaseType::Boolean, Value::Boolean(_))
            | (BaseType::Integer, Value::Integer(_))
            | (BaseType::Integer, Value::Float(_))
            | (BaseType::Float, Value::Float(_))
            | (BaseType::String, Value::String(_))
            | (BaseType::Point, Value::Point(..))
            | (BaseType::Pair, Value::Pair(..))
            | (BaseType::DirectedPair, Value::DirectedPair(..))
            | (BaseType::Duration, Value::Duration(_))
            | (BaseType::File, Value::File(_))
            | (BaseType::Uri, Value::Uri(_))
            | (BaseType::IntOrIdentifier, Value::Integer(_))
            | (BaseType::IntOrIdentifier, Value::Identifier(_))
    );
    if consistent {
        return value.clone();
    }
    match (base_type, value) {
        (BaseType::Float, Value::Integer(i)) => Value::Float(*i as f64),
        _ => cast::cast_str(base_type, &value.to_string()).unwrap_or_else(|_| value.clone()),
    }
}

// ──────────────────────────────────────────────
// Numeric view
// ──────────────────────────────────────────────

/// A finite numeric operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// True for integers and finite floats.
pub fn is_number(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite(),
        _ => false,
    }
}

/// `parse_operands` restricted to finite numbers. NaN, infinities, nulls
/// and non-numeric scalars are dropped silently.
pub fn map_numbers(operands: &[Operand]) -> Vec<Number> {
    let parsed = parse_operands(operands);
    let total = parsed.len();
    let numbers: Vec<Number> = parsed
        .into_iter()
        .flatten()
        .filter(is_number)
        .filter_map(|v| match v {
            Value::Integer(i) => Some(Number::Int(i)),
            Value::Float(f) => Some(Number::Float(f)),
            _ => None,
        })
        .collect();
    if numbers.len() < total {
        debug!(
            dropped = total - numbers.len(),
            "filtered non-numeric or non-finite operands"
        );
    }
    numbers
}

/// True when every non-null operand is declared `integer`.
pub fn all_integer(operands: &[Operand]) -> bool {
    operands
        .iter()
        .flatten()
        .all(|pv| pv.base_type == Some(BaseType::Integer))
}
