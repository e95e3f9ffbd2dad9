//! Typed access to expression attributes.
//!
//! Numeric and string attributes may reference a session variable with the
//! `{IDENTIFIER}` form; the reference resolves to that variable's current
//! single value.

use qti_core::{ExpressionNode, SessionState, Value};

use crate::error::EvalError;

fn invalid(expr: &ExpressionNode, attribute: &str, message: impl Into<String>) -> EvalError {
    EvalError::InvalidAttribute {
        tag: expr.tag.clone(),
        attribute: attribute.to_string(),
        message: message.into(),
    }
}

/// Raw attribute text, failing when absent.
pub fn required<'a>(expr: &'a ExpressionNode, name: &str) -> Result<&'a str, EvalError> {
    expr.attribute(name)
        .ok_or_else(|| invalid(expr, name, "attribute is required"))
}

/// Turn an optional typed attribute into a required one.
pub fn require<T>(expr: &ExpressionNode, name: &str, value: Option<T>) -> Result<T, EvalError> {
    value.ok_or_else(|| invalid(expr, name, "attribute is required"))
}

/// Returns the referenced identifier when `raw` has the `{IDENT}` form.
fn variable_ref(raw: &str) -> Option<&str> {
    raw.trim()
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .map(str::trim)
}

fn referenced_value(
    expr: &ExpressionNode,
    state: &SessionState,
    name: &str,
    identifier: &str,
) -> Result<Value, EvalError> {
    state
        .get(identifier)
        .and_then(|var| var.to_processing_value().as_single().cloned())
        .ok_or_else(|| {
            invalid(
                expr,
                name,
                format!("referenced variable '{}' has no single value", identifier),
            )
        })
}

/// Attribute text after resolving a variable reference.
pub fn string(
    expr: &ExpressionNode,
    state: &SessionState,
    name: &str,
) -> Result<Option<String>, EvalError> {
    let Some(raw) = expr.attribute(name) else {
        return Ok(None);
    };
    match variable_ref(raw) {
        Some(id) => Ok(Some(referenced_value(expr, state, name, id)?.to_string())),
        None => Ok(Some(raw.to_string())),
    }
}

pub fn integer(
    expr: &ExpressionNode,
    state: &SessionState,
    name: &str,
) -> Result<Option<i64>, EvalError> {
    let Some(raw) = expr.attribute(name) else {
        return Ok(None);
    };
    if let Some(id) = variable_ref(raw) {
        return match referenced_value(expr, state, name, id)? {
            Value::Integer(i) => Ok(Some(i)),
            other => Err(invalid(
                expr,
                name,
                format!("referenced variable '{}' is {}", id, other.type_name()),
            )),
        };
    }
    raw.trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|_| invalid(expr, name, format!("'{}' is not an integer", raw)))
}

pub fn float(
    expr: &ExpressionNode,
    state: &SessionState,
    name: &str,
) -> Result<Option<f64>, EvalError> {
    let Some(raw) = expr.attribute(name) else {
        return Ok(None);
    };
    if let Some(id) = variable_ref(raw) {
        let value = referenced_value(expr, state, name, id)?;
        return value.as_f64().map(Some).ok_or_else(|| {
            invalid(
                expr,
                name,
                format!("referenced variable '{}' is {}", id, value.type_name()),
            )
        });
    }
    qti_core::cast::parse_float(raw)
        .map(Some)
        .ok_or_else(|| invalid(expr, name, format!("'{}' is not a number", raw)))
}

/// Whitespace-separated list of numbers, each optionally a variable reference.
pub fn float_list(
    expr: &ExpressionNode,
    state: &SessionState,
    name: &str,
) -> Result<Option<Vec<f64>>, EvalError> {
    let Some(raw) = expr.attribute(name) else {
        return Ok(None);
    };
    let mut out = Vec::new();
    for part in raw.split_whitespace() {
        let value = match variable_ref(part) {
            Some(id) => {
                let v = referenced_value(expr, state, name, id)?;
                v.as_f64().ok_or_else(|| {
                    invalid(expr, name, format!("referenced variable '{}' is not numeric", id))
                })?
            }
            None => qti_core::cast::parse_float(part)
                .ok_or_else(|| invalid(expr, name, format!("'{}' is not a number", part)))?,
        };
        out.push(value);
    }
    Ok(Some(out))
}

pub fn boolean(expr: &ExpressionNode, name: &str, default: bool) -> Result<bool, EvalError> {
    match expr.attribute(name).map(str::trim) {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(invalid(expr, name, format!("'{}' is not a boolean", other))),
    }
}
