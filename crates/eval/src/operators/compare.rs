//! Comparison operators: `equal`, `equalRounded`, `lt`, `gt`, `lte`, `gte`,
//! `durationLT`, `durationGTE` and `match`.

use qti_core::{BaseType, Cardinality, ProcessingValue, Value};

use super::rounding::{round_with_mode, rounding_attributes};
use super::{boolean, null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::{parse_value, Operand};

// ──────────────────────────────────────────────
// Numeric comparison
// ──────────────────────────────────────────────

/// Both operands as numbers, or `None` when either is NULL or NaN.
fn number_pair(ctx: &OperatorContext<'_>) -> Option<(f64, f64)> {
    let a = ctx.operand(0)?.as_single()?.as_f64()?;
    let b = ctx.operand(1)?.as_single()?.as_f64()?;
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some((a, b))
}

fn compare_numbers(
    ctx: &OperatorContext<'_>,
    test: impl Fn(f64, f64) -> bool,
) -> Result<Operand, EvalError> {
    match number_pair(ctx) {
        Some((a, b)) => Ok(boolean(test(a, b))),
        None => Ok(null_single(BaseType::Boolean)),
    }
}

pub fn lt(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_numbers(ctx, |a, b| a < b)
}

pub fn gt(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_numbers(ctx, |a, b| a > b)
}

pub fn lte(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_numbers(ctx, |a, b| a <= b)
}

pub fn gte(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_numbers(ctx, |a, b| a >= b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToleranceMode {
    Exact,
    Absolute,
    Relative,
}

/// `equal` with `toleranceMode` `exact` (default), `absolute` or `relative`.
///
/// `tolerance` holds one or two values; the second, when present, widens
/// the upper side. Relative tolerances are percentages of the first
/// operand.
pub fn equal(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let mode = match expr.attribute("toleranceMode") {
        None | Some("exact") => ToleranceMode::Exact,
        Some("absolute") => ToleranceMode::Absolute,
        Some("relative") => ToleranceMode::Relative,
        Some(other) => {
            return Err(EvalError::InvalidAttribute {
                tag: expr.tag.clone(),
                attribute: "toleranceMode".to_string(),
                message: format!("unknown tolerance mode '{}'", other),
            })
        }
    };
    let Some((x, y)) = number_pair(ctx) else {
        return Ok(null_single(BaseType::Boolean));
    };
    if mode == ToleranceMode::Exact {
        return Ok(boolean(x == y));
    }

    let tolerance = attributes::require(
        expr,
        "tolerance",
        attributes::float_list(expr, ctx.state, "tolerance")?,
    )?;
    let (t0, t1) = match tolerance.as_slice() {
        [t] => (*t, *t),
        [t0, t1] => (*t0, *t1),
        _ => {
            return Err(EvalError::InvalidAttribute {
                tag: expr.tag.clone(),
                attribute: "tolerance".to_string(),
                message: "expected one or two values".to_string(),
            })
        }
    };
    let include_lower = attributes::boolean(expr, "includeLowerBound", true)?;
    let include_upper = attributes::boolean(expr, "includeUpperBound", true)?;

    let (lower, upper) = match mode {
        ToleranceMode::Absolute => (x - t0, x + t1),
        _ => (x * (1.0 - t0 / 100.0), x * (1.0 + t1 / 100.0)),
    };
    let above = if include_lower { y >= lower } else { y > lower };
    let below = if include_upper { y <= upper } else { y < upper };
    Ok(boolean(above && below))
}

pub fn equal_rounded(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let (mode, figures) = rounding_attributes(ctx.expression, ctx.state)?;
    match number_pair(ctx) {
        Some((a, b)) => Ok(boolean(
            round_with_mode(a, mode, figures) == round_with_mode(b, mode, figures),
        )),
        None => Ok(null_single(BaseType::Boolean)),
    }
}

// ──────────────────────────────────────────────
// Durations
// ──────────────────────────────────────────────

fn compare_durations(
    ctx: &OperatorContext<'_>,
    test: impl Fn(time::Duration, time::Duration) -> bool,
) -> Result<Operand, EvalError> {
    let a = ctx.operand(0).and_then(|pv| pv.as_single()).and_then(Value::as_duration);
    let b = ctx.operand(1).and_then(|pv| pv.as_single()).and_then(Value::as_duration);
    match (a, b) {
        (Some(a), Some(b)) => Ok(boolean(test(a, b))),
        _ => Ok(null_single(BaseType::Boolean)),
    }
}

pub fn duration_lt(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_durations(ctx, |a, b| a < b)
}

pub fn duration_gte(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    compare_durations(ctx, |a, b| a >= b)
}

// ──────────────────────────────────────────────
// match
// ──────────────────────────────────────────────

/// Structural QTI equality of two non-null values of the same shape.
///
/// `multiple` compares as a multiset, `ordered` element by element and
/// `record` field by field.
pub fn values_match(a: &ProcessingValue, b: &ProcessingValue) -> bool {
    if a.cardinality != b.cardinality {
        return false;
    }
    match (&a.value, &b.value) {
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
        (Some(da), Some(db)) => {
            if a.cardinality == Cardinality::Record {
                let (Some(fa), Some(fb)) = (a.fields(), b.fields()) else {
                    return false;
                };
                return fa.len() == fb.len()
                    && fa
                        .iter()
                        .all(|(k, v)| fb.get(k).is_some_and(|w| values_match(v, w)));
            }
            let left = parse_value(a.cardinality, a.base_type, da);
            let right = parse_value(b.cardinality, b.base_type, db);
            left.len() == right.len() && left.iter().zip(&right).all(|(x, y)| x.matches(y))
        }
    }
}

pub fn match_op(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let (Some(a), Some(b)) = (ctx.operand(0), ctx.operand(1)) else {
        return Ok(null_single(BaseType::Boolean));
    };
    if a.cardinality != b.cardinality || a.base_type != b.base_type {
        return Err(EvalError::validation(
            ctx.tag(),
            format!(
                "operands must share cardinality and baseType, found {} {:?} and {} {:?}",
                a.cardinality, a.base_type, b.cardinality, b.base_type
            ),
        ));
    }
    Ok(boolean(values_match(a, b)))
}
