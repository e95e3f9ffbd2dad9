//! Container operators.
//!
//! `multiple`, `ordered` and `repeat` drop NULL operands instead of
//! propagating them, and `containerSize` counts a NULL container as 0.
//! Every other operator here follows the general null rule. A container
//! result with no elements is NULL.

use qti_core::{BaseType, Cardinality, ProcessingValue, Value};

use super::compare::values_match;
use super::{boolean, common_base_type, null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::Operand;

fn build(ctx: &OperatorContext<'_>, cardinality: Cardinality, times: usize) -> Result<Operand, EvalError> {
    let base_type = common_base_type(ctx)?;
    let mut values = Vec::new();
    for _ in 0..times {
        for pv in ctx.operands.iter().flatten() {
            values.extend(pv.values().iter().cloned());
        }
    }
    Ok(Some(match base_type {
        Some(bt) => ProcessingValue::container(cardinality, bt, values),
        None => ProcessingValue::null(cardinality, None),
    }))
}

pub fn multiple(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    build(ctx, Cardinality::Multiple, 1)
}

pub fn ordered(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    build(ctx, Cardinality::Ordered, 1)
}

/// Largest container `repeat` will build.
pub const MAX_REPEAT_LEN: usize = 1 << 20;

/// Concatenate the operands `numberRepeats` times into an ordered container.
pub fn repeat(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let times = attributes::require(
        expr,
        "numberRepeats",
        attributes::integer(expr, ctx.state, "numberRepeats")?,
    )?;
    if times < 1 {
        let base_type = common_base_type(ctx)?;
        return Ok(Some(ProcessingValue::null(Cardinality::Ordered, base_type)));
    }
    let per_pass: usize = ctx.operands.iter().flatten().map(|pv| pv.values().len()).sum();
    let within_limit = usize::try_from(times)
        .ok()
        .and_then(|t| t.checked_mul(per_pass))
        .is_some_and(|len| len <= MAX_REPEAT_LEN);
    if !within_limit {
        return Err(EvalError::InvalidAttribute {
            tag: expr.tag.clone(),
            attribute: "numberRepeats".to_string(),
            message: format!(
                "{} repeats would exceed {} elements",
                times, MAX_REPEAT_LEN
            ),
        });
    }
    build(ctx, Cardinality::Ordered, times as usize)
}

pub fn container_size(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let size = ctx.operand(0).map_or(0, |pv| pv.values().len());
    Ok(Some(ProcessingValue::integer(size as i64)))
}

pub fn member(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    common_base_type(ctx)?;
    let (Some(item), Some(container)) = (
        ctx.operand(0).and_then(|pv| pv.as_single()),
        ctx.operand(1),
    ) else {
        return Ok(null_single(BaseType::Boolean));
    };
    Ok(boolean(container.values().iter().any(|v| v.matches(item))))
}

/// `ordered` containers must hold the second operand as a contiguous run;
/// `multiple` containers as a sub-multiset.
pub fn contains(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    common_base_type(ctx)?;
    let (Some(haystack), Some(needle)) = (ctx.operand(0), ctx.operand(1)) else {
        return Ok(null_single(BaseType::Boolean));
    };
    if haystack.cardinality != needle.cardinality {
        return Err(EvalError::validation(
            ctx.tag(),
            format!(
                "operands must share cardinality, found {} and {}",
                haystack.cardinality, needle.cardinality
            ),
        ));
    }
    let hay = haystack.values();
    let sub = needle.values();
    let found = match haystack.cardinality {
        _ if sub.is_empty() => true,
        Cardinality::Ordered => hay
            .windows(sub.len())
            .any(|w| w.iter().zip(sub).all(|(a, b)| a.matches(b))),
        _ => {
            let mut remaining: Vec<&Value> = hay.iter().collect();
            sub.iter().all(|wanted| {
                match remaining.iter().position(|v| v.matches(wanted)) {
                    Some(i) => {
                        remaining.swap_remove(i);
                        true
                    }
                    None => false,
                }
            })
        }
    };
    Ok(boolean(found))
}

/// Remove every occurrence of the first operand from the container.
pub fn delete(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let base_type = common_base_type(ctx)?;
    let cardinality = ctx
        .operands
        .get(1)
        .and_then(|o| o.as_ref())
        .map_or(Cardinality::Multiple, |pv| pv.cardinality);
    let (Some(item), Some(container), Some(bt)) = (
        ctx.operand(0).and_then(|pv| pv.as_single()),
        ctx.operand(1),
        base_type,
    ) else {
        return Ok(Some(ProcessingValue::null(cardinality, base_type)));
    };
    let kept = container
        .values()
        .iter()
        .filter(|v| !v.matches(item))
        .cloned()
        .collect();
    Ok(Some(ProcessingValue::container(container.cardinality, bt, kept)))
}

/// The `n`-th element (1-based) of an ordered container.
pub fn index(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let n = attributes::require(expr, "n", attributes::integer(expr, ctx.state, "n")?)?;
    let base_type = ctx
        .operands
        .first()
        .and_then(|o| o.as_ref())
        .and_then(|pv| pv.base_type);
    let null = Some(ProcessingValue::null(Cardinality::Single, base_type));
    let Some(container) = ctx.operand(0) else {
        return Ok(null);
    };
    let (Some(bt), Ok(position)) = (base_type, usize::try_from(n)) else {
        return Ok(null);
    };
    match position.checked_sub(1).and_then(|i| container.values().get(i)) {
        Some(v) => Ok(Some(ProcessingValue::single(bt, v.clone()))),
        None => Ok(null),
    }
}

pub fn field_value(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let field = attributes::required(ctx.expression, "fieldIdentifier")?;
    Ok(ctx
        .operand(0)
        .and_then(|pv| pv.fields())
        .and_then(|fields| fields.get(field))
        .cloned()
        .or_else(|| Some(ProcessingValue::null(Cardinality::Single, None))))
}

/// One element picked uniformly from the container.
#[cfg(feature = "random")]
pub fn random(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    use rand::seq::SliceRandom;

    let Some(container) = ctx.operand(0) else {
        let base_type = ctx.operands.first().and_then(|o| o.as_ref()).and_then(|pv| pv.base_type);
        return Ok(Some(ProcessingValue::null(Cardinality::Single, base_type)));
    };
    let picked = container.values().choose(&mut rand::thread_rng()).cloned();
    Ok(Some(match (picked, container.base_type) {
        (Some(v), Some(bt)) => ProcessingValue::single(bt, v),
        (_, bt) => ProcessingValue::null(Cardinality::Single, bt),
    }))
}
