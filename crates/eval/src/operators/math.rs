//! `mathOperator` and `statsOperator`.
//!
//! Both select their function with the `name` attribute. A result that is
//! undefined for the given input (NaN or an overflow to infinity) is NULL.

use qti_core::{BaseType, ProcessingValue, Value};

use super::{null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::{map_numbers, Number, Operand};

fn unknown_name(ctx: &OperatorContext<'_>, name: &str) -> EvalError {
    EvalError::InvalidAttribute {
        tag: ctx.tag().to_string(),
        attribute: "name".to_string(),
        message: format!("unknown function '{}'", name),
    }
}

fn float_result(f: f64) -> Operand {
    if f.is_finite() {
        Some(ProcessingValue::float(f))
    } else {
        null_single(BaseType::Float)
    }
}

fn integer_result(f: f64) -> Operand {
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(ProcessingValue::integer(f as i64))
    } else {
        null_single(BaseType::Integer)
    }
}

fn argument(ctx: &OperatorContext<'_>, index: usize) -> Option<f64> {
    ctx.operand(index)?
        .as_single()?
        .as_f64()
        .filter(|f| !f.is_nan())
}

pub fn math_operator(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let name = attributes::required(ctx.expression, "name")?;
    let integral = matches!(name, "floor" | "ceil" | "signum");
    let result_type = if integral { BaseType::Integer } else { BaseType::Float };

    if name == "atan2" {
        return Ok(match (argument(ctx, 0), argument(ctx, 1)) {
            (Some(y), Some(x)) => float_result(y.atan2(x)),
            _ => null_single(BaseType::Float),
        });
    }
    let Some(x) = argument(ctx, 0) else {
        // Validate the name even when the operand is NULL.
        return if is_known(name) {
            Ok(null_single(result_type))
        } else {
            Err(unknown_name(ctx, name))
        };
    };

    let value = match name {
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "sec" => 1.0 / x.cos(),
        "csc" => 1.0 / x.sin(),
        "cot" => 1.0 / x.tan(),
        "asin" => x.asin(),
        "acos" => x.acos(),
        "atan" => x.atan(),
        "asec" => (1.0 / x).acos(),
        "acsc" => (1.0 / x).asin(),
        "acot" => (1.0 / x).atan(),
        "sinh" => x.sinh(),
        "cosh" => x.cosh(),
        "tanh" => x.tanh(),
        "sech" => 1.0 / x.cosh(),
        "csch" => 1.0 / x.sinh(),
        "coth" => 1.0 / x.tanh(),
        "log" => x.log10(),
        "ln" => x.ln(),
        "exp" => x.exp(),
        "abs" => {
            if let Some(Value::Integer(i)) = ctx.operand(0).and_then(|pv| pv.as_single()) {
                return Ok(i
                    .checked_abs()
                    .map(|a| Some(ProcessingValue::integer(a)))
                    .unwrap_or_else(|| null_single(BaseType::Integer)));
            }
            x.abs()
        }
        "signum" => {
            if x == 0.0 {
                0.0
            } else {
                x.signum()
            }
        }
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "toDegrees" => x.to_degrees(),
        "toRadians" => x.to_radians(),
        other => return Err(unknown_name(ctx, other)),
    };
    Ok(if integral {
        integer_result(value)
    } else {
        float_result(value)
    })
}

const MATH_FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "sec", "csc", "cot", "asin", "acos", "atan", "atan2", "asec", "acsc",
    "acot", "sinh", "cosh", "tanh", "sech", "csch", "coth", "log", "ln", "exp", "abs", "signum",
    "floor", "ceil", "toDegrees", "toRadians",
];

fn is_known(name: &str) -> bool {
    MATH_FUNCTIONS.contains(&name)
}

// ──────────────────────────────────────────────
// Statistics
// ──────────────────────────────────────────────

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn squared_deviations(samples: &[f64]) -> f64 {
    let m = mean(samples);
    samples.iter().map(|x| (x - m) * (x - m)).sum()
}

/// Descriptive statistics over the finite numbers of one container.
///
/// `mean` and the population statistics need one sample; the sample
/// statistics need two. Fewer samples give NULL.
pub fn stats_operator(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let name = attributes::required(ctx.expression, "name")?;
    if !matches!(
        name,
        "mean" | "sampleVariance" | "sampleSD" | "popVariance" | "popSD"
    ) {
        return Err(unknown_name(ctx, name));
    }
    if ctx.any_null() {
        return Ok(null_single(BaseType::Float));
    }
    let samples: Vec<f64> = map_numbers(ctx.operands)
        .into_iter()
        .map(Number::as_f64)
        .collect();
    let n = samples.len();
    let required = if name.starts_with("sample") { 2 } else { 1 };
    if n < required {
        return Ok(null_single(BaseType::Float));
    }
    let value = match name {
        "mean" => mean(&samples),
        "sampleVariance" => squared_deviations(&samples) / (n - 1) as f64,
        "sampleSD" => (squared_deviations(&samples) / (n - 1) as f64).sqrt(),
        "popVariance" => squared_deviations(&samples) / n as f64,
        _ => (squared_deviations(&samples) / n as f64).sqrt(),
    };
    Ok(float_result(value))
}
