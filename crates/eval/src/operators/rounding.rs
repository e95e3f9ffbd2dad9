//! `round`, `truncate` and `roundTo`, plus the precision helpers used by
//! `equalRounded`.
//!
//! `round` rounds half away from zero. `roundTo` works in decimal
//! arithmetic (`rust_decimal`) so literals such as 2.675 round the way they
//! read instead of the way their binary approximation does. Infinities pass
//! through unchanged; NaN yields NULL.

use qti_core::{BaseType, ExpressionNode, SessionState, Value};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use super::{null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::Operand;
use qti_core::ProcessingValue;

/// How `roundTo`/`equalRounded` interpret their `figures` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    SignificantFigures,
    DecimalPlaces,
}

/// Read `roundingMode` (default `significantFigures`) and `figures`.
pub fn rounding_attributes(
    expr: &ExpressionNode,
    state: &SessionState,
) -> Result<(RoundingMode, u32), EvalError> {
    let mode = match expr.attribute("roundingMode") {
        None | Some("significantFigures") => RoundingMode::SignificantFigures,
        Some("decimalPlaces") => RoundingMode::DecimalPlaces,
        Some(other) => {
            return Err(EvalError::InvalidAttribute {
                tag: expr.tag.clone(),
                attribute: "roundingMode".to_string(),
                message: format!("unknown rounding mode '{}'", other),
            })
        }
    };
    let figures = attributes::require(expr, "figures", attributes::integer(expr, state, "figures")?)?;
    let minimum = match mode {
        RoundingMode::SignificantFigures => 1,
        RoundingMode::DecimalPlaces => 0,
    };
    if figures < minimum || figures > 28 {
        return Err(EvalError::InvalidAttribute {
            tag: expr.tag.clone(),
            attribute: "figures".to_string(),
            message: format!("{} is out of range for {:?}", figures, mode),
        });
    }
    Ok((mode, figures as u32))
}

/// Round a finite value to the given precision, half away from zero.
pub fn round_with_mode(value: f64, mode: RoundingMode, figures: u32) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    let decimal = Decimal::from_f64(value).and_then(|d| match mode {
        RoundingMode::DecimalPlaces => {
            Some(d.round_dp_with_strategy(figures, RoundingStrategy::MidpointAwayFromZero))
        }
        RoundingMode::SignificantFigures => {
            d.round_sf_with_strategy(figures, RoundingStrategy::MidpointAwayFromZero)
        }
    });
    match decimal.and_then(|d| d.to_f64()) {
        Some(rounded) => rounded,
        // Outside Decimal's range: scale in binary floating point instead.
        None => {
            let exponent = match mode {
                RoundingMode::DecimalPlaces => figures as i32,
                RoundingMode::SignificantFigures => {
                    figures as i32 - 1 - value.abs().log10().floor() as i32
                }
            };
            let scale = 10f64.powi(exponent);
            (value * scale).round() / scale
        }
    }
}

fn single_number(ctx: &OperatorContext<'_>) -> Option<f64> {
    ctx.operand(0)
        .and_then(|pv| pv.as_single())
        .and_then(|v| v.as_f64())
}

/// Integer result for finite input, unchanged float for infinities.
fn integral_result(ctx: &OperatorContext<'_>, value: f64) -> Result<Operand, EvalError> {
    if value.is_nan() {
        return Ok(null_single(BaseType::Integer));
    }
    if value.is_infinite() {
        return Ok(Some(ProcessingValue::float(value)));
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(EvalError::Overflow {
            operator: ctx.tag().to_string(),
        });
    }
    Ok(Some(ProcessingValue::integer(value as i64)))
}

/// Integers pass through exactly; floats go through `op` and back.
fn integral(ctx: &OperatorContext<'_>, op: fn(f64) -> f64) -> Result<Operand, EvalError> {
    match ctx.operand(0).and_then(|pv| pv.as_single()) {
        Some(Value::Integer(i)) => Ok(Some(ProcessingValue::integer(*i))),
        Some(v) => match v.as_f64() {
            Some(x) => integral_result(ctx, op(x)),
            None => Ok(null_single(BaseType::Integer)),
        },
        None => Ok(null_single(BaseType::Integer)),
    }
}

pub fn round(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    integral(ctx, f64::round)
}

pub fn truncate(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    integral(ctx, f64::trunc)
}

pub fn round_to(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let (mode, figures) = rounding_attributes(ctx.expression, ctx.state)?;
    match single_number(ctx) {
        Some(x) if x.is_nan() => Ok(null_single(BaseType::Float)),
        Some(x) => Ok(Some(ProcessingValue::float(round_with_mode(x, mode, figures)))),
        None => Ok(null_single(BaseType::Float)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::*;

    #[test]
    fn round_half_away_from_zero() {
        let n = node("round");
        assert_eq!(
            single_value(&call(round, &n, vec![float(2.5)]).unwrap()),
            Some(Value::Integer(3))
        );
        assert_eq!(
            single_value(&call(round, &n, vec![float(-2.5)]).unwrap()),
            Some(Value::Integer(-3))
        );
        assert_eq!(
            single_value(&call(round, &n, vec![float(-2.4)]).unwrap()),
            Some(Value::Integer(-2))
        );
        assert_eq!(
            single_value(&call(round, &n, vec![int(7)]).unwrap()),
            Some(Value::Integer(7))
        );
    }

    #[test]
    fn integers_are_rounded_exactly() {
        let cases: [(&str, crate::operators::OperatorFn); 2] = [("round", round), ("truncate", truncate)];
        for (tag, process) in cases {
            let n = node(tag);
            assert_eq!(
                single_value(&call(process, &n, vec![int(9_007_199_254_740_993)]).unwrap()),
                Some(Value::Integer(9_007_199_254_740_993))
            );
            assert_eq!(
                single_value(&call(process, &n, vec![int(i64::MAX)]).unwrap()),
                Some(Value::Integer(i64::MAX))
            );
        }
    }

    #[test]
    fn round_passes_infinity_through() {
        let n = node("round");
        assert_eq!(
            single_value(&call(round, &n, vec![float(f64::INFINITY)]).unwrap()),
            Some(Value::Float(f64::INFINITY))
        );
        assert_eq!(
            single_value(&call(round, &n, vec![float(f64::NEG_INFINITY)]).unwrap()),
            Some(Value::Float(f64::NEG_INFINITY))
        );
    }

    #[test]
    fn round_nan_and_null() {
        let n = node("round");
        assert!(is_null_result(&call(round, &n, vec![float(f64::NAN)]).unwrap()));
        assert!(is_null_result(&call(round, &n, vec![None]).unwrap()));
    }

    #[test]
    fn truncate_toward_zero() {
        let n = node("truncate");
        assert_eq!(
            single_value(&call(truncate, &n, vec![float(-3.9)]).unwrap()),
            Some(Value::Integer(-3))
        );
        assert_eq!(
            single_value(&call(truncate, &n, vec![float(3.9)]).unwrap()),
            Some(Value::Integer(3))
        );
    }

    #[test]
    fn round_to_decimal_places_uses_decimal_arithmetic() {
        let n = node("roundTo")
            .with_attr("roundingMode", "decimalPlaces")
            .with_attr("figures", "2");
        assert_eq!(
            single_value(&call(round_to, &n, vec![float(2.675)]).unwrap()),
            Some(Value::Float(2.68))
        );
    }

    #[test]
    fn round_to_significant_figures() {
        let n = node("roundTo").with_attr("figures", "3");
        assert_eq!(
            single_value(&call(round_to, &n, vec![float(1234.5)]).unwrap()),
            Some(Value::Float(1230.0))
        );
        assert_eq!(
            single_value(&call(round_to, &n, vec![float(0.0012345)]).unwrap()),
            Some(Value::Float(0.00123))
        );
    }

    #[test]
    fn round_to_rejects_bad_figures() {
        let n = node("roundTo").with_attr("figures", "0");
        assert!(matches!(
            call(round_to, &n, vec![float(1.0)]),
            Err(EvalError::InvalidAttribute { .. })
        ));
        let n = node("roundTo");
        assert!(call(round_to, &n, vec![float(1.0)]).is_err());
    }

    #[test]
    fn round_with_mode_large_values_fall_back() {
        let big = 1.234_567e35;
        let rounded = round_with_mode(big, RoundingMode::SignificantFigures, 2);
        assert!((rounded - 1.2e35).abs() / 1.2e35 < 1e-12);
    }
}
