//! Arithmetic operators.
//!
//! Integer operands stay in checked `i64` arithmetic and report overflow as
//! an error; as soon as one operand is a float the result is a float.
//! Non-finite operands are dropped by `map_numbers` before the arithmetic
//! runs, and undefined results (division by zero, a non-finite power) are
//! NULL.

use qti_core::{BaseType, ProcessingValue, Value};

use super::{null_single, OperatorContext};
use crate::error::EvalError;
use crate::preprocess::{all_integer, map_numbers, Number, Operand};

fn overflow(ctx: &OperatorContext<'_>) -> EvalError {
    EvalError::Overflow {
        operator: ctx.tag().to_string(),
    }
}

/// Finite numbers of all operands, or `None` when any operand is NULL or
/// nothing usable remains.
fn numbers(ctx: &OperatorContext<'_>) -> Option<Vec<Number>> {
    if ctx.any_null() {
        return None;
    }
    let numbers = map_numbers(ctx.operands);
    if numbers.is_empty() {
        None
    } else {
        Some(numbers)
    }
}

fn integers(numbers: &[Number]) -> Option<Vec<i64>> {
    numbers
        .iter()
        .map(|n| match n {
            Number::Int(i) => Some(*i),
            Number::Float(_) => None,
        })
        .collect()
}

fn result_type(ctx: &OperatorContext<'_>) -> BaseType {
    if all_integer(ctx.operands) {
        BaseType::Integer
    } else {
        BaseType::Float
    }
}

fn float_result(f: f64) -> Operand {
    if f.is_finite() {
        Some(ProcessingValue::float(f))
    } else {
        null_single(BaseType::Float)
    }
}

/// Fold integer operands with checked arithmetic, float operands with `f64`.
fn fold(
    ctx: &OperatorContext<'_>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Operand, EvalError> {
    let base_type = result_type(ctx);
    let Some(numbers) = numbers(ctx) else {
        return Ok(null_single(base_type));
    };
    if base_type == BaseType::Integer {
        if let Some(ints) = integers(&numbers) {
            let mut iter = ints.into_iter();
            let first = iter.next().unwrap_or_default();
            let total = iter.try_fold(first, int_op).ok_or_else(|| overflow(ctx))?;
            return Ok(Some(ProcessingValue::integer(total)));
        }
    }
    let mut iter = numbers.into_iter().map(Number::as_f64);
    let first = iter.next().unwrap_or_default();
    Ok(float_result(iter.fold(first, float_op)))
}

pub fn sum(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    fold(ctx, i64::checked_add, |a, b| a + b)
}

pub fn product(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    fold(ctx, i64::checked_mul, |a, b| a * b)
}

pub fn subtract(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let base_type = result_type(ctx);
    match numbers(ctx).as_deref() {
        Some([Number::Int(a), Number::Int(b)]) if base_type == BaseType::Integer => a
            .checked_sub(*b)
            .map(|d| Some(ProcessingValue::integer(d)))
            .ok_or_else(|| overflow(ctx)),
        Some([a, b]) => Ok(float_result(a.as_f64() - b.as_f64())),
        _ => Ok(null_single(base_type)),
    }
}

/// Two float operands, or `None` for NULL/NaN/infinite inputs.
fn float_pair(ctx: &OperatorContext<'_>) -> Option<(f64, f64)> {
    match numbers(ctx).as_deref() {
        Some([a, b]) => Some((a.as_f64(), b.as_f64())),
        _ => None,
    }
}

pub fn divide(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match float_pair(ctx) {
        Some((_, b)) if b == 0.0 => Ok(null_single(BaseType::Float)),
        Some((a, b)) => Ok(float_result(a / b)),
        None => Ok(null_single(BaseType::Float)),
    }
}

pub fn power(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match float_pair(ctx) {
        Some((a, b)) => Ok(float_result(a.powf(b))),
        None => Ok(null_single(BaseType::Float)),
    }
}

fn integer_pair(ctx: &OperatorContext<'_>) -> Option<(i64, i64)> {
    let a = ctx.operand(0)?.as_single()?.as_i64()?;
    let b = ctx.operand(1)?.as_single()?.as_i64()?;
    Some((a, b))
}

/// Quotient rounded toward negative infinity, `None` on overflow.
fn floored_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

pub fn integer_divide(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match integer_pair(ctx) {
        Some((_, 0)) | None => Ok(null_single(BaseType::Integer)),
        Some((a, b)) => {
            let q = floored_div(a, b).ok_or_else(|| overflow(ctx))?;
            Ok(Some(ProcessingValue::integer(q)))
        }
    }
}

/// `x - integerDivide(x, y) * y`; takes the sign of the divisor.
pub fn integer_modulus(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match integer_pair(ctx) {
        Some((_, 0)) | None => Ok(null_single(BaseType::Integer)),
        Some((a, b)) => {
            let r = floored_div(a, b)
                .and_then(|q| q.checked_mul(b))
                .and_then(|p| a.checked_sub(p))
                .ok_or_else(|| overflow(ctx))?;
            Ok(Some(ProcessingValue::integer(r)))
        }
    }
}

pub fn integer_to_float(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match ctx.operand(0).and_then(|pv| pv.as_single()) {
        Some(Value::Integer(i)) => Ok(Some(ProcessingValue::float(*i as f64))),
        _ => Ok(null_single(BaseType::Float)),
    }
}

// ──────────────────────────────────────────────
// gcd / lcm
// ──────────────────────────────────────────────

fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn integer_operands(ctx: &OperatorContext<'_>) -> Option<Vec<u64>> {
    let numbers = numbers(ctx)?;
    integers(&numbers).map(|ints| ints.into_iter().map(i64::unsigned_abs).collect())
}

/// Greatest common divisor of every operand value. `gcd(0, 0)` is 0.
pub fn gcd(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let Some(values) = integer_operands(ctx) else {
        return Ok(null_single(BaseType::Integer));
    };
    let g = values.into_iter().fold(0, gcd_u64);
    let g = i64::try_from(g).map_err(|_| overflow(ctx))?;
    Ok(Some(ProcessingValue::integer(g)))
}

/// Least common multiple of every operand value; 0 if any value is 0.
pub fn lcm(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let Some(values) = integer_operands(ctx) else {
        return Ok(null_single(BaseType::Integer));
    };
    if values.contains(&0) {
        return Ok(Some(ProcessingValue::integer(0)));
    }
    let mut acc: u64 = 1;
    for v in values {
        acc = (acc / gcd_u64(acc, v))
            .checked_mul(v)
            .ok_or_else(|| overflow(ctx))?;
    }
    let acc = i64::try_from(acc).map_err(|_| overflow(ctx))?;
    Ok(Some(ProcessingValue::integer(acc)))
}

// ──────────────────────────────────────────────
// min / max
// ──────────────────────────────────────────────

fn extreme(ctx: &OperatorContext<'_>, pick_greater: bool) -> Result<Operand, EvalError> {
    let base_type = result_type(ctx);
    let Some(numbers) = numbers(ctx) else {
        return Ok(null_single(base_type));
    };
    if base_type == BaseType::Integer {
        if let Some(ints) = integers(&numbers) {
            let best = if pick_greater {
                ints.into_iter().max()
            } else {
                ints.into_iter().min()
            };
            return Ok(best.map(ProcessingValue::integer));
        }
    }
    let floats = numbers.into_iter().map(Number::as_f64);
    let best = if pick_greater {
        floats.fold(f64::NEG_INFINITY, f64::max)
    } else {
        floats.fold(f64::INFINITY, f64::min)
    };
    Ok(float_result(best))
}

pub fn min(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    extreme(ctx, false)
}

pub fn max(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    extreme(ctx, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::*;
    use qti_core::Cardinality;

    fn value(r: Result<Operand, EvalError>) -> Option<Value> {
        single_value(&r.unwrap())
    }

    #[test]
    fn sum_integers_stays_integer() {
        assert_eq!(
            value(call(sum, &node("sum"), vec![int(3), int(7), int(5)])),
            Some(Value::Integer(15))
        );
    }

    #[test]
    fn sum_mixed_is_float() {
        assert_eq!(
            value(call(sum, &node("sum"), vec![int(1), float(0.5)])),
            Some(Value::Float(1.5))
        );
    }

    #[test]
    fn sum_flattens_containers() {
        assert_eq!(
            value(call(sum, &node("sum"), vec![ints(Cardinality::Multiple, &[1, 2, 3]), int(4)])),
            Some(Value::Integer(10))
        );
    }

    #[test]
    fn sum_overflow_is_an_error() {
        assert!(matches!(
            call(sum, &node("sum"), vec![int(i64::MAX), int(1)]),
            Err(EvalError::Overflow { .. })
        ));
    }

    #[test]
    fn null_operands_propagate() {
        let ops: [crate::operators::OperatorFn; 9] =
            [sum, product, subtract, divide, power, min, max, gcd, lcm];
        for f in ops {
            assert!(is_null_result(&call(f, &node("op"), vec![int(2), None]).unwrap()));
            assert!(is_null_result(&call(f, &node("op"), vec![int(2), null_int()]).unwrap()));
        }
    }

    #[test]
    fn nan_operands_are_filtered() {
        assert_eq!(
            value(call(sum, &node("sum"), vec![float(1.0), float(f64::NAN), float(2.0)])),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn product_and_subtract() {
        assert_eq!(
            value(call(product, &node("product"), vec![int(2), int(5)])),
            Some(Value::Integer(10))
        );
        assert_eq!(
            value(call(subtract, &node("subtract"), vec![int(15), int(10)])),
            Some(Value::Integer(5))
        );
        assert_eq!(
            value(call(subtract, &node("subtract"), vec![float(1.5), int(1)])),
            Some(Value::Float(0.5))
        );
    }

    #[test]
    fn divide_by_zero_is_null() {
        assert!(is_null_result(&call(divide, &node("divide"), vec![int(1), int(0)]).unwrap()));
        assert_eq!(
            value(call(divide, &node("divide"), vec![int(7), int(2)])),
            Some(Value::Float(3.5))
        );
    }

    #[test]
    fn power_non_finite_is_null() {
        assert_eq!(
            value(call(power, &node("power"), vec![int(2), int(10)])),
            Some(Value::Float(1024.0))
        );
        assert!(is_null_result(&call(power, &node("power"), vec![float(10.0), float(400.0)]).unwrap()));
        assert!(is_null_result(&call(power, &node("power"), vec![float(-8.0), float(0.5)]).unwrap()));
    }

    #[test]
    fn integer_divide_floors() {
        let n = node("integerDivide");
        assert_eq!(value(call(integer_divide, &n, vec![int(7), int(2)])), Some(Value::Integer(3)));
        assert_eq!(value(call(integer_divide, &n, vec![int(-7), int(2)])), Some(Value::Integer(-4)));
        assert!(is_null_result(&call(integer_divide, &n, vec![int(7), int(0)]).unwrap()));
    }

    #[test]
    fn integer_modulus_by_zero_is_null() {
        let n = node("integerModulus");
        assert_eq!(value(call(integer_modulus, &n, vec![int(-7), int(2)])), Some(Value::Integer(1)));
        assert!(is_null_result(&call(integer_modulus, &n, vec![int(7), int(0)]).unwrap()));
    }

    #[test]
    fn modulus_agrees_with_floored_division() {
        for (a, b) in [(-7, 2), (7, -2), (-7, -2), (7, 2), (6, -3), (-1, 5)] {
            let q = value(call(integer_divide, &node("integerDivide"), vec![int(a), int(b)]))
                .and_then(|v| v.as_i64())
                .unwrap();
            let r = value(call(integer_modulus, &node("integerModulus"), vec![int(a), int(b)]))
                .and_then(|v| v.as_i64())
                .unwrap();
            assert_eq!(q * b + r, a, "({}, {})", a, b);
            assert!(r == 0 || (r < 0) == (b < 0), "({}, {}) -> {}", a, b, r);
        }
    }

    #[test]
    fn integer_to_float_converts() {
        assert_eq!(
            value(call(integer_to_float, &node("integerToFloat"), vec![int(3)])),
            Some(Value::Float(3.0))
        );
    }

    #[test]
    fn gcd_and_lcm() {
        assert_eq!(value(call(gcd, &node("gcd"), vec![int(12), int(-18), int(30)])), Some(Value::Integer(6)));
        assert_eq!(value(call(gcd, &node("gcd"), vec![int(0), int(0)])), Some(Value::Integer(0)));
        assert_eq!(value(call(gcd, &node("gcd"), vec![int(0), int(5)])), Some(Value::Integer(5)));
        assert_eq!(value(call(lcm, &node("lcm"), vec![int(4), int(6)])), Some(Value::Integer(12)));
        assert_eq!(value(call(lcm, &node("lcm"), vec![int(4), int(0)])), Some(Value::Integer(0)));
    }

    #[test]
    fn min_and_max() {
        assert_eq!(value(call(min, &node("min"), vec![int(4), int(-2), int(9)])), Some(Value::Integer(-2)));
        assert_eq!(value(call(max, &node("max"), vec![int(4), float(4.5)])), Some(Value::Float(4.5)));
    }
}
