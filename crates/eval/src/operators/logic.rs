//! Boolean operators: `and`, `or`, `not`, `isNull`, `anyN`.
//!
//! `and`/`or` follow three-valued logic: a deciding operand (false for
//! `and`, true for `or`) wins over NULL. `isNull` never yields NULL.

use qti_core::{BaseType, Value};

use super::{boolean, null_single, OperatorContext};
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::{is_null, parse_operands, Operand};

fn truth_values(ctx: &OperatorContext<'_>) -> Vec<Option<bool>> {
    parse_operands(ctx.operands)
        .into_iter()
        .map(|v| v.and_then(|v| v.as_bool()))
        .collect()
}

pub fn and(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let values = truth_values(ctx);
    if values.contains(&Some(false)) {
        return Ok(boolean(false));
    }
    if values.contains(&None) {
        return Ok(null_single(BaseType::Boolean));
    }
    Ok(boolean(true))
}

pub fn or(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let values = truth_values(ctx);
    if values.contains(&Some(true)) {
        return Ok(boolean(true));
    }
    if values.contains(&None) {
        return Ok(null_single(BaseType::Boolean));
    }
    Ok(boolean(false))
}

pub fn not(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    match ctx.operand(0).and_then(|pv| pv.as_single()) {
        Some(Value::Boolean(b)) => Ok(boolean(!b)),
        _ => Ok(null_single(BaseType::Boolean)),
    }
}

/// True for NULL, empty containers and the empty string.
pub fn is_null_op(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let operand = ctx.operands.first().cloned().flatten();
    if is_null(&operand) {
        return Ok(boolean(true));
    }
    let empty_string = matches!(
        operand.as_ref().and_then(|pv| pv.as_single()),
        Some(Value::String(s)) if s.is_empty()
    );
    Ok(boolean(empty_string))
}

/// True when the number of true operands lies in `[min, max]`. NULL when
/// the answer depends on how the NULL operands would resolve.
pub fn any_n(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let expr = ctx.expression;
    let min = attributes::require(expr, "min", attributes::integer(expr, ctx.state, "min")?)?;
    let max = attributes::require(expr, "max", attributes::integer(expr, ctx.state, "max")?)?;

    let values = truth_values(ctx);
    let trues = values.iter().filter(|v| **v == Some(true)).count() as i64;
    let nulls = values.iter().filter(|v| v.is_none()).count() as i64;

    if trues > max || trues + nulls < min {
        Ok(boolean(false))
    } else if trues >= min && trues + nulls <= max {
        Ok(boolean(true))
    } else {
        Ok(null_single(BaseType::Boolean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_support::*;

    #[test]
    fn and_truth_table() {
        let n = node("and");
        let r = call(and, &n, vec![truth(true), truth(true)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(and, &n, vec![truth(true), truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
    }

    #[test]
    fn and_false_dominates_null() {
        let n = node("and");
        let r = call(and, &n, vec![None, truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
        let r = call(and, &n, vec![None, truth(true)]).unwrap();
        assert!(is_null_result(&r));
    }

    #[test]
    fn or_true_dominates_null() {
        let n = node("or");
        let r = call(or, &n, vec![None, truth(true)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(or, &n, vec![None, truth(false)]).unwrap();
        assert!(is_null_result(&r));
        let r = call(or, &n, vec![truth(false), truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
    }

    #[test]
    fn not_inverts_and_propagates_null() {
        let n = node("not");
        let r = call(not, &n, vec![truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        assert!(is_null_result(&call(not, &n, vec![None]).unwrap()));
    }

    #[test]
    fn is_null_never_null() {
        let n = node("isNull");
        let r = call(is_null_op, &n, vec![None]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(is_null_op, &n, vec![null_int()]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(is_null_op, &n, vec![string("")]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(is_null_op, &n, vec![int(0)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
    }

    #[test]
    fn any_n_three_valued() {
        let n = node("anyN").with_attr("min", "2").with_attr("max", "3");
        let r = call(any_n, &n, vec![truth(true), truth(true), truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(true)));
        let r = call(any_n, &n, vec![truth(true), truth(false), truth(false)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
        let r = call(any_n, &n, vec![truth(true), None, truth(false)]).unwrap();
        assert!(is_null_result(&r));
        let r = call(
            any_n,
            &n,
            vec![truth(true), truth(true), truth(true), truth(true)],
        )
        .unwrap();
        assert_eq!(single_value(&r), Some(Value::Boolean(false)));
    }

    #[test]
    fn any_n_requires_bounds() {
        let n = node("anyN").with_attr("min", "1");
        assert!(matches!(
            call(any_n, &n, vec![truth(true)]),
            Err(EvalError::InvalidAttribute { .. })
        ));
    }
}
