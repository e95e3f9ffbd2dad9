//! The operator library.
//!
//! Every operator is a plain function over an immutable `OperatorContext`.
//! The engine evaluates children first, validates them against the
//! operator's `Constraints`, then calls the function. Unless an operator
//! documents otherwise, a NULL operand makes the result NULL.

pub mod arithmetic;
pub mod compare;
pub mod containers;
pub mod custom;
pub mod logic;
pub mod math;
pub mod rounding;
pub mod spatial;
pub mod strings;

use qti_core::{BaseType, Cardinality, ExpressionNode, ProcessingValue, SessionState};

use crate::error::EvalError;
use crate::preprocess::Operand;
use crate::resolver::OperatorResolver;

/// Everything an operator may look at. Borrowed for one invocation only.
pub struct OperatorContext<'a> {
    pub expression: &'a ExpressionNode,
    pub operands: &'a [Operand],
    pub state: &'a SessionState,
    pub resolver: &'a dyn OperatorResolver,
}

impl<'a> OperatorContext<'a> {
    pub fn tag(&self) -> &str {
        &self.expression.tag
    }

    /// Non-null operand at `index`, or `None` when absent or NULL.
    pub fn operand(&self, index: usize) -> Option<&'a ProcessingValue> {
        self.operands
            .get(index)
            .and_then(|o| o.as_ref())
            .filter(|pv| !pv.is_null())
    }

    pub fn any_null(&self) -> bool {
        crate::preprocess::any_null(self.operands)
    }
}

/// Signature shared by all built-in operators.
pub type OperatorFn = fn(&OperatorContext<'_>) -> Result<Operand, EvalError>;

pub(crate) fn boolean(b: bool) -> Operand {
    Some(ProcessingValue::boolean(b))
}

pub(crate) fn null_single(base_type: BaseType) -> Operand {
    Some(ProcessingValue::null(Cardinality::Single, Some(base_type)))
}

/// Base type shared by all non-null operands, or a validation error.
pub(crate) fn common_base_type(ctx: &OperatorContext<'_>) -> Result<Option<BaseType>, EvalError> {
    let mut found: Option<BaseType> = None;
    for pv in ctx.operands.iter().flatten().filter(|pv| !pv.is_null()) {
        match (found, pv.base_type) {
            (None, bt) => found = bt,
            (Some(a), Some(b)) if a != b => {
                return Err(EvalError::validation(
                    ctx.tag(),
                    format!("operands must share a baseType, found {} and {}", a, b),
                ));
            }
            _ => {}
        }
    }
    Ok(found)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Direct invocation helpers for operator unit tests.

    use super::*;
    use crate::resolver::NoCustomOperators;
    use qti_core::Value;

    pub fn call(f: OperatorFn, expr: &ExpressionNode, operands: Vec<Operand>) -> Result<Operand, EvalError> {
        call_with_state(f, expr, operands, &SessionState::new())
    }

    pub fn call_with_state(
        f: OperatorFn,
        expr: &ExpressionNode,
        operands: Vec<Operand>,
        state: &SessionState,
    ) -> Result<Operand, EvalError> {
        let ctx = OperatorContext {
            expression: expr,
            operands: &operands,
            state,
            resolver: &NoCustomOperators,
        };
        f(&ctx)
    }

    pub fn int(i: i64) -> Operand {
        Some(ProcessingValue::integer(i))
    }

    pub fn float(f: f64) -> Operand {
        Some(ProcessingValue::float(f))
    }

    pub fn truth(b: bool) -> Operand {
        Some(ProcessingValue::boolean(b))
    }

    pub fn string(s: &str) -> Operand {
        Some(ProcessingValue::single(BaseType::String, Value::String(s.to_string())))
    }

    pub fn ident(s: &str) -> Operand {
        Some(ProcessingValue::single(
            BaseType::Identifier,
            Value::Identifier(s.to_string()),
        ))
    }

    pub fn idents(card: Cardinality, ids: &[&str]) -> Operand {
        Some(ProcessingValue::container(
            card,
            BaseType::Identifier,
            ids.iter().map(|s| Value::Identifier(s.to_string())).collect(),
        ))
    }

    pub fn ints(card: Cardinality, values: &[i64]) -> Operand {
        Some(ProcessingValue::container(
            card,
            BaseType::Integer,
            values.iter().map(|i| Value::Integer(*i)).collect(),
        ))
    }

    pub fn null_int() -> Operand {
        Some(ProcessingValue::null(Cardinality::Single, Some(BaseType::Integer)))
    }

    pub fn node(tag: &str) -> ExpressionNode {
        ExpressionNode::new(tag)
    }

    pub fn single_value(result: &Operand) -> Option<Value> {
        result.as_ref().and_then(|pv| pv.as_single().cloned())
    }

    pub fn is_null_result(result: &Operand) -> bool {
        crate::preprocess::is_null(result)
    }
}
