//! `customOperator`: vendor extensions resolved through the host resolver.

use tracing::debug;

use super::OperatorContext;
use crate::attributes;
use crate::error::EvalError;
use crate::preprocess::Operand;

pub fn custom_operator(ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
    let class = attributes::required(ctx.expression, "class")?;
    let processor = ctx
        .resolver
        .resolve(class)
        .ok_or_else(|| EvalError::OperatorResolution {
            class: class.to_string(),
        })?;
    debug!(class, operands = ctx.operands.len(), "dispatching custom operator");
    processor.constraints().validate(class, ctx.operands)?;
    processor.process(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Constraints, INTEGER, SINGLE};
    use crate::operators::test_support::*;
    use crate::resolver::{OperatorProcessor, StaticOperatorResolver};
    use qti_core::{ProcessingValue, SessionState, Value};
    use std::sync::Arc;

    struct Double;

    impl OperatorProcessor for Double {
        fn constraints(&self) -> Constraints {
            Constraints::new(1, Some(1), SINGLE, INTEGER)
        }

        fn process(&self, ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
            let n = ctx
                .operand(0)
                .and_then(|pv| pv.as_single())
                .and_then(Value::as_i64)
                .unwrap_or_default();
            Ok(Some(ProcessingValue::integer(n * 2)))
        }
    }

    fn run(class: &str, operands: Vec<Operand>) -> Result<Operand, EvalError> {
        let resolver = StaticOperatorResolver::new().with_operator("com.example.Double", Arc::new(Double));
        let expr = node("customOperator").with_attr("class", class);
        let state = SessionState::new();
        let ctx = OperatorContext {
            expression: &expr,
            operands: &operands,
            state: &state,
            resolver: &resolver,
        };
        custom_operator(&ctx)
    }

    #[test]
    fn resolves_and_runs() {
        let r = run("com.example.Double", vec![int(21)]).unwrap();
        assert_eq!(single_value(&r), Some(Value::Integer(42)));
    }

    #[test]
    fn unresolved_class_fails() {
        assert!(matches!(
            run("com.example.Missing", vec![int(1)]),
            Err(EvalError::OperatorResolution { .. })
        ));
    }

    #[test]
    fn resolved_constraints_are_enforced() {
        assert!(matches!(
            run("com.example.Double", vec![string("x")]),
            Err(EvalError::Validation { .. })
        ));
    }

    #[test]
    fn default_resolver_knows_nothing() {
        let r = call(custom_operator, &node("customOperator").with_attr("class", "x"), vec![]);
        assert!(matches!(r, Err(EvalError::OperatorResolution { .. })));
    }
}
