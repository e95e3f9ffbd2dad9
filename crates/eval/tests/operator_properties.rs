//! Property-based tests for the commutative aggregate operators.

use proptest::prelude::*;
use qti_core::{BaseType, ExpressionNode, SessionState};
use qti_eval::Engine;

fn integers(values: &[i64]) -> Vec<ExpressionNode> {
    values
        .iter()
        .map(|v| ExpressionNode::base_value(BaseType::Integer, v.to_string()))
        .collect()
}

fn evaluate(tag: &str, values: &[i64]) -> Option<qti_core::ProcessingValue> {
    let expr = ExpressionNode::operator(tag, integers(values));
    Engine::new()
        .evaluate(&expr, &SessionState::new())
        .expect("small operands never overflow")
}

/// Small operand lists with a shuffled copy.
fn operands_and_permutation() -> impl Strategy<Value = (Vec<i64>, Vec<i64>)> {
    prop::collection::vec(-50i64..50, 1..6)
        .prop_flat_map(|values| (Just(values.clone()), Just(values).prop_shuffle()))
}

proptest! {
    #[test]
    fn aggregates_ignore_operand_order((values, shuffled) in operands_and_permutation()) {
        for tag in ["sum", "product", "gcd", "lcm", "min", "max"] {
            prop_assert_eq!(evaluate(tag, &values), evaluate(tag, &shuffled), "{}", tag);
        }
    }

    #[test]
    fn gcd_divides_every_operand(values in prop::collection::vec(1i64..1000, 1..5)) {
        let g = evaluate("gcd", &values)
            .and_then(|pv| pv.as_single().and_then(|v| v.as_i64()))
            .unwrap();
        prop_assert!(g > 0);
        for v in values {
            prop_assert_eq!(v % g, 0);
        }
    }
}
