//! Operand contracts for operators.
//!
//! Each operator declares how many operands it takes and which
//! cardinalities and base types it accepts. NULL operands are exempt from
//! the shape checks; they are handled by each operator's null rule.

use qti_core::{BaseType, Cardinality};

use crate::error::EvalError;
use crate::preprocess::Operand;

/// Declared operand contract of one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub min_operands: usize,
    /// `None` means unbounded.
    pub max_operands: Option<usize>,
    pub cardinalities: &'static [Cardinality],
    pub base_types: &'static [BaseType],
}

pub const SINGLE: &[Cardinality] = &[Cardinality::Single];
pub const CONTAINERS: &[Cardinality] = &[Cardinality::Multiple, Cardinality::Ordered];
pub const SINGLE_OR_CONTAINER: &[Cardinality] = &[
    Cardinality::Single,
    Cardinality::Multiple,
    Cardinality::Ordered,
];
pub const ANY_CARDINALITY: &[Cardinality] = Cardinality::ALL;

pub const NUMERIC: &[BaseType] = BaseType::NUMERIC;
pub const INTEGER: &[BaseType] = &[BaseType::Integer];
pub const BOOLEAN: &[BaseType] = &[BaseType::Boolean];
pub const STRING: &[BaseType] = &[BaseType::String];
pub const DURATION: &[BaseType] = &[BaseType::Duration];
pub const POINT: &[BaseType] = &[BaseType::Point];
pub const ANY_BASE_TYPE: &[BaseType] = BaseType::ALL;

impl Constraints {
    pub const fn new(
        min_operands: usize,
        max_operands: Option<usize>,
        cardinalities: &'static [Cardinality],
        base_types: &'static [BaseType],
    ) -> Self {
        Constraints {
            min_operands,
            max_operands,
            cardinalities,
            base_types,
        }
    }

    /// No restrictions at all.
    pub const fn any() -> Self {
        Self::new(0, None, ANY_CARDINALITY, ANY_BASE_TYPE)
    }

    /// Check operand count and the shape of every non-null operand.
    pub fn validate(&self, operator: &str, operands: &[Operand]) -> Result<(), EvalError> {
        let count = operands.len();
        if count < self.min_operands {
            return Err(EvalError::validation(
                operator,
                format!(
                    "expected at least {} operand(s), got {}",
                    self.min_operands, count
                ),
            ));
        }
        if let Some(max) = self.max_operands {
            if count > max {
                return Err(EvalError::validation(
                    operator,
                    format!("expected at most {} operand(s), got {}", max, count),
                ));
            }
        }

        for (i, operand) in operands.iter().enumerate() {
            let Some(pv) = operand else { continue };
            if pv.is_null() {
                continue;
            }
            if !self.cardinalities.contains(&pv.cardinality) {
                return Err(EvalError::validation(
                    operator,
                    format!(
                        "operand {} has cardinality {}, expected one of [{}]",
                        i + 1,
                        pv.cardinality,
                        join(self.cardinalities.iter().map(|c| c.as_str()))
                    ),
                ));
            }
            // Records carry no base type of their own.
            if let Some(bt) = pv.base_type {
                if !self.base_types.contains(&bt) {
                    return Err(EvalError::validation(
                        operator,
                        format!(
                            "operand {} has baseType {}, expected one of [{}]",
                            i + 1,
                            bt,
                            join(self.base_types.iter().map(|b| b.as_str()))
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use qti_core::{ProcessingValue, Value};

    const INTS: Constraints = Constraints::new(1, Some(2), SINGLE, INTEGER);

    #[test]
    fn accepts_matching_operands() {
        let ops = vec![Some(ProcessingValue::integer(1)), Some(ProcessingValue::integer(2))];
        assert!(INTS.validate("op", &ops).is_ok());
    }

    #[test]
    fn rejects_operand_count() {
        assert!(INTS.validate("op", &[]).is_err());
        let ops = vec![Some(ProcessingValue::integer(1)); 3];
        assert!(matches!(
            INTS.validate("op", &ops),
            Err(EvalError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_string_for_integer_operator() {
        let ops = vec![Some(ProcessingValue::single(
            BaseType::String,
            Value::String("3".into()),
        ))];
        let err = INTS.validate("op", &ops).unwrap_err();
        assert!(err.to_string().contains("baseType string"));
    }

    #[test]
    fn rejects_wrong_cardinality() {
        let ops = vec![Some(ProcessingValue::container(
            Cardinality::Multiple,
            BaseType::Integer,
            vec![Value::Integer(1)],
        ))];
        assert!(INTS.validate("op", &ops).is_err());
    }

    #[test]
    fn null_operands_skip_shape_checks() {
        let ops = vec![
            None,
            Some(ProcessingValue::null(Cardinality::Multiple, Some(BaseType::String))),
        ];
        assert!(INTS.validate("op", &ops).is_ok());
    }

    #[test]
    fn unbounded_max() {
        let c = Constraints::new(1, None, SINGLE, INTEGER);
        let ops = vec![Some(ProcessingValue::integer(1)); 50];
        assert!(c.validate("op", &ops).is_ok());
    }
}
