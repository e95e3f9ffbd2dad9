//! Expression processor registry.
//!
//! Maps a node tag to either a leaf expression or an operator with its
//! operand contract. A registry is built once and handed to the engine;
//! it is never mutated while evaluating.

use std::collections::HashMap;

use qti_core::Cardinality;

use crate::constraints::{
    Constraints, ANY_BASE_TYPE, ANY_CARDINALITY, BOOLEAN, CONTAINERS, DURATION, INTEGER, NUMERIC,
    POINT, SINGLE, SINGLE_OR_CONTAINER, STRING,
};
use crate::expressions::{self, ExpressionFn};
use crate::operators::{
    arithmetic, compare, containers, custom, logic, math, rounding, spatial, strings, OperatorFn,
};

const MULTIPLE_SOURCES: &[Cardinality] = &[Cardinality::Single, Cardinality::Multiple];
const ORDERED_SOURCES: &[Cardinality] = &[Cardinality::Single, Cardinality::Ordered];
const ORDERED: &[Cardinality] = &[Cardinality::Ordered];
const RECORD: &[Cardinality] = &[Cardinality::Record];

/// How a tag is evaluated.
#[derive(Clone, Copy)]
pub enum Processor {
    /// Reads state directly; children are not evaluated.
    Expression(ExpressionFn),
    /// Children are evaluated, validated, then handed to `process`.
    Operator {
        constraints: Constraints,
        process: OperatorFn,
    },
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Processor::Expression(_) => f.write_str("Expression"),
            Processor::Operator { constraints, .. } => f
                .debug_struct("Operator")
                .field("constraints", constraints)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Processor>,
}

impl ProcessorRegistry {
    /// A registry with no processors.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_expression(mut self, tag: impl Into<String>, process: ExpressionFn) -> Self {
        self.processors
            .insert(tag.into(), Processor::Expression(process));
        self
    }

    pub fn with_operator(
        mut self,
        tag: impl Into<String>,
        constraints: Constraints,
        process: OperatorFn,
    ) -> Self {
        self.processors.insert(
            tag.into(),
            Processor::Operator {
                constraints,
                process,
            },
        );
        self
    }

    pub fn get(&self, tag: &str) -> Option<&Processor> {
        self.processors.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.processors.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Every built-in QTI expression and operator.
    pub fn standard() -> Self {
        let c = Constraints::new;
        let registry = ProcessorRegistry::empty()
            // Leaf expressions
            .with_expression("baseValue", expressions::base_value)
            .with_expression("variable", expressions::variable)
            .with_expression("correct", expressions::correct)
            .with_expression("default", expressions::default)
            .with_expression("null", expressions::null)
            .with_expression("mathConstant", expressions::math_constant)
            .with_expression("mapResponse", expressions::map_response)
            .with_expression("mapResponsePoint", expressions::map_response_point)
            // Logic
            .with_operator("and", c(1, None, SINGLE, BOOLEAN), logic::and)
            .with_operator("or", c(1, None, SINGLE, BOOLEAN), logic::or)
            .with_operator("not", c(1, Some(1), SINGLE, BOOLEAN), logic::not)
            .with_operator("anyN", c(1, None, SINGLE, BOOLEAN), logic::any_n)
            .with_operator(
                "isNull",
                c(1, Some(1), ANY_CARDINALITY, ANY_BASE_TYPE),
                logic::is_null_op,
            )
            // Comparison
            .with_operator("equal", c(2, Some(2), SINGLE, NUMERIC), compare::equal)
            .with_operator(
                "equalRounded",
                c(2, Some(2), SINGLE, NUMERIC),
                compare::equal_rounded,
            )
            .with_operator("lt", c(2, Some(2), SINGLE, NUMERIC), compare::lt)
            .with_operator("gt", c(2, Some(2), SINGLE, NUMERIC), compare::gt)
            .with_operator("lte", c(2, Some(2), SINGLE, NUMERIC), compare::lte)
            .with_operator("gte", c(2, Some(2), SINGLE, NUMERIC), compare::gte)
            .with_operator(
                "durationLT",
                c(2, Some(2), SINGLE, DURATION),
                compare::duration_lt,
            )
            .with_operator(
                "durationGTE",
                c(2, Some(2), SINGLE, DURATION),
                compare::duration_gte,
            )
            .with_operator(
                "match",
                c(2, Some(2), ANY_CARDINALITY, ANY_BASE_TYPE),
                compare::match_op,
            )
            // Arithmetic
            .with_operator("sum", c(1, None, SINGLE_OR_CONTAINER, NUMERIC), arithmetic::sum)
            .with_operator(
                "product",
                c(1, None, SINGLE_OR_CONTAINER, NUMERIC),
                arithmetic::product,
            )
            .with_operator("subtract", c(2, Some(2), SINGLE, NUMERIC), arithmetic::subtract)
            .with_operator("divide", c(2, Some(2), SINGLE, NUMERIC), arithmetic::divide)
            .with_operator("power", c(2, Some(2), SINGLE, NUMERIC), arithmetic::power)
            .with_operator(
                "integerDivide",
                c(2, Some(2), SINGLE, INTEGER),
                arithmetic::integer_divide,
            )
            .with_operator(
                "integerModulus",
                c(2, Some(2), SINGLE, INTEGER),
                arithmetic::integer_modulus,
            )
            .with_operator(
                "integerToFloat",
                c(1, Some(1), SINGLE, INTEGER),
                arithmetic::integer_to_float,
            )
            .with_operator("gcd", c(1, None, SINGLE_OR_CONTAINER, INTEGER), arithmetic::gcd)
            .with_operator("lcm", c(1, None, SINGLE_OR_CONTAINER, INTEGER), arithmetic::lcm)
            .with_operator("min", c(1, None, SINGLE_OR_CONTAINER, NUMERIC), arithmetic::min)
            .with_operator("max", c(1, None, SINGLE_OR_CONTAINER, NUMERIC), arithmetic::max)
            // Rounding
            .with_operator("round", c(1, Some(1), SINGLE, NUMERIC), rounding::round)
            .with_operator("truncate", c(1, Some(1), SINGLE, NUMERIC), rounding::truncate)
            .with_operator("roundTo", c(1, Some(1), SINGLE, NUMERIC), rounding::round_to)
            .with_operator("mathOperator", c(1, Some(2), SINGLE, NUMERIC), math::math_operator)
            .with_operator(
                "statsOperator",
                c(1, Some(1), CONTAINERS, NUMERIC),
                math::stats_operator,
            )
            // Containers
            .with_operator(
                "multiple",
                c(0, None, MULTIPLE_SOURCES, ANY_BASE_TYPE),
                containers::multiple,
            )
            .with_operator(
                "ordered",
                c(0, None, ORDERED_SOURCES, ANY_BASE_TYPE),
                containers::ordered,
            )
            .with_operator(
                "repeat",
                c(1, None, ORDERED_SOURCES, ANY_BASE_TYPE),
                containers::repeat,
            )
            .with_operator(
                "containerSize",
                c(1, Some(1), CONTAINERS, ANY_BASE_TYPE),
                containers::container_size,
            )
            .with_operator(
                "member",
                c(2, Some(2), SINGLE_OR_CONTAINER, ANY_BASE_TYPE),
                containers::member,
            )
            .with_operator(
                "contains",
                c(2, Some(2), CONTAINERS, ANY_BASE_TYPE),
                containers::contains,
            )
            .with_operator(
                "delete",
                c(2, Some(2), SINGLE_OR_CONTAINER, ANY_BASE_TYPE),
                containers::delete,
            )
            .with_operator("index", c(1, Some(1), ORDERED, ANY_BASE_TYPE), containers::index)
            .with_operator(
                "fieldValue",
                c(1, Some(1), RECORD, ANY_BASE_TYPE),
                containers::field_value,
            )
            // Strings
            .with_operator(
                "stringMatch",
                c(2, Some(2), SINGLE, STRING),
                strings::string_match,
            )
            .with_operator(
                "patternMatch",
                c(1, Some(1), SINGLE, STRING),
                strings::pattern_match,
            )
            .with_operator("substring", c(2, Some(2), SINGLE, STRING), strings::substring)
            // Geometry
            .with_operator(
                "inside",
                c(1, Some(1), SINGLE_OR_CONTAINER, POINT),
                spatial::inside,
            )
            // Extension point
            .with_operator("customOperator", Constraints::any(), custom::custom_operator);

        #[cfg(feature = "random")]
        let registry = registry
            .with_expression("randomInteger", expressions::random_integer)
            .with_expression("randomFloat", expressions::random_float)
            .with_operator(
                "random",
                c(1, Some(1), CONTAINERS, ANY_BASE_TYPE),
                containers::random,
            );

        registry
    }
}
