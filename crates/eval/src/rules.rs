//! Response rule processors.
//!
//! Rules run in document order. Each returns a `Flow` telling the caller
//! whether to continue with the next rule or unwind because an
//! `exitResponse` was reached, including from inside a nested branch or
//! fragment.

use qti_core::{
    BaseType, Cardinality, Data, ExpressionNode, LookupTable, ProcessingValue, ResponseCondition,
    RuleNode, SessionState, Value, Variable,
};
use tracing::debug;

use crate::engine::Engine;
use crate::error::EvalError;
use crate::preprocess::{cast_value, is_null};

/// Control flow after a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Execute rules in order, stopping at the first `Exit`.
pub fn execute_rules(
    engine: &Engine,
    rules: &[RuleNode],
    state: &mut SessionState,
) -> Result<Flow, EvalError> {
    for rule in rules {
        if execute_rule(engine, rule, state)? == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

pub fn execute_rule(
    engine: &Engine,
    rule: &RuleNode,
    state: &mut SessionState,
) -> Result<Flow, EvalError> {
    debug!(rule = rule.tag(), "executing rule");
    match rule {
        RuleNode::SetOutcomeValue {
            identifier,
            expression,
        } => {
            set_outcome_value(engine, identifier, expression, state)?;
            Ok(Flow::Continue)
        }
        RuleNode::LookupOutcomeValue {
            identifier,
            expression,
        } => {
            lookup_outcome_value(engine, identifier, expression, state)?;
            Ok(Flow::Continue)
        }
        RuleNode::ResponseCondition(condition) => response_condition(engine, condition, state),
        RuleNode::ResponseProcessingFragment(rules) => execute_rules(engine, rules, state),
        RuleNode::ExitResponse => {
            debug!("exitResponse reached");
            Ok(Flow::Exit)
        }
    }
}

// ──────────────────────────────────────────────
// responseCondition
// ──────────────────────────────────────────────

/// Evaluate a branch condition. NULL counts as false; anything other than
/// a single boolean is a type error.
fn condition_holds(
    engine: &Engine,
    expression: &ExpressionNode,
    state: &SessionState,
) -> Result<bool, EvalError> {
    let result = engine.evaluate(expression, state)?;
    if is_null(&result) {
        return Ok(false);
    }
    match result.as_ref().and_then(ProcessingValue::as_single) {
        Some(Value::Boolean(b)) => Ok(*b),
        _ => Err(EvalError::type_error(format!(
            "condition '{}' must evaluate to a single boolean",
            expression.tag
        ))),
    }
}

fn response_condition(
    engine: &Engine,
    condition: &ResponseCondition,
    state: &mut SessionState,
) -> Result<Flow, EvalError> {
    let branches =
        std::iter::once(&condition.response_if).chain(condition.response_else_ifs.iter());
    for (index, branch) in branches.enumerate() {
        if condition_holds(engine, &branch.expression, state)? {
            debug!(branch = index, "responseCondition branch taken");
            return execute_rules(engine, &branch.rules, state);
        }
    }
    match &condition.response_else {
        Some(rules) => {
            debug!("responseElse taken");
            execute_rules(engine, rules, state)
        }
        None => Ok(Flow::Continue),
    }
}

// ──────────────────────────────────────────────
// Outcome assignment
// ──────────────────────────────────────────────

fn target<'a>(state: &'a SessionState, identifier: &str) -> Result<&'a Variable, EvalError> {
    state.get(identifier).ok_or_else(|| EvalError::MissingVariable {
        identifier: identifier.to_string(),
    })
}

fn describe(cardinality: Cardinality, base_type: Option<BaseType>) -> String {
    match base_type {
        Some(bt) => format!("{} {}", cardinality, bt),
        None => cardinality.to_string(),
    }
}

/// Fit an evaluation result to the declared shape of `var`.
///
/// Integer values always widen into float outcomes. In strict mode any
/// other cardinality or base type difference is an error; otherwise the
/// payload is reshaped and its scalars re-cast to the declared type.
pub fn coerce_to_variable(
    var: &Variable,
    result: &ProcessingValue,
    strict: bool,
) -> Result<Option<Data>, EvalError> {
    let Some(data) = &result.value else {
        return Ok(None);
    };
    let widening = var.base_type == Some(BaseType::Float)
        && result.base_type == Some(BaseType::Integer);
    let compatible = var.cardinality == result.cardinality
        && (var.base_type == result.base_type || widening);
    if !compatible && strict {
        return Err(EvalError::OutcomeTypeMismatch {
            identifier: var.identifier.clone(),
            expected: describe(var.cardinality, var.base_type),
            got: describe(result.cardinality, result.base_type),
        });
    }

    if var.cardinality == Cardinality::Record || result.cardinality == Cardinality::Record {
        return Ok(Some(data.clone()));
    }
    let Some(base_type) = var.base_type else {
        return Ok(Some(data.clone()));
    };
    let mut values: Vec<Value> = data.values().iter().map(|v| cast_value(base_type, v)).collect();
    Ok(match var.cardinality {
        Cardinality::Single => {
            if values.is_empty() {
                None
            } else {
                Some(Data::Single(values.swap_remove(0)))
            }
        }
        _ if values.is_empty() => None,
        _ => Some(Data::List(values)),
    })
}

/// `setOutcomeValue`: evaluate and store into a declared variable.
pub fn set_outcome_value(
    engine: &Engine,
    identifier: &str,
    expression: &ExpressionNode,
    state: &mut SessionState,
) -> Result<(), EvalError> {
    target(state, identifier)?;
    let result = engine.evaluate(expression, state)?;
    let var = target(state, identifier)?;
    let value = match &result {
        Some(pv) => coerce_to_variable(var, pv, engine.config().strict_outcome_types)?,
        None => None,
    };
    debug!(identifier, null = value.is_none(), "setOutcomeValue");
    store(state, identifier, value)
}

fn store(state: &mut SessionState, identifier: &str, value: Option<Data>) -> Result<(), EvalError> {
    let var = state
        .get_mut(identifier)
        .ok_or_else(|| EvalError::MissingVariable {
            identifier: identifier.to_string(),
        })?;
    var.value = value;
    Ok(())
}

// ──────────────────────────────────────────────
// lookupOutcomeValue
// ──────────────────────────────────────────────

/// Target value for `source` in a lookup table, falling back to the
/// table default.
pub fn lookup(table: &LookupTable, source: Option<f64>) -> Option<Value> {
    match table {
        LookupTable::Match {
            default_value,
            entries,
        } => source
            .and_then(|s| entries.iter().find(|e| e.source_value as f64 == s))
            .map(|e| e.target_value.clone())
            .or_else(|| default_value.clone()),
        LookupTable::Interpolation {
            default_value,
            entries,
        } => source
            .and_then(|s| {
                entries.iter().find(|e| {
                    if e.include_boundary {
                        s >= e.source_value
                    } else {
                        s > e.source_value
                    }
                })
            })
            .map(|e| e.target_value.clone())
            .or_else(|| default_value.clone()),
    }
}

/// `lookupOutcomeValue`: map a numeric expression through the target
/// outcome's lookup table and store the result.
pub fn lookup_outcome_value(
    engine: &Engine,
    identifier: &str,
    expression: &ExpressionNode,
    state: &mut SessionState,
) -> Result<(), EvalError> {
    let var = target(state, identifier)?;
    let table = var.lookup_table.clone().ok_or_else(|| {
        EvalError::type_error(format!("outcome '{}' has no lookup table", identifier))
    })?;
    let base_type = var.base_type;

    let result = engine.evaluate(expression, state)?;
    let source = result
        .as_ref()
        .and_then(ProcessingValue::as_single)
        .and_then(Value::as_f64)
        .filter(|f| !f.is_nan());
    let value = lookup(&table, source).map(|v| match base_type {
        Some(bt) => Data::Single(cast_value(bt, &v)),
        None => Data::Single(v),
    });
    debug!(identifier, ?source, null = value.is_none(), "lookupOutcomeValue");
    store(state, identifier, value)
}
