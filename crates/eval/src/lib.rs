//! QTI response-processing evaluator -- evaluates expression trees against
//! a session of declared variables and runs response rules that assign
//! outcome values.
//!
//! The evaluator consumes already-loaded trees (`ExpressionNode`,
//! `RuleNode`) and a `SessionState`; it does not parse item XML. Every
//! built-in QTI expression and operator is registered in a
//! `ProcessorRegistry`; vendor `customOperator` classes come from a
//! host-supplied `OperatorResolver`.

pub mod attributes;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod expressions;
pub mod operators;
pub mod preprocess;
pub mod processing;
pub mod registry;
pub mod resolver;
pub mod rules;

pub use config::EngineConfig;
pub use constraints::Constraints;
pub use engine::{Engine, EngineBuilder};
pub use error::EvalError;
pub use operators::{OperatorContext, OperatorFn};
pub use preprocess::Operand;
pub use processing::ProcessingSummary;
pub use registry::{Processor, ProcessorRegistry};
pub use resolver::{
    NoCustomOperators, OperatorProcessor, OperatorResolver, StaticOperatorResolver,
};

use qti_core::{ExpressionNode, RuleNode, SessionState};

/// Evaluate one expression against a session with a default engine.
///
/// For custom operators, depth limits or permissive outcome typing, build
/// an `Engine` instead.
pub fn evaluate_expression(
    node: &ExpressionNode,
    state: &SessionState,
) -> Result<Operand, EvalError> {
    Engine::new().evaluate(node, state)
}

/// Run a response-processing template and return the updated session.
///
/// # Arguments
/// * `rules` - Top-level rules of the template, in document order
/// * `state` - Declared response and outcome variables
///
/// # Returns
/// * The session after the pass, or the first `EvalError` raised
pub fn run_response_processing(
    rules: &[RuleNode],
    mut state: SessionState,
) -> Result<SessionState, EvalError> {
    Engine::new().run(rules, &mut state)?;
    Ok(state)
}

/// JSON convenience: parse declarations and rules, run one pass and
/// return the outcome values keyed by identifier.
///
/// # Arguments
/// * `rules` - JSON array of tag-based rules
/// * `declarations` - JSON array of variable declarations
pub fn process_json(
    rules: &serde_json::Value,
    declarations: &serde_json::Value,
) -> Result<serde_json::Value, EvalError> {
    let rules = RuleNode::list_from_json(rules)?;
    let state = SessionState::from_json(declarations)?;
    let state = run_response_processing(&rules, state)?;
    Ok(state.values_json())
}

// ──────────────────────────────────────────────
// Integration tests
// ──────────────────────────────────────────────
