//! One response-processing pass over a session.

use qti_core::{RuleNode, SessionState};
use tracing::{debug, info};

use crate::engine::Engine;
use crate::error::EvalError;
use crate::rules::{self, Flow};

/// What a completed pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Top-level rules in the template.
    pub rule_count: usize,
    /// An `exitResponse` stopped the pass before the last rule.
    pub exited_early: bool,
}

/// Execute `rules` against `state`. Outcome values are updated in place.
pub fn run(
    engine: &Engine,
    rules: &[RuleNode],
    state: &mut SessionState,
) -> Result<ProcessingSummary, EvalError> {
    debug!(rules = rules.len(), "response processing started");
    let flow = rules::execute_rules(engine, rules, state)?;
    let summary = ProcessingSummary {
        rule_count: rules.len(),
        exited_early: flow == Flow::Exit,
    };
    info!(
        rules = summary.rule_count,
        exited_early = summary.exited_early,
        "response processing finished"
    );
    Ok(summary)
}
