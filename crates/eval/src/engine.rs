//! The expression engine.
//!
//! `Engine::evaluate` dispatches on the node tag through an immutable
//! `ProcessorRegistry`. Leaf expressions run directly; operators first
//! evaluate every child depth-first, validate the operands against their
//! declared `Constraints`, then run with a fresh `OperatorContext`.

use std::sync::Arc;

use qti_core::{ExpressionNode, RuleNode, SessionState};
use tracing::trace;

use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::operators::OperatorContext;
use crate::preprocess::Operand;
use crate::processing::{self, ProcessingSummary};
use crate::registry::{Processor, ProcessorRegistry};
use crate::resolver::{NoCustomOperators, OperatorResolver};

/// A configured evaluator. Holds no per-evaluation state, so one engine can
/// serve any number of sessions, concurrently if needed.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    registry: Arc<ProcessorRegistry>,
    resolver: Arc<dyn OperatorResolver>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("processors", &self.registry.tags().len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Standard registry, no custom operators, default configuration.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Evaluate one expression tree against a session.
    ///
    /// `Ok(None)` means the expression produced nothing, e.g. a `variable`
    /// naming an undeclared identifier. A declared variable holding NULL
    /// yields `Ok(Some(value))` with `value.is_null()`.
    pub fn evaluate(
        &self,
        node: &ExpressionNode,
        state: &SessionState,
    ) -> Result<Operand, EvalError> {
        self.evaluate_at(node, state, 1)
    }

    fn evaluate_at(
        &self,
        node: &ExpressionNode,
        state: &SessionState,
        depth: usize,
    ) -> Result<Operand, EvalError> {
        if let Some(limit) = self.config.max_depth {
            if depth > limit {
                return Err(EvalError::DepthExceeded { limit });
            }
        }
        trace!(tag = %node.tag, depth, "evaluating expression");

        let processor = self
            .registry
            .get(&node.tag)
            .ok_or_else(|| EvalError::UnknownExpression {
                tag: node.tag.clone(),
            })?;

        match processor {
            Processor::Expression(process) => process(node, state),
            Processor::Operator {
                constraints,
                process,
            } => {
                let operands = node
                    .children
                    .iter()
                    .map(|child| self.evaluate_at(child, state, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                constraints.validate(&node.tag, &operands)?;
                let ctx = OperatorContext {
                    expression: node,
                    operands: &operands,
                    state,
                    resolver: self.resolver.as_ref(),
                };
                process(&ctx)
            }
        }
    }

    /// Run a response-processing rule list, mutating outcome values in place.
    ///
    /// On error the pass stops at the failing rule; assignments made by
    /// earlier rules remain in `state`.
    pub fn run(
        &self,
        rules: &[RuleNode],
        state: &mut SessionState,
    ) -> Result<ProcessingSummary, EvalError> {
        processing::run(self, rules, state)
    }
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: Option<ProcessorRegistry>,
    resolver: Option<Arc<dyn OperatorResolver>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_depth(mut self, limit: usize) -> Self {
        self.config.max_depth = Some(limit);
        self
    }

    pub fn strict_outcome_types(mut self, strict: bool) -> Self {
        self.config.strict_outcome_types = strict;
        self
    }

    /// Replace the standard registry.
    pub fn registry(mut self, registry: ProcessorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Resolver consulted by `customOperator`.
    pub fn resolver(mut self, resolver: Arc<dyn OperatorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            config: self.config,
            registry: Arc::new(self.registry.unwrap_or_else(ProcessorRegistry::standard)),
            resolver: self.resolver.unwrap_or_else(|| Arc::new(NoCustomOperators)),
        }
    }
}
