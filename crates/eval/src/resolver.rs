//! Host-supplied resolution of `customOperator` classes.
//!
//! The engine never looks operators up in an ambient registry. A host that
//! wants vendor extensions hands an `OperatorResolver` to the engine
//! builder; the `customOperator` processor asks it for the class named in
//! the node's `class` attribute.

use std::collections::HashMap;
use std::sync::Arc;

use crate::constraints::Constraints;
use crate::error::EvalError;
use crate::operators::OperatorContext;
use crate::preprocess::Operand;

/// A pluggable operator implementation.
pub trait OperatorProcessor: Send + Sync {
    /// Operand contract checked before `process` runs.
    fn constraints(&self) -> Constraints {
        Constraints::any()
    }

    fn process(&self, ctx: &OperatorContext<'_>) -> Result<Operand, EvalError>;
}

/// Resolves a `customOperator` class name to an implementation.
pub trait OperatorResolver: Send + Sync {
    fn resolve(&self, class_name: &str) -> Option<Arc<dyn OperatorProcessor>>;
}

/// Resolver that knows no classes; every `customOperator` fails to resolve.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCustomOperators;

impl OperatorResolver for NoCustomOperators {
    fn resolve(&self, _class_name: &str) -> Option<Arc<dyn OperatorProcessor>> {
        None
    }
}

/// A resolver backed by a fixed map of class names.
#[derive(Default, Clone)]
pub struct StaticOperatorResolver {
    operators: HashMap<String, Arc<dyn OperatorProcessor>>,
}

impl StaticOperatorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator(
        mut self,
        class_name: impl Into<String>,
        operator: Arc<dyn OperatorProcessor>,
    ) -> Self {
        self.operators.insert(class_name.into(), operator);
        self
    }
}

impl OperatorResolver for StaticOperatorResolver {
    fn resolve(&self, class_name: &str) -> Option<Arc<dyn OperatorProcessor>> {
        self.operators.get(class_name).cloned()
    }
}

/// Closures are operator processors with no operand contract.
impl<F> OperatorProcessor for F
where
    F: Fn(&OperatorContext<'_>) -> Result<Operand, EvalError> + Send + Sync,
{
    fn process(&self, ctx: &OperatorContext<'_>) -> Result<Operand, EvalError> {
        self(ctx)
    }
}
