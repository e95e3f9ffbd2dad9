//! Engine configuration.

use qti_core::CoreError;
use serde::Deserialize;

use crate::error::EvalError;

/// Tunables of one `Engine`.
///
/// Hosts usually construct it in code; `from_json` accepts the same fields
/// in camelCase, all optional:
///
/// ```json
/// { "maxDepth": 64, "strictOutcomeTypes": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum expression nesting. `None` leaves recursion unbounded.
    pub max_depth: Option<usize>,
    /// Reject `setOutcomeValue`/`lookupOutcomeValue` results whose
    /// cardinality or base type differs from the outcome declaration.
    /// Integer results may always be stored in float outcomes.
    pub strict_outcome_types: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: None,
            strict_outcome_types: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(v: &serde_json::Value) -> Result<EngineConfig, EvalError> {
        EngineConfig::deserialize(v).map_err(|e| {
            EvalError::Core(CoreError::Deserialize {
                message: format!("engine config: {}", e),
            })
        })
    }
}
