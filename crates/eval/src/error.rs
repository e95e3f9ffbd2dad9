use qti_core::CoreError;

/// Errors that abort an evaluation or a response-processing pass.
///
/// Numerically unusable operands (NaN after casting, infinities) are not
/// errors; the preprocessor drops them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Operand count, cardinality or base type outside an operator's contract.
    #[error("validation failed for '{operator}': {message}")]
    Validation { operator: String, message: String },

    /// No processor is registered for an expression tag.
    #[error("unknown expression: {tag}")]
    UnknownExpression { tag: String },

    /// A rule targets a variable that was never declared.
    #[error("missing variable: {identifier}")]
    MissingVariable { identifier: String },

    /// `customOperator` class could not be resolved by the host resolver.
    #[error("cannot resolve custom operator class '{class}'")]
    OperatorResolution { class: String },

    /// A required attribute is missing or malformed.
    #[error("invalid attribute '{attribute}' on '{tag}': {message}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        message: String,
    },

    /// An operand has a structure the operator cannot use.
    #[error("type error: {message}")]
    TypeError { message: String },

    /// Checked integer arithmetic overflowed.
    #[error("integer overflow in '{operator}'")]
    Overflow { operator: String },

    /// Assigned value does not fit the declared outcome (strict mode only).
    #[error("cannot assign {got} to outcome '{identifier}' declared as {expected}")]
    OutcomeTypeMismatch {
        identifier: String,
        expected: String,
        got: String,
    },

    /// The configured recursion guard was hit.
    #[error("expression depth exceeds limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EvalError {
    pub(crate) fn validation(operator: &str, message: impl Into<String>) -> Self {
        EvalError::Validation {
            operator: operator.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        EvalError::TypeError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = EvalError::validation("sum", "operand 1 has baseType string");
        assert_eq!(
            err.to_string(),
            "validation failed for 'sum': operand 1 has baseType string"
        );
        let err = EvalError::MissingVariable {
            identifier: "SCORE".to_string(),
        };
        assert_eq!(err.to_string(), "missing variable: SCORE");
    }

    #[test]
    fn core_errors_convert() {
        let err: EvalError = CoreError::UnknownRule {
            tag: "foo".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown response rule: foo");
    }
}
