use crate::types::BaseType;

/// Errors raised while building the value model or the processing trees
/// from host-supplied data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A literal could not be coerced into its declared base type.
    ///
    /// Unparseable numbers are not reported here; they become NaN.
    #[error("cannot cast '{raw}' to {base_type}: {reason}")]
    Cast {
        base_type: BaseType,
        raw: String,
        reason: String,
    },

    /// Malformed host JSON for a declaration or tree.
    #[error("deserialization error: {message}")]
    Deserialize { message: String },

    /// A rule tag that is not part of the response-processing language.
    #[error("unknown response rule: {tag}")]
    UnknownRule { tag: String },
}
