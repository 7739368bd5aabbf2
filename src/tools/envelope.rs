//! Uniform success/error wrapper for tool results

use serde::Serialize;

use crate::Error;
use crate::protocol::{Content, ToolsCallResult};

/// Outcome of one tool call
///
/// Building an envelope never fails: a payload that cannot be serialized
/// becomes an [`ResultEnvelope::Error`] carrying the serialization cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultEnvelope {
    /// Successful call with its textual body
    Success {
        /// JSON or raw text
        body: String,
    },
    /// Failed call
    Error {
        /// Human-readable cause
        message: String,
    },
}

impl ResultEnvelope {
    /// Pretty-printed JSON body
    pub fn json<T: Serialize + ?Sized>(payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(body) => Self::Success { body },
            Err(e) => Self::from_error(&Error::Serialization(e.to_string())),
        }
    }

    /// Raw text body (file contents, confirmation messages)
    pub fn text(body: impl Into<String>) -> Self {
        Self::Success { body: body.into() }
    }

    /// Error with a message
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Error rendering `error`'s display chain
    pub fn from_error(error: &Error) -> Self {
        Self::error(error.to_string())
    }

    /// True for [`ResultEnvelope::Error`]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Body or error message
    #[must_use]
    pub fn text_content(&self) -> &str {
        match self {
            Self::Success { body } => body,
            Self::Error { message } => message,
        }
    }
}

impl<T: Serialize> From<Result<T, Error>> for ResultEnvelope {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(payload) => Self::json(&payload),
            Err(e) => Self::from_error(&e),
        }
    }
}

impl From<ResultEnvelope> for ToolsCallResult {
    fn from(envelope: ResultEnvelope) -> Self {
        let is_error = envelope.is_error();
        let text = match envelope {
            ResultEnvelope::Success { body } => body,
            ResultEnvelope::Error { message } => message,
        };
        Self {
            content: vec![Content::Text { text }],
            is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};
    use serde_json::{Value, json};
    use tool_args::ArgError;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic value"))
        }
    }

    #[test]
    fn json_body_decodes_to_original_fields() {
        let payload = json!({"id": 3, "name": "prod", "tagIds": [1, 2]});
        let envelope = ResultEnvelope::json(&payload);
        let decoded: Value = serde_json::from_str(envelope.text_content()).unwrap();
        assert_eq!(decoded, payload);
        assert!(!envelope.is_error());
    }

    #[test]
    fn serialization_failure_degrades_to_error() {
        let envelope = ResultEnvelope::json(&Unserializable);
        assert!(envelope.is_error());
        assert_eq!(envelope.text_content(), "failed to marshal result: cyclic value");
    }

    #[test]
    fn backend_error_keeps_operation_prefix() {
        let err = Error::backend(
            "failed to get environment",
            Error::Api {
                status: 404,
                message: "not found".into(),
            },
        );
        let envelope = ResultEnvelope::from(Err::<(), _>(err));
        assert_eq!(
            envelope.text_content(),
            "failed to get environment: API error (status 404): not found"
        );
    }

    #[test]
    fn argument_error_names_parameter() {
        let envelope = ResultEnvelope::from_error(&ArgError::missing("id").into());
        assert!(envelope.text_content().contains("invalid id parameter"));
    }

    #[test]
    fn converts_to_call_result_with_error_flag() {
        let result = ToolsCallResult::from(ResultEnvelope::error("boom"));
        assert!(result.is_error);
        assert_eq!(result.content[0].as_text(), "boom");

        let result = ToolsCallResult::from(ResultEnvelope::text("ok"));
        assert!(!result.is_error);
    }
}
