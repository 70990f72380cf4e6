//! Error types for the request pipeline.
//!
//! # Design
//! URL assembly has its own small `UrlError` because `UrlBuilder` is usable
//! on its own. Everything the pipeline can raise lands in `ApiError`; the
//! dominant path callers handle is `Backend`, which carries the message the
//! backend put in its envelope. `SessionExpired` is the signal the calling
//! layer turns into a redirect to its login page.

use thiserror::Error;

/// Failures while assembling a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// `build()` was called before any authority was set.
    #[error("cannot build URL: no host was set")]
    MissingHost,

    /// A base URL string could not be parsed.
    #[error("malformed URL `{url}`: {reason}")]
    MalformedUrl { url: String, reason: String },
}

/// Errors returned by `RequestClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Url(#[from] UrlError),

    /// The response carried a content type the pipeline does not decode.
    #[error("unsupported response content type `{content_type}`")]
    UnsupportedResponseType { content_type: String },

    /// The decoded body is not an object or lacks the configured code field.
    #[error("invalid response format: expected an object with a `{code_field}` field")]
    InvalidResponseFormat { code_field: String },

    /// The envelope decoded fine but its code is not a success code.
    #[error("{message}")]
    Backend {
        code: Option<serde_json::Value>,
        message: String,
    },

    /// The session is no longer valid; the caller should navigate to `redirect_to`.
    #[error("session expired, redirecting to {redirect_to}")]
    SessionExpired { redirect_to: String },

    /// The transport could not complete the round-trip.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The client was configured inconsistently. This is a programming error.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// A hook aborted the call for its own reasons.
    #[error("interceptor rejected the call: {0}")]
    Interceptor(String),
}

impl ApiError {
    /// True when the failure should send the user back to the login page.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_backend_message_verbatim() {
        let err = ApiError::Backend {
            code: Some(serde_json::json!(1)),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn malformed_url_names_the_offending_input() {
        let err = UrlError::MalformedUrl {
            url: "::nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("::nope"));
    }

    #[test]
    fn url_errors_convert_into_api_errors() {
        let err: ApiError = UrlError::MissingHost.into();
        assert!(matches!(err, ApiError::Url(UrlError::MissingHost)));
        assert!(!err.is_session_expired());
    }
}
