use thiserror::Error;

/// Aggregates every failure mode exposed by the unified chat client.
///
/// The taxonomy is deliberately flat: one kind per caller-distinguishable
/// situation, each carrying the provider it originated from. Callers match on
/// the variant to decide whether to fix the request, fall back to another
/// provider, or surface the message as-is.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The composite model address could not be split into provider and model.
    #[error("invalid model format: {model:?}, expected \"provider:model\"")]
    InvalidModelFormat {
        /// The address as supplied by the caller.
        model: String,
    },
    /// The requested provider has no registered driver on this client.
    #[error("provider '{}' not configured, available: {}", .provider, .available.join(", "))]
    ProviderNotConfigured {
        /// Provider key parsed out of the model address.
        provider: String,
        /// Sorted list of provider keys that are configured.
        available: Vec<String>,
    },
    /// The provider API rejected or failed a single-shot request.
    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        /// Message extracted from the native error payload, kept verbatim.
        message: String,
        /// HTTP status of the failed response, when one was received.
        status: Option<u16>,
    },
    /// Stream setup or consumption failed.
    #[error("{provider} streaming error: {message}")]
    Streaming {
        provider: &'static str,
        message: String,
    },
    /// The single-shot operation was invoked with `stream: true`.
    #[error(
        "{provider}: streaming is not supported here, set stream to false or use the streaming operation"
    )]
    StreamingNotSupported { provider: &'static str },
    /// Tool-call payloads that cannot be translated, such as arguments that
    /// fail to parse as JSON.
    #[error("{provider} tool call error: {message}")]
    ToolCall {
        provider: &'static str,
        message: String,
    },
    /// The caller cancelled the request through its signal.
    #[error("request aborted: {message}")]
    Aborted { message: String },
}

impl LlmError {
    /// Creates an [`LlmError::Api`] without an HTTP status.
    ///
    /// # Examples
    ///
    /// ```
    /// use musubi::error::LlmError;
    ///
    /// let err = LlmError::api("openai", "connection reset");
    /// assert!(matches!(err, LlmError::Api { provider: "openai", .. }));
    /// ```
    pub fn api<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Api {
            provider,
            message: message.into(),
            status: None,
        }
    }

    /// Creates an [`LlmError::Streaming`] from a textual description.
    pub fn streaming<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Streaming {
            provider,
            message: message.into(),
        }
    }

    /// Creates an [`LlmError::ToolCall`] from a textual description.
    pub fn tool_call<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::ToolCall {
            provider,
            message: message.into(),
        }
    }

    /// Provider the failure is attributed to.
    ///
    /// Parsing failures happen before any provider is known and report
    /// `"unknown"`.
    pub fn provider(&self) -> &str {
        match self {
            Self::InvalidModelFormat { .. } | Self::Aborted { .. } => "unknown",
            Self::ProviderNotConfigured { provider, .. } => provider,
            Self::Api { provider, .. }
            | Self::Streaming { provider, .. }
            | Self::StreamingNotSupported { provider }
            | Self::ToolCall { provider, .. } => provider,
        }
    }

    /// Stable machine-readable code for the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidModelFormat { .. } => "INVALID_MODEL_FORMAT",
            Self::ProviderNotConfigured { .. } => "PROVIDER_NOT_CONFIGURED",
            Self::Api { .. } => "API_ERROR",
            Self::Streaming { .. } => "STREAMING_ERROR",
            Self::StreamingNotSupported { .. } => "STREAMING_NOT_SUPPORTED",
            Self::ToolCall { .. } => "TOOL_CALL_ERROR",
            Self::Aborted { .. } => "ABORTED",
        }
    }

    /// HTTP status attached to the failure, when one was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_failure_kinds() {
        let err = LlmError::InvalidModelFormat {
            model: "gpt-4o".to_string(),
        };
        assert_eq!(err.code(), "INVALID_MODEL_FORMAT");
        assert_eq!(err.provider(), "unknown");

        let err = LlmError::api("openai", "boom");
        assert_eq!(err.code(), "API_ERROR");
        assert_eq!(err.provider(), "openai");
        assert_eq!(err.http_status(), None);

        let err = LlmError::streaming("anthropic", "closed");
        assert_eq!(err.code(), "STREAMING_ERROR");

        let err = LlmError::StreamingNotSupported {
            provider: "anthropic",
        };
        assert_eq!(err.code(), "STREAMING_NOT_SUPPORTED");
    }

    #[test]
    fn not_configured_lists_available_providers() {
        let err = LlmError::ProviderNotConfigured {
            provider: "groq".to_string(),
            available: vec!["anthropic".to_string(), "openai".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("'groq'"), "unexpected message: {message}");
        assert!(
            message.contains("anthropic, openai"),
            "unexpected message: {message}"
        );
        assert_eq!(err.provider(), "groq");
    }

    #[test]
    fn api_error_carries_http_status() {
        let err = LlmError::Api {
            provider: "openai",
            message: "bad key".to_string(),
            status: Some(401),
        };
        assert_eq!(err.http_status(), Some(401));
    }
}
