use serde::Deserialize;

use crate::error::LlmError;

use super::provider::PROVIDER_NAME;

/// Extracts the human-readable message out of a native error payload.
///
/// The API reports `{"error": {"type", "message"}}`; the error type is
/// appended for context. Unparseable bodies are surfaced verbatim together
/// with the status.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(kind) = &error.kind {
                message = format!("{message} ({kind})");
            }
            return message;
        }
    }

    format!("status {status}: {body}")
}

/// Maps a non-2xx single-shot response onto the taxonomy.
pub(crate) fn parse_api_error(status: u16, body: &str) -> LlmError {
    LlmError::Api {
        provider: PROVIDER_NAME,
        message: error_message(status, body),
        status: Some(status),
    }
}
