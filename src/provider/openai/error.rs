use serde::Deserialize;
use serde_json::Value;

use crate::error::LlmError;

use super::provider::PROVIDER_NAME;

/// Extracts the human-readable message out of a native error payload.
///
/// The API reports `{"error": {"message", "type", "code"}}`; the code is
/// appended to the message when present. Unparseable bodies are surfaced
/// verbatim together with the status.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(error) = parsed.error {
            let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
            if let Some(code) = error.code.as_ref().and_then(Value::as_str) {
                message = format!("{message} ({code})");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_and_code() {
        let body = r#"{
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        }"#;
        let err = parse_api_error(401, body);
        match err {
            LlmError::Api {
                provider,
                message,
                status,
            } => {
                assert_eq!(provider, "openai");
                assert!(message.contains("Incorrect API key provided"));
                assert!(message.contains("invalid_api_key"));
                assert_eq!(status, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_body() {
        let err = parse_api_error(502, "bad gateway");
        match err {
            LlmError::Api { message, .. } => {
                assert_eq!(message, "status 502: bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
