use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use serde::Serialize;
use thiserror::Error;

/// Failure raised below the provider layer.
///
/// Drivers wrap these into the caller-visible taxonomy: the single-shot path
/// reports them as API errors, the streaming path as streaming errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {message}")]
    Serialize { message: String },
    /// A header name or value was not valid for the underlying client.
    #[error("invalid header: {message}")]
    InvalidHeader { message: String },
    /// The request could not be sent or the response line never arrived.
    #[error("request failed: {message}")]
    Request { message: String },
    /// The response body could not be read or decoded.
    #[error("failed to read response body: {message}")]
    Body { message: String },
}

impl TransportError {
    pub(crate) fn request<T: Into<String>>(message: T) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub(crate) fn body<T: Into<String>>(message: T) -> Self {
        Self::Body {
            message: message.into(),
        }
    }
}

/// JSON POST request understood by the transport abstraction.
///
/// Every provider call in this crate is a JSON POST, so the request carries
/// no method field. Headers replace, not merge, the transport's defaults.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Option<Duration>,
}

/// Fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Converts the body into a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Body`] when the payload is not valid UTF-8.
    pub fn into_string(self) -> Result<String, TransportError> {
        String::from_utf8(self.body).map_err(|err| TransportError::body(err.to_string()))
    }
}

/// HTTP response whose body arrives incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Transport abstraction decoupling providers from the concrete HTTP client.
///
/// Tests substitute in-memory implementations; production code uses
/// [`reqwest::ReqwestTransport`](crate::http::reqwest::ReqwestTransport).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves once the full response is buffered.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Sends a request and returns the response with a streaming body.
    async fn send_stream(&self, request: HttpRequest)
    -> Result<HttpStreamResponse, TransportError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Serializes a body to JSON and issues a POST request.
///
/// Centralizes serialization and the `Content-Type` header so providers share
/// one code path for the buffered case.
///
/// # Errors
///
/// Returns [`TransportError::Serialize`] if serialization fails, otherwise
/// forwards the error raised by [`HttpTransport::send`].
pub async fn post_json<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
    timeout: Option<Duration>,
) -> Result<HttpResponse, TransportError> {
    transport.send(build_request(url, headers, body, timeout)?).await
}

/// Issues a JSON POST request and returns the streaming response.
///
/// Mirrors [`post_json`] for Server-Sent-Events endpoints.
pub async fn post_json_stream<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    body: &T,
    timeout: Option<Duration>,
) -> Result<HttpStreamResponse, TransportError> {
    transport
        .send_stream(build_request(url, headers, body, timeout)?)
        .await
}

fn build_request<T: Serialize>(
    url: impl Into<String>,
    mut headers: HashMap<String, String>,
    body: &T,
    timeout: Option<Duration>,
) -> Result<HttpRequest, TransportError> {
    let payload = serde_json::to_vec(body).map_err(|err| TransportError::Serialize {
        message: err.to_string(),
    })?;
    headers
        .entry("Content-Type".to_string())
        .or_insert_with(|| "application/json".to_string());
    Ok(HttpRequest {
        url: url.into(),
        headers,
        body: payload,
        timeout,
    })
}

pub mod reqwest;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser;

    /// Transport that panics if any request reaches it.
    struct PanicTransport;

    #[async_trait]
    impl HttpTransport for PanicTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            panic!("send should not be called");
        }

        async fn send_stream(
            &self,
            _request: HttpRequest,
        ) -> Result<HttpStreamResponse, TransportError> {
            panic!("send_stream should not be called");
        }
    }

    /// Transport that echoes the request body back.
    struct EchoTransport;

    #[async_trait]
    impl HttpTransport for EchoTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            assert_eq!(
                request.headers.get("Content-Type").map(String::as_str),
                Some("application/json")
            );
            Ok(HttpResponse {
                status: 200,
                body: request.body,
            })
        }

        async fn send_stream(
            &self,
            _request: HttpRequest,
        ) -> Result<HttpStreamResponse, TransportError> {
            panic!("streaming not used in this test");
        }
    }

    struct NonSerializableBody;

    impl Serialize for NonSerializableBody {
        fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            Err(ser::Error::custom("intentional serialization failure"))
        }
    }

    #[tokio::test]
    async fn post_json_serializes_and_stamps_content_type() {
        let response = post_json(
            &EchoTransport,
            "https://example.com",
            HashMap::new(),
            &serde_json::json!({"ping": "pong"}),
            None,
        )
        .await
        .expect("request");

        assert_eq!(response.status, 200);
        assert_eq!(response.into_string().expect("utf-8"), r#"{"ping":"pong"}"#);
    }

    #[tokio::test]
    async fn post_json_surfaces_serialization_failure_before_sending() {
        let result = post_json(
            &PanicTransport,
            "https://example.com",
            HashMap::new(),
            &NonSerializableBody,
            None,
        )
        .await;

        match result {
            Err(TransportError::Serialize { message }) => {
                assert!(
                    message.contains("intentional serialization failure"),
                    "unexpected message: {message}"
                );
            }
            other => panic!("expected serialize error, got {other:?}"),
        }
    }

    #[test]
    fn into_string_rejects_invalid_utf8() {
        let response = HttpResponse {
            status: 200,
            body: vec![0xff, 0xfe],
        };
        assert!(matches!(
            response.into_string(),
            Err(TransportError::Body { .. })
        ));
    }
}
