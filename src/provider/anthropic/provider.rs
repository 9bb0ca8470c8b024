use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;
use crate::http::{DynHttpTransport, post_json, post_json_stream};
use crate::provider::{ChatCompletionStream, ChatProvider, RequestOptions};
use crate::stream::{CancellableStream, collect_stream_text, generate_stream_id};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

use super::error::{error_message, parse_api_error};
use super::request::build_anthropic_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::AnthropicMessage;

pub(crate) const PROVIDER_NAME: &str = "anthropic";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";

/// Anthropic Messages Driver
pub struct AnthropicProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
}

impl AnthropicProvider {
    /// 使用默认 base_url 与 anthropic-version 创建 Driver
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// 自定义 base_url，便于接入代理或兼容层
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 自定义 Anthropic API 版本（anthropic-version）
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/messages")
        } else {
            format!("{base}/v1/messages")
        }
    }

    fn build_headers(&self, options: &RequestOptions) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.extend(options.headers.clone());
        headers
    }

    fn aborted() -> LlmError {
        LlmError::Aborted {
            message: "request cancelled by caller signal".to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionResponse, LlmError> {
        if request.stream == Some(true) {
            return Err(LlmError::StreamingNotSupported {
                provider: PROVIDER_NAME,
            });
        }

        let options = options.unwrap_or_default();
        let body = build_anthropic_body(&request, &request.model)?;
        tracing::debug!(provider = PROVIDER_NAME, model = %request.model, "sending chat completion");

        let future = post_json(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(&options),
            &body,
            options.timeout,
        );
        let response = match &options.signal {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(Self::aborted()),
                result = future => result,
            },
            None => future.await,
        }
        .map_err(|err| LlmError::api(PROVIDER_NAME, err.to_string()))?;

        let status = response.status;
        let text = response
            .into_string()
            .map_err(|err| LlmError::api(PROVIDER_NAME, err.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(parse_api_error(status, &text));
        }

        let parsed: AnthropicMessage = serde_json::from_str(&text).map_err(|err| {
            LlmError::api(PROVIDER_NAME, format!("failed to parse response: {err}"))
        })?;
        map_response(parsed, &request.model)
    }

    async fn stream_chat_completion(
        &self,
        request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionStream, LlmError> {
        let options = options.unwrap_or_default();
        let mut body = build_anthropic_body(&request, &request.model)?;
        if let Value::Object(map) = &mut body {
            // transport mode is this operation's decision, not the caller flag's
            map.insert("stream".to_string(), Value::Bool(true));
        }
        tracing::debug!(provider = PROVIDER_NAME, model = %request.model, "opening completion stream");

        let future = post_json_stream(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(&options),
            &body,
            options.timeout,
        );
        let response = match &options.signal {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(Self::aborted()),
                result = future => result,
            },
            None => future.await,
        }
        .map_err(|err| LlmError::streaming(PROVIDER_NAME, err.to_string()))?;

        if !(200..300).contains(&response.status) {
            let text = collect_stream_text(response.body, PROVIDER_NAME).await?;
            return Err(LlmError::streaming(
                PROVIDER_NAME,
                error_message(response.status, &text),
            ));
        }

        let stream = create_stream(response.body, generate_stream_id(), request.model);
        Ok(match options.signal {
            Some(token) => Box::pin(CancellableStream::new(stream, token)),
            None => stream,
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport, TransportError};
    use crate::types::ChatMessage;

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

    #[tokio::test]
    async fn stream_flag_fails_before_any_transport_call() {
        let provider = AnthropicProvider::new(Arc::new(PanicTransport), "sk-ant-test");
        let request = ChatCompletionRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![ChatMessage::user("hi")],
            stream: Some(true),
            ..Default::default()
        };

        let err = provider
            .chat_completion(request, None)
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            LlmError::StreamingNotSupported {
                provider: "anthropic"
            }
        ));
    }

    #[test]
    fn endpoint_joins_base_url_variants() {
        let provider = AnthropicProvider::new(Arc::new(PanicTransport), "sk-ant-test");
        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");

        let provider = AnthropicProvider::new(Arc::new(PanicTransport), "sk-ant-test")
            .with_base_url("https://gateway.example/v1");
        assert_eq!(provider.endpoint(), "https://gateway.example/v1/messages");
    }

    #[test]
    fn headers_carry_key_version_and_caller_extras() {
        let provider = AnthropicProvider::new(Arc::new(PanicTransport), "sk-ant-test")
            .with_version("2024-01-01");
        let mut options = RequestOptions::default();
        options
            .headers
            .insert("anthropic-beta".to_string(), "tools-2024".to_string());

        let headers = provider.build_headers(&options);
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("sk-ant-test"));
        assert_eq!(
            headers.get("anthropic-version").map(String::as_str),
            Some("2024-01-01")
        );
        assert_eq!(
            headers.get("anthropic-beta").map(String::as_str),
            Some("tools-2024")
        );
    }
}
