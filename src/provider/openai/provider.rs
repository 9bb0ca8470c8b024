use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LlmError;
use crate::http::{DynHttpTransport, post_json, post_json_stream};
use crate::provider::{ChatCompletionStream, ChatProvider, RequestOptions};
use crate::stream::{CancellableStream, collect_stream_text, generate_stream_id};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

use super::error::{error_message, parse_api_error};
use super::request::build_openai_body;
use super::response::map_response;
use super::stream::create_stream;
use super::types::OpenAiChatResponse;

pub(crate) const PROVIDER_NAME: &str = "openai";

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions Driver
pub struct OpenAiProvider {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) organization: Option<String>,
}

impl OpenAiProvider {
    /// 创建带默认 base_url 的 Driver
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            organization: None,
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 配置组织 ID
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self, options: &RequestOptions) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(org) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), org.clone());
        }
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
impl ChatProvider for OpenAiProvider {
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
        let body = build_openai_body(&request, &request.model)?;
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

        let parsed: OpenAiChatResponse = serde_json::from_str(&text).map_err(|err| {
            LlmError::api(PROVIDER_NAME, format!("failed to parse response: {err}"))
        })?;
        Ok(map_response(parsed))
    }

    async fn stream_chat_completion(
        &self,
        request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionStream, LlmError> {
        let options = options.unwrap_or_default();
        let mut body = build_openai_body(&request, &request.model)?;
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
