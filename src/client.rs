use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProviderConfigs;
use crate::error::LlmError;
use crate::http::DynHttpTransport;
use crate::http::reqwest::ReqwestTransport;
use crate::model::parse_model;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::openai::OpenAiProvider;
use crate::provider::{ChatCompletionStream, DynProvider, RequestOptions};
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

/// 统一调用入口 负责维护已配置的 Provider 注册表
///
/// 注册表在构建时一次性生成 之后只读 同一实例可被并发使用
pub struct Client {
    providers: HashMap<String, DynProvider>,
}

/// 单次调用的结果 由请求的 `stream` 标志决定取哪一侧
pub enum ChatCompletionResult {
    /// 完整响应
    Response(ChatCompletionResponse),
    /// 惰性 Chunk 序列 只有开始消费才会产生数据
    Stream(ChatCompletionStream),
}

impl std::fmt::Debug for ChatCompletionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response(response) => f.debug_tuple("Response").field(response).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"..").finish(),
        }
    }
}

impl ChatCompletionResult {
    /// 取出完整响应 流式结果返回 None
    pub fn into_response(self) -> Option<ChatCompletionResponse> {
        match self {
            Self::Response(response) => Some(response),
            Self::Stream(_) => None,
        }
    }

    /// 取出 Chunk 流 非流式结果返回 None
    pub fn into_stream(self) -> Option<ChatCompletionStream> {
        match self {
            Self::Response(_) => None,
            Self::Stream(stream) => Some(stream),
        }
    }
}

impl Client {
    /// 使用默认 reqwest Transport 构建客户端
    ///
    /// # Panics
    ///
    /// 默认 TLS 后端初始化失败时 panic；需要自行处理时请使用
    /// [`Client::with_transport`]。
    pub fn new(config: ProviderConfigs) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::default()))
    }

    /// 注入自定义 Transport 构建客户端 供测试与代理场景使用
    pub fn with_transport(config: ProviderConfigs, transport: DynHttpTransport) -> Self {
        let mut providers: HashMap<String, DynProvider> = HashMap::new();

        if let Some(openai) = config.openai {
            let mut provider = OpenAiProvider::new(transport.clone(), openai.api_key);
            if let Some(base_url) = openai.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(organization) = openai.organization {
                provider = provider.with_organization(organization);
            }
            providers.insert("openai".to_string(), Arc::new(provider));
        }

        if let Some(anthropic) = config.anthropic {
            let mut provider = AnthropicProvider::new(transport.clone(), anthropic.api_key);
            if let Some(base_url) = anthropic.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(version) = anthropic.version {
                provider = provider.with_version(version);
            }
            providers.insert("anthropic".to_string(), Arc::new(provider));
        }

        Self { providers }
    }

    /// 已配置的供应商名称 排序后返回
    pub fn list_providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self.providers.keys().cloned().collect();
        providers.sort();
        providers
    }

    /// 查询某个供应商是否已配置
    pub fn is_provider_configured(&self, provider: &str) -> bool {
        self.providers.contains_key(provider)
    }

    /// 解析 `"provider:model"` 地址并把请求路由给对应 Driver
    ///
    /// 转发前把 `model` 重写为原生名称；`stream` 为 true 时走流式操作，
    /// 返回的序列在消费前不产生任何 Chunk。本层不捕获 Driver 错误，
    /// 也不做任何重试。
    pub async fn create_completion(
        &self,
        mut request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionResult, LlmError> {
        let parsed = parse_model(&request.model)?;
        let provider = self.providers.get(&parsed.provider).ok_or_else(|| {
            LlmError::ProviderNotConfigured {
                provider: parsed.provider.clone(),
                available: self.list_providers(),
            }
        })?;

        tracing::debug!(
            provider = %parsed.provider,
            model = %parsed.model,
            stream = request.stream.unwrap_or(false),
            "dispatching chat completion"
        );
        request.model = parsed.model;

        if request.stream == Some(true) {
            let stream = provider.stream_chat_completion(request, options).await?;
            Ok(ChatCompletionResult::Stream(stream))
        } else {
            let response = provider.chat_completion(request, options).await?;
            Ok(ChatCompletionResult::Response(response))
        }
    }
}
