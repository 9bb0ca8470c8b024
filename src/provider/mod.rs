use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

pub mod anthropic;
pub mod openai;

/// 流式响应别名 按需拉取 单次消费
pub type ChatCompletionStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LlmError>> + Send>>;

/// 单次调用的可选项 透传给底层 Transport
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// 调用方取消信号
    pub signal: Option<CancellationToken>,
    /// 追加请求头 原样转发
    pub headers: HashMap<String, String>,
    /// 覆盖本次请求的超时
    pub timeout: Option<Duration>,
}

/// 统一的 Provider Trait 所有供应商实现该接口即可接入
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 提交完整请求并等待完整响应
    ///
    /// 当 `request.stream` 为 true 时直接返回
    /// [`LlmError::StreamingNotSupported`]，不会发起任何网络请求。
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionResponse, LlmError>;

    /// 以流式方式返回增量 Chunk
    async fn stream_chat_completion(
        &self,
        request: ChatCompletionRequest,
        options: Option<RequestOptions>,
    ) -> Result<ChatCompletionStream, LlmError>;

    /// 供应商名称 与注册键一致
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn ChatProvider>;
