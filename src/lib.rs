//! 多供应商 LLM 聊天补全统一调用库

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::{ChatCompletionResult, Client};
pub use config::{AnthropicConfig, OpenAiConfig, ProviderConfigs};
pub use error::LlmError;
pub use model::{ParsedModel, parse_model};
pub use provider::{ChatCompletionStream, ChatProvider, RequestOptions};
pub use types::*;
