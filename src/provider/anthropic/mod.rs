//! Anthropic Messages 供应商
//!
//! 与统一契约差异最大的一侧：system 消息上提、工具结果改写成
//! `tool_result` 块、流式事件重新分类。

mod error;
mod request;
mod response;
mod stream;
mod types;

mod provider;

pub use provider::AnthropicProvider;
