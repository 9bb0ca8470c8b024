use serde_json::{Map, Value};

use crate::error::LlmError;
use crate::types::ChatCompletionRequest;

use super::provider::PROVIDER_NAME;

/// 构建 Chat Completions 请求体
///
/// `stream` 字段从不写入请求体，由 Driver 在流式操作里自行追加，
/// 以避免调用方标志悄悄切换传输模式。
pub(crate) fn build_openai_body(
    request: &ChatCompletionRequest,
    model: &str,
) -> Result<Value, LlmError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), to_value(&request.messages)?);

    if let Some(tools) = &request.tools {
        body.insert("tools".to_string(), to_value(tools)?);
    }
    if let Some(choice) = &request.tool_choice {
        body.insert("tool_choice".to_string(), to_value(choice)?);
    }
    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(max_tokens) = request.max_tokens {
        body.insert("max_tokens".to_string(), Value::from(max_tokens));
    }
    if let Some(top_p) = request.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(penalty) = request.frequency_penalty {
        body.insert("frequency_penalty".to_string(), Value::from(penalty));
    }
    if let Some(penalty) = request.presence_penalty {
        body.insert("presence_penalty".to_string(), Value::from(penalty));
    }
    if let Some(stop) = &request.stop {
        // 单个字符串与列表两种形态原样透传
        body.insert("stop".to_string(), to_value(stop)?);
    }
    if let Some(user) = &request.user {
        body.insert("user".to_string(), Value::String(user.clone()));
    }

    Ok(Value::Object(body))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, LlmError> {
    serde_json::to_value(value)
        .map_err(|err| LlmError::api(PROVIDER_NAME, format!("failed to serialize request: {err}")))
}
