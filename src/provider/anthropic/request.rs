use serde_json::{Map, Value, json};

use crate::error::LlmError;
use crate::types::{ChatCompletionRequest, ChatMessage, Role};

use super::provider::PROVIDER_NAME;

/// Messages API 要求必填 max_tokens 时的缺省值
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// 构建 Anthropic Messages 请求体
///
/// system 消息整体上提为顶层 `system` 字段；`stream` 由 Driver 在流式
/// 操作里自行追加，这里从不写入。
pub(crate) fn build_anthropic_body(
    request: &ChatCompletionRequest,
    model: &str,
) -> Result<Value, LlmError> {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "max_tokens".to_string(),
        Value::from(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    );

    let (system, messages) = transform_messages(&request.messages)?;
    body.insert("messages".to_string(), Value::Array(messages));
    if let Some(system) = system {
        body.insert("system".to_string(), Value::String(system));
    }

    if let Some(temperature) = request.temperature {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = request.top_p {
        body.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(stop) = &request.stop {
        // 原生字段是复数形式，单个字符串包装成单元素列表
        body.insert("stop_sequences".to_string(), json!(stop.to_vec()));
    }
    if let Some(tools) = &request.tools {
        let tools: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.function.name,
                    "description": tool.function.description,
                    "input_schema": tool.function.parameters,
                })
            })
            .collect();
        body.insert("tools".to_string(), Value::Array(tools));
    }

    Ok(Value::Object(body))
}

/// 拆出 system 文本并把其余消息翻译为原生格式 相对顺序保持不变
fn transform_messages(
    messages: &[ChatMessage],
) -> Result<(Option<String>, Vec<Value>), LlmError> {
    let mut system_texts = Vec::new();
    let mut native = Vec::new();

    for message in messages {
        match message.role {
            Role::System => {
                if let Some(content) = &message.content {
                    system_texts.push(content.clone());
                }
            }
            Role::Tool => native.push(convert_tool_message(message)?),
            Role::Assistant if message.tool_calls.is_some() => {
                native.push(convert_assistant_tool_calls(message)?);
            }
            Role::User | Role::Assistant => {
                let role = if message.role == Role::Assistant {
                    "assistant"
                } else {
                    "user"
                };
                native.push(json!({
                    "role": role,
                    "content": message.content.clone().unwrap_or_default(),
                }));
            }
        }
    }

    let system = if system_texts.is_empty() {
        None
    } else {
        Some(system_texts.join("\n"))
    };
    Ok((system, native))
}

/// `tool` 消息翻译为带 tool_result 块的 user 消息
fn convert_tool_message(message: &ChatMessage) -> Result<Value, LlmError> {
    let tool_use_id = message.tool_call_id.clone().ok_or_else(|| {
        LlmError::tool_call(PROVIDER_NAME, "tool message is missing tool_call_id")
    })?;
    Ok(json!({
        "role": "user",
        "content": [{
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": message.content.clone().unwrap_or_default(),
        }]
    }))
}

/// 携带 tool_calls 的 assistant 消息翻译为 text + tool_use 内容块序列
fn convert_assistant_tool_calls(message: &ChatMessage) -> Result<Value, LlmError> {
    let mut content = Vec::new();

    if let Some(text) = &message.content {
        if !text.is_empty() {
            content.push(json!({ "type": "text", "text": text }));
        }
    }

    for call in message.tool_calls.as_deref().unwrap_or_default() {
        // 原生格式期望结构化参数 统一契约携带的是 JSON 字符串
        let input: Value = serde_json::from_str(&call.function.arguments).map_err(|err| {
            LlmError::tool_call(
                PROVIDER_NAME,
                format!(
                    "tool call '{}' has arguments that are not valid JSON: {err}",
                    call.function.name
                ),
            )
        })?;
        content.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.function.name,
            "input": input,
        }));
    }

    Ok(json!({ "role": "assistant", "content": content }))
}
