use crate::error::LlmError;
use crate::stream::{generate_stream_id, unix_timestamp};
use crate::types::{
    ChatChoice, ChatCompletionResponse, ChatMessage, FunctionCall, Role, ToolCall, Usage,
};

use super::provider::PROVIDER_NAME;
use super::types::{AnthropicMessage, AnthropicUsage};

/// Maps a native message onto the normalized response shape.
///
/// The first `text` content block becomes the message content; every
/// `tool_use` block becomes a tool call with its input re-serialized to the
/// JSON-string form the normalized contract carries. Other block kinds are
/// ignored.
pub(crate) fn map_response(
    resp: AnthropicMessage,
    model: &str,
) -> Result<ChatCompletionResponse, LlmError> {
    let mut content: Option<String> = None;
    let mut tool_calls = Vec::new();

    for block in &resp.content {
        match block.kind.as_str() {
            "text" => {
                if content.is_none() {
                    content = Some(block.text.clone().unwrap_or_default());
                }
            }
            "tool_use" => {
                let input = block.input.clone().unwrap_or(serde_json::Value::Null);
                let arguments = serde_json::to_string(&input).map_err(|err| {
                    LlmError::tool_call(
                        PROVIDER_NAME,
                        format!("failed to serialize tool_use input: {err}"),
                    )
                })?;
                tool_calls.push(ToolCall {
                    id: block.id.clone().unwrap_or_default(),
                    kind: "function".to_string(),
                    function: FunctionCall {
                        name: block.name.clone().unwrap_or_default(),
                        arguments,
                    },
                });
            }
            _ => {}
        }
    }

    Ok(ChatCompletionResponse {
        id: resp.id.unwrap_or_else(generate_stream_id),
        object: "chat.completion".to_string(),
        created: unix_timestamp(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage {
                role: Role::Assistant,
                content: Some(content.unwrap_or_default()),
                name: None,
                tool_call_id: None,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
            },
            finish_reason: resp.stop_reason.unwrap_or_else(|| "stop".to_string()),
        }],
        usage: resp.usage.as_ref().map(map_usage).unwrap_or_default(),
        system_fingerprint: None,
    })
}

/// input → prompt, output → completion; the API reports no total.
pub(crate) fn map_usage(usage: &AnthropicUsage) -> Usage {
    let prompt_tokens = usage.input_tokens.unwrap_or(0);
    let completion_tokens = usage.output_tokens.unwrap_or(0);
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}
