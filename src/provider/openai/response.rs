use crate::stream::unix_timestamp;
use crate::types::{
    ChatChoice, ChatCompletionResponse, ChatMessage, FunctionCall, Role, ToolCall, Usage,
};

use super::types::{OpenAiChatResponse, OpenAiToolCall, OpenAiUsage};

pub(crate) fn map_response(resp: OpenAiChatResponse) -> ChatCompletionResponse {
    let choices = resp
        .choices
        .into_iter()
        .map(|choice| {
            let message = choice.message.unwrap_or(super::types::OpenAiMessage {
                role: None,
                content: None,
                tool_calls: None,
            });
            ChatChoice {
                index: choice.index,
                message: ChatMessage {
                    role: map_role(message.role.as_deref()),
                    content: message.content,
                    name: None,
                    tool_call_id: None,
                    tool_calls: message
                        .tool_calls
                        .map(|calls| calls.into_iter().map(map_tool_call).collect()),
                },
                finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            }
        })
        .collect();

    ChatCompletionResponse {
        id: resp.id,
        object: "chat.completion".to_string(),
        created: resp.created.unwrap_or_else(unix_timestamp),
        model: resp.model,
        choices,
        usage: resp.usage.as_ref().map(map_usage).unwrap_or_default(),
        system_fingerprint: resp.system_fingerprint,
    }
}

pub(crate) fn map_role(role: Option<&str>) -> Role {
    match role {
        Some("system") => Role::System,
        Some("user") => Role::User,
        Some("tool") => Role::Tool,
        _ => Role::Assistant,
    }
}

pub(crate) fn map_tool_call(call: OpenAiToolCall) -> ToolCall {
    let function = call.function.unwrap_or(super::types::OpenAiFunction {
        name: None,
        arguments: None,
    });
    ToolCall {
        id: call.id.unwrap_or_default(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: function.name.unwrap_or_default(),
            arguments: function.arguments.unwrap_or_default(),
        },
    }
}

pub(crate) fn map_usage(usage: &OpenAiUsage) -> Usage {
    let prompt_tokens = usage.prompt_tokens.unwrap_or(0);
    let completion_tokens = usage.completion_tokens.unwrap_or(0);
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: usage
            .total_tokens
            .unwrap_or(prompt_tokens + completion_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> OpenAiChatResponse {
        serde_json::from_str(json).expect("native response")
    }

    #[test]
    fn maps_text_response() {
        let resp = parse(
            r#"{
                "id": "chatcmpl-abc",
                "object": "chat.completion",
                "created": 1731234567,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Hello there" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12 },
                "system_fingerprint": "fp_1"
            }"#,
        );

        let mapped = map_response(resp);
        assert_eq!(mapped.id, "chatcmpl-abc");
        assert_eq!(mapped.object, "chat.completion");
        assert_eq!(mapped.created, 1731234567);
        assert_eq!(mapped.choices.len(), 1);
        assert_eq!(mapped.choices[0].index, 0);
        assert_eq!(
            mapped.choices[0].message.content.as_deref(),
            Some("Hello there")
        );
        assert_eq!(mapped.choices[0].finish_reason, "stop");
        assert_eq!(mapped.usage.total_tokens, 12);
        assert_eq!(mapped.system_fingerprint.as_deref(), Some("fp_1"));
    }

    #[test]
    fn missing_finish_reason_defaults_to_stop() {
        let resp = parse(
            r#"{
                "id": "chatcmpl-abc",
                "model": "gpt-4o-mini",
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "x" } }]
            }"#,
        );
        let mapped = map_response(resp);
        assert_eq!(mapped.choices[0].finish_reason, "stop");
    }

    #[test]
    fn missing_usage_is_zero_filled() {
        let resp = parse(
            r#"{ "id": "chatcmpl-abc", "model": "gpt-4o-mini", "choices": [] }"#,
        );
        let mapped = map_response(resp);
        assert_eq!(mapped.usage, Usage::default());
    }

    #[test]
    fn tool_calls_pass_through_with_serialized_arguments() {
        let resp = parse(
            r#"{
                "id": "chatcmpl-abc",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_9",
                            "type": "function",
                            "function": { "name": "get_weather", "arguments": "{\"location\":\"Boston\"}" }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            }"#,
        );

        let mapped = map_response(resp);
        let calls = mapped.choices[0]
            .message
            .tool_calls
            .as_ref()
            .expect("tool calls");
        assert_eq!(calls[0].id, "call_9");
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.arguments, "{\"location\":\"Boston\"}");
        assert_eq!(mapped.choices[0].finish_reason, "tool_calls");
        assert!(mapped.choices[0].message.content.is_none());
    }
}
