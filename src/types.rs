//! Shared data structures modeling the normalized chat-completion contract.
//!
//! The normalized shape follows the OpenAI chat-completion dialect, which one
//! supported provider speaks natively; the other providers' adapters translate
//! to and from it. These types serialize to exactly that wire form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat role understood by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Normalized chat message shared across providers.
///
/// A `tool` message reports the result of an earlier tool call and must carry
/// `tool_call_id`; an `assistant` message may carry `tool_calls` instead of or
/// alongside `content`.
///
/// # Examples
///
/// ```
/// use musubi::types::ChatMessage;
///
/// let msg = ChatMessage::user("What is the weather in Boston?");
/// assert_eq!(msg.content.as_deref(), Some("What is the weather in Boston?"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role associated with this message.
    pub role: Role,
    /// Text content; absent for assistant messages that only call tools.
    pub content: Option<String>,
    /// Optional participant name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Identifier of the call a `tool` message responds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool invocations requested by an assistant message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    /// Builds a plain `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// Builds a plain `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Builds a plain `assistant` message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Builds a `tool` message carrying the result of the given call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            name: None,
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// Declarative definition of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Always `"function"` for the supported providers.
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl Tool {
    /// Builds a function tool from its definition.
    pub fn function(function: FunctionDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function,
        }
    }
}

/// Function signature exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Unique name the model uses to call the function.
    pub name: String,
    /// Natural-language description of what the function does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-schema object describing the parameters, carried through
    /// unchanged to every provider.
    pub parameters: Value,
}

/// Tool invocation emitted by the assistant.
///
/// `arguments` is a JSON-encoded string. During streaming it may hold only a
/// fragment; a call begins at a chunk with a non-empty `id`, and chunks with
/// an empty `id` but non-empty arguments continue the most recently opened
/// call until a terminal chunk or a new `id` appears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Always `"function"` for the supported providers.
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

/// Name and serialized arguments of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Arguments as a JSON-encoded string.
    pub arguments: String,
}

/// Strategy describing how tools may be invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// Keyword form, such as `"auto"` or `"none"`.
    Keyword(String),
    /// Force one specific function.
    Function(NamedToolChoice),
}

/// Tool-choice object forcing a specific function by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedToolChoice {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionName,
}

/// Function reference used inside [`NamedToolChoice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionName {
    pub name: String,
}

/// Stop sequences in either the single-string or list form.
///
/// Providers with a plural native field always receive the list form; a lone
/// string is wrapped into a one-element list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StopSequences {
    Single(String),
    Many(Vec<String>),
}

impl StopSequences {
    /// Returns the sequences as a list regardless of the original form.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::Single(stop) => vec![stop.clone()],
            Self::Many(stops) => stops.clone(),
        }
    }
}

/// Chat-completion request shared across all providers.
///
/// `model` uses the composite `"provider:model"` address; the client rewrites
/// it to the native name before a driver sees the request.
///
/// # Examples
///
/// ```
/// use musubi::types::{ChatCompletionRequest, ChatMessage};
///
/// let request = ChatCompletionRequest {
///     model: "openai:gpt-4o-mini".to_string(),
///     messages: vec![ChatMessage::user("Say hello.")],
///     temperature: Some(0.2),
///     ..Default::default()
/// };
/// assert!(request.stream.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Composite `"provider:model"` address.
    pub model: String,
    /// Ordered conversation history.
    pub messages: Vec<ChatMessage>,
    /// Tool definitions available to the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    /// Selects the streaming operation when routed through the client.
    /// Never forwarded inside a translated request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Opaque end-user identifier forwarded to providers that accept one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// One completion alternative inside a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Position within `choices`; always equals the element index.
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: String,
}

/// Token usage accounting, zero-filled when the provider reports nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Aggregated chat-completion response in the normalized shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    /// Always `"chat.completion"`.
    pub object: String,
    /// Unix timestamp in seconds.
    pub created: u64,
    /// Native model name the provider answered with.
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

/// Incremental message fields carried by a streaming chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// One choice inside a streaming chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Streaming chunk in the normalized shape.
///
/// Every chunk of one stream shares the same opaque `id`. `usage` appears
/// only on terminal chunks, and only for providers that report it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    /// Always `"chat.completion.chunk"`.
    pub object: String,
    /// Unix timestamp in seconds.
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_message_serializes_to_wire_shape() {
        let msg = ChatMessage::tool_result("call_1", "72F and sunny");
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            value,
            json!({
                "role": "tool",
                "content": "72F and sunny",
                "tool_call_id": "call_1"
            })
        );
    }

    #[test]
    fn assistant_tool_call_message_keeps_null_content() {
        let msg = ChatMessage {
            role: Role::Assistant,
            content: None,
            name: None,
            tool_call_id: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: "get_weather".to_string(),
                    arguments: "{\"location\":\"Boston, MA\"}".to_string(),
                },
            }]),
        };
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["tool_calls"][0]["type"], json!("function"));
        assert_eq!(value["tool_calls"][0]["function"]["name"], json!("get_weather"));
    }

    #[test]
    fn stop_sequences_accept_both_forms() {
        let single: StopSequences = serde_json::from_value(json!("END")).expect("single");
        let many: StopSequences = serde_json::from_value(json!(["END"])).expect("many");
        assert_eq!(single.to_vec(), vec!["END".to_string()]);
        assert_eq!(single.to_vec(), many.to_vec());
    }

    #[test]
    fn tool_choice_keyword_and_function_forms() {
        let auto: ToolChoice = serde_json::from_value(json!("auto")).expect("keyword");
        assert!(matches!(auto, ToolChoice::Keyword(ref k) if k == "auto"));

        let forced: ToolChoice = serde_json::from_value(json!({
            "type": "function",
            "function": { "name": "get_weather" }
        }))
        .expect("function");
        match forced {
            ToolChoice::Function(choice) => assert_eq!(choice.function.name, "get_weather"),
            other => panic!("unexpected form: {other:?}"),
        }
    }
}
