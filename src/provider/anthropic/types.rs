use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Non-streaming response payload returned by the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnthropicMessage {
    /// Some compatibility layers omit the `id`, so keep it optional.
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) model: Option<String>,
    /// Ordered list of content blocks.
    #[serde(default)]
    pub(crate) content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub(crate) stop_reason: Option<String>,
    #[serde(default)]
    pub(crate) usage: Option<AnthropicUsage>,
}

/// Single content block (`text` or `tool_use` here; anything else is ignored).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnthropicContentBlock {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) input: Option<Value>,
}

/// Usage counters; the sole cost unit is input/output tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnthropicUsage {
    #[serde(default)]
    pub(crate) input_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<u64>,
}

/// One SSE payload of a streaming message.
///
/// The event type lives inside the JSON; the fields populated depend on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) content_block: Option<AnthropicContentBlock>,
    #[serde(default)]
    pub(crate) delta: Option<AnthropicStreamDelta>,
    /// Attached to `message_delta` events.
    #[serde(default)]
    pub(crate) usage: Option<AnthropicUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AnthropicStreamDelta {
    #[serde(rename = "type", default)]
    pub(crate) kind: Option<String>,
    /// Set for `text_delta`.
    #[serde(default)]
    pub(crate) text: Option<String>,
    /// Set for `input_json_delta`; a fragment of the arguments string.
    #[serde(default)]
    pub(crate) partial_json: Option<String>,
}
