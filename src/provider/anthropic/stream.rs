use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::ChatCompletionStream;
use crate::stream::{SseDecoder, SseEvent, build_chunk};
use crate::types::{ChatCompletionChunk, FunctionCall, ToolCall, Usage};

use super::provider::PROVIDER_NAME;
use super::response::map_usage;
use super::types::AnthropicStreamEvent;

pub(crate) fn create_stream(
    body: HttpBodyStream,
    stream_id: String,
    model: String,
) -> ChatCompletionStream {
    Box::pin(AnthropicEventStream {
        decoder: SseDecoder::new(body, PROVIDER_NAME),
        stream_id,
        model,
        pending_usage: None,
        done: false,
    })
}

/// Classifies native stream events into normalized chunks.
///
/// `message_stop` is the terminal event; usage harvested from an earlier
/// `message_delta` is attached to the terminal chunk. Events with no
/// normalized equivalent produce nothing.
struct AnthropicEventStream {
    decoder: SseDecoder,
    stream_id: String,
    model: String,
    pending_usage: Option<Usage>,
    done: bool,
}

impl AnthropicEventStream {
    fn classify(&mut self, event: AnthropicStreamEvent) -> Option<ChatCompletionChunk> {
        match event.kind.as_str() {
            "content_block_delta" => {
                let delta = event.delta?;
                match delta.kind.as_deref() {
                    Some("text_delta") => Some(build_chunk(
                        &self.stream_id,
                        &self.model,
                        Some(delta.text.unwrap_or_default()),
                        None,
                        None,
                    )),
                    Some("input_json_delta") => {
                        // continuation of the most recently opened call, so no id
                        let fragment = delta.partial_json.unwrap_or_default();
                        Some(build_chunk(
                            &self.stream_id,
                            &self.model,
                            None,
                            None,
                            Some(vec![ToolCall {
                                id: String::new(),
                                kind: "function".to_string(),
                                function: FunctionCall {
                                    name: String::new(),
                                    arguments: fragment,
                                },
                            }]),
                        ))
                    }
                    _ => None,
                }
            }
            "content_block_start" => {
                let block = event.content_block?;
                if block.kind != "tool_use" {
                    return None;
                }
                Some(build_chunk(
                    &self.stream_id,
                    &self.model,
                    None,
                    None,
                    Some(vec![ToolCall {
                        id: block.id.unwrap_or_default(),
                        kind: "function".to_string(),
                        function: FunctionCall {
                            name: block.name.unwrap_or_default(),
                            arguments: String::new(),
                        },
                    }]),
                ))
            }
            "message_delta" => {
                // no chunk of its own; keep the usage for the terminal chunk
                if let Some(usage) = &event.usage {
                    self.pending_usage = Some(map_usage(usage));
                }
                None
            }
            "message_stop" => {
                self.done = true;
                let mut chunk = build_chunk(
                    &self.stream_id,
                    &self.model,
                    None,
                    Some("stop".to_string()),
                    None,
                );
                chunk.usage = self.pending_usage.take();
                Some(chunk)
            }
            _ => None,
        }
    }
}

impl Stream for AnthropicEventStream {
    type Item = Result<ChatCompletionChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut this.decoder).poll_next(cx) {
                Poll::Ready(Some(Ok(SseEvent::Data(data)))) => {
                    let event: AnthropicStreamEvent = match serde_json::from_str(&data) {
                        Ok(event) => event,
                        Err(err) => {
                            return Poll::Ready(Some(Err(LlmError::streaming(
                                PROVIDER_NAME,
                                format!("failed to parse stream event: {err}"),
                            ))));
                        }
                    };
                    match this.classify(event) {
                        Some(chunk) => return Poll::Ready(Some(Ok(chunk))),
                        None => continue,
                    }
                }
                Poll::Ready(Some(Ok(SseEvent::Done))) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use futures_util::stream;

    use super::*;
    use crate::http::TransportError;
    use crate::types::Role;

    fn sse_body(events: &[&str]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, TransportError>> = events
            .iter()
            .map(|payload| Ok(format!("data: {payload}\n\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    async fn collect(events: &[&str]) -> Vec<ChatCompletionChunk> {
        let mut stream = create_stream(
            sse_body(events),
            "chatcmpl-fixed".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
        );
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk.expect("chunk"));
        }
        chunks
    }

    #[tokio::test]
    async fn text_deltas_become_content_chunks() {
        let chunks = collect(&[
            r#"{"type":"message_start","message":{"id":"msg_1"}}"#,
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Once"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" upon"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"message_stop"}"#,
        ])
        .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].choices[0].delta.content.as_deref(), Some("Once"));
        assert_eq!(chunks[0].choices[0].delta.role, Some(Role::Assistant));
        assert_eq!(chunks[1].choices[0].delta.content.as_deref(), Some(" upon"));
        assert_eq!(chunks[2].choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(chunks[2].choices[0].delta.content.is_none());
        assert!(chunks.iter().all(|chunk| chunk.id == "chatcmpl-fixed"));
    }

    #[tokio::test]
    async fn tool_call_events_yield_start_and_fragment_chunks() {
        let chunks = collect(&[
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"f","input":{}}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{\"a\""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":":1}"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
        ])
        .await;

        // the block-stop event has no normalized equivalent, so exactly three
        assert_eq!(chunks.len(), 3);

        let start = &chunks[0].choices[0].delta.tool_calls.as_ref().expect("calls")[0];
        assert_eq!(start.id, "toolu_1");
        assert_eq!(start.function.name, "f");
        assert_eq!(start.function.arguments, "");

        let mut arguments = String::new();
        for chunk in &chunks {
            arguments.push_str(
                &chunk.choices[0].delta.tool_calls.as_ref().expect("calls")[0]
                    .function
                    .arguments,
            );
        }
        let parsed: serde_json::Value = serde_json::from_str(&arguments).expect("valid json");
        assert_eq!(parsed, serde_json::json!({ "a": 1 }));

        let fragment = &chunks[1].choices[0].delta.tool_calls.as_ref().expect("calls")[0];
        assert!(fragment.id.is_empty());
    }

    #[tokio::test]
    async fn message_delta_usage_lands_on_terminal_chunk() {
        let chunks = collect(&[
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#,
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"input_tokens":10,"output_tokens":5}}"#,
            r#"{"type":"message_stop"}"#,
        ])
        .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].usage.is_none());
        let usage = chunks[1].usage.expect("usage");
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn unrecognized_events_are_dropped_silently() {
        let chunks = collect(&[
            r#"{"type":"ping"}"#,
            r#"{"type":"message_start","message":{}}"#,
            r#"{"type":"message_stop"}"#,
        ])
        .await;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn nothing_is_yielded_after_message_stop() {
        let mut stream = create_stream(
            sse_body(&[
                r#"{"type":"message_stop"}"#,
                r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"late"}}"#,
            ]),
            "chatcmpl-x".to_string(),
            "m".to_string(),
        );

        let terminal = stream.next().await.expect("item").expect("chunk");
        assert_eq!(terminal.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(stream.next().await.is_none());
    }
}
