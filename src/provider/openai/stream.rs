use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::ChatCompletionStream;
use crate::stream::{SseDecoder, SseEvent, unix_timestamp};
use crate::types::{ChatCompletionChunk, ChatDelta, ChunkChoice};

use super::provider::PROVIDER_NAME;
use super::response::{map_role, map_tool_call, map_usage};
use super::types::OpenAiStreamChunk;

pub(crate) fn create_stream(body: HttpBodyStream, stream_id: String, model: String) -> ChatCompletionStream {
    Box::pin(OpenAiEventStream {
        decoder: SseDecoder::new(body, PROVIDER_NAME),
        stream_id,
        model,
        done: false,
    })
}

/// Maps decoded SSE payloads onto normalized chunks until `[DONE]` arrives.
struct OpenAiEventStream {
    decoder: SseDecoder,
    stream_id: String,
    model: String,
    done: bool,
}

impl Stream for OpenAiEventStream {
    type Item = Result<ChatCompletionChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut this.decoder).poll_next(cx) {
                Poll::Ready(Some(Ok(SseEvent::Data(data)))) => {
                    let native: OpenAiStreamChunk = match serde_json::from_str(&data) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            return Poll::Ready(Some(Err(LlmError::streaming(
                                PROVIDER_NAME,
                                format!("failed to parse stream chunk: {err}"),
                            ))));
                        }
                    };
                    match convert_chunk(native, &this.stream_id, &this.model) {
                        Some(chunk) => return Poll::Ready(Some(Ok(chunk))),
                        // empty keep-alive payload, keep pulling
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

fn convert_chunk(
    native: OpenAiStreamChunk,
    stream_id: &str,
    fallback_model: &str,
) -> Option<ChatCompletionChunk> {
    if native.choices.is_empty() && native.usage.is_none() {
        return None;
    }

    let choices = native
        .choices
        .into_iter()
        .map(|choice| {
            let delta = choice.delta.unwrap_or(super::types::OpenAiStreamDelta {
                role: None,
                content: None,
                tool_calls: None,
            });
            ChunkChoice {
                index: choice.index,
                delta: ChatDelta {
                    role: delta.role.as_deref().map(|role| map_role(Some(role))),
                    content: delta.content.filter(|content| !content.is_empty()),
                    tool_calls: delta.tool_calls.map(|calls| {
                        calls
                            .into_iter()
                            .map(|call| {
                                map_tool_call(super::types::OpenAiToolCall {
                                    id: call.id,
                                    function: call.function,
                                })
                            })
                            .collect()
                    }),
                },
                finish_reason: choice.finish_reason,
            }
        })
        .collect();

    Some(ChatCompletionChunk {
        id: stream_id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created: native.created.unwrap_or_else(unix_timestamp),
        model: native.model.unwrap_or_else(|| fallback_model.to_string()),
        choices,
        usage: native.usage.as_ref().map(map_usage),
    })
}
