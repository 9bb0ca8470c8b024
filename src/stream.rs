//! Streaming-chunk helpers shared by every provider.
//!
//! Contains the SSE event decoder the provider streams are built on, the
//! normalized-chunk constructor, opaque stream-id generation, and the
//! cancellation wrapper attached when a caller supplies a signal.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_core::Stream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use uuid::Uuid;

use crate::error::LlmError;
use crate::http::HttpBodyStream;
use crate::provider::ChatCompletionStream;
use crate::types::{ChatCompletionChunk, ChatDelta, ChunkChoice, Role, ToolCall};

/// Standardized SSE event yielded by [`SseDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Raw `data:` payload emitted by the provider.
    Data(String),
    /// Terminal marker reported via `[DONE]`.
    Done,
}

/// Splits a raw HTTP body stream into SSE `data:` events.
///
/// Handles chunk boundaries falling inside lines, multi-line `data:` payloads
/// joined with `\n`, and the `[DONE]` marker (reported once). Lines other
/// than `data:` (`event:`, comments, ids) are ignored; the payloads here
/// carry their event type inside the JSON.
pub struct SseDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    data_lines: Vec<Vec<u8>>,
    pending: VecDeque<Result<SseEvent, LlmError>>,
    provider: &'static str,
    stream_closed: bool,
    done_received: bool,
}

impl SseDecoder {
    /// Wraps a raw HTTP body stream and prepares it for SSE decoding.
    pub fn new(body: HttpBodyStream, provider: &'static str) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            data_lines: Vec::new(),
            pending: VecDeque::new(),
            provider,
            stream_closed: false,
            done_received: false,
        }
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        if line.starts_with(b"data:") {
            let mut data = line[5..].to_vec();
            if data.first() == Some(&b' ') {
                data.remove(0);
            }
            self.data_lines.push(data);
        }
    }

    fn flush_event(&mut self) -> Result<(), LlmError> {
        if self.data_lines.is_empty() {
            return Ok(());
        }

        let mut joined = Vec::new();
        for (idx, mut segment) in self.data_lines.drain(..).enumerate() {
            if idx > 0 {
                joined.push(b'\n');
            }
            joined.append(&mut segment);
        }

        if joined.is_empty() {
            return Ok(());
        }

        let data = String::from_utf8(joined).map_err(|err| {
            LlmError::streaming(self.provider, format!("invalid UTF-8 in stream chunk: {err}"))
        })?;

        if data.trim() == "[DONE]" {
            if !self.done_received {
                self.done_received = true;
                self.pending.push_back(Ok(SseEvent::Done));
            }
        } else {
            self.pending.push_back(Ok(SseEvent::Data(data)));
        }

        Ok(())
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for SseDecoder {
    type Item = Result<SseEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(event) = this.pending.pop_front() {
            return Poll::Ready(Some(event));
        }

        if this.done_received && this.pending.is_empty() {
            return Poll::Ready(None);
        }

        loop {
            if this.stream_closed {
                if !this.buffer.is_empty() {
                    let line = this.buffer.drain(..).collect::<Vec<u8>>();
                    this.handle_line(line);
                }
                if let Err(err) = this.flush_event() {
                    return Poll::Ready(Some(Err(err)));
                }
                return this
                    .pending
                    .pop_front()
                    .map_or(Poll::Ready(None), |event| Poll::Ready(Some(event)));
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(chunk_result)) => match chunk_result {
                    Ok(bytes) => {
                        this.buffer.extend_from_slice(&bytes);
                        while let Some(line) = Self::drain_line(&mut this.buffer) {
                            if line.is_empty() {
                                if let Err(err) = this.flush_event() {
                                    return Poll::Ready(Some(Err(err)));
                                }
                                if let Some(event) = this.pending.pop_front() {
                                    return Poll::Ready(Some(event));
                                }
                            } else {
                                this.handle_line(line);
                            }
                        }
                        if let Some(event) = this.pending.pop_front() {
                            return Poll::Ready(Some(event));
                        }
                    }
                    Err(err) => {
                        return Poll::Ready(Some(Err(LlmError::streaming(
                            this.provider,
                            err.to_string(),
                        ))));
                    }
                },
                Poll::Ready(None) => {
                    this.stream_closed = true;
                    continue;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Buffers a streaming error body so its message can be surfaced.
pub(crate) async fn collect_stream_text(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LlmError> {
    use futures_util::StreamExt;

    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|err| LlmError::streaming(provider, err.to_string()))?;
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|err| {
        LlmError::streaming(provider, format!("failed to decode stream error body: {err}"))
    })
}

/// Generates the opaque id shared by every chunk of one stream.
pub(crate) fn generate_stream_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4().simple())
}

/// Current unix timestamp in seconds.
pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Builds a single-choice normalized chunk.
///
/// The delta's role is always `assistant`; only the fields the native event
/// contributed are set.
pub(crate) fn build_chunk(
    id: &str,
    model: &str,
    content: Option<String>,
    finish_reason: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created: unix_timestamp(),
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: ChatDelta {
                role: Some(Role::Assistant),
                content,
                tool_calls,
            },
            finish_reason,
        }],
        usage: None,
    }
}

/// Chunk stream that honors a caller-supplied cancellation token.
///
/// When the token fires, the inner stream is dropped, which closes the native
/// HTTP connection; dropping happens at most once no matter how often the
/// token is observed. The next pull yields a single abort error, and every
/// pull after that reports end of stream. Chunks already yielded stay valid.
pub(crate) struct CancellableStream {
    inner: Option<ChatCompletionStream>,
    token: CancellationToken,
    waiter: Pin<Box<WaitForCancellationFutureOwned>>,
    aborted: bool,
}

impl CancellableStream {
    pub(crate) fn new(inner: ChatCompletionStream, token: CancellationToken) -> Self {
        let waiter = Box::pin(token.clone().cancelled_owned());
        Self {
            inner: Some(inner),
            token,
            waiter,
            aborted: false,
        }
    }

    fn poll_cancelled(&mut self) -> Poll<Option<Result<ChatCompletionChunk, LlmError>>> {
        if self.inner.take().is_some() {
            tracing::debug!("closing native stream after cancellation");
        }
        if !self.aborted {
            self.aborted = true;
            return Poll::Ready(Some(Err(LlmError::Aborted {
                message: "stream cancelled by caller signal".to_string(),
            })));
        }
        Poll::Ready(None)
    }
}

impl Stream for CancellableStream {
    type Item = Result<ChatCompletionChunk, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // A fired token wins over anything the inner stream still buffers.
        if this.token.is_cancelled() {
            return this.poll_cancelled();
        }

        // Register for wakeup should the token fire while the body is idle.
        // The waiter is only polled before the token fires, so it is never
        // polled again after completing.
        if this.waiter.as_mut().poll(cx).is_ready() {
            return this.poll_cancelled();
        }

        match this.inner.as_mut() {
            Some(inner) => inner.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}
