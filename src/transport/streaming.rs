//! Streaming chat transport.
//!
//! [`StreamingTransport`] opens a server-push connection scoped to one chat
//! turn and exposes it as a typed [`StreamEventStream`]. The adapter owns
//! no callback wiring: the turn controller simply awaits the stream, and
//! dropping it releases the connection (cancellation is first-class).
//!
//! Each SSE frame's data payload is one JSON wire event:
//!
//! ```text
//! data: {"event":"content","data":"Hi"}
//! data: {"event":"content","data":" there"}
//! data: {"event":"done"}
//! ```
//!
//! A stream that ends without a `done` (or `error`) event is reported as an
//! error event, so the turn controller can apply its normal failure
//! semantics.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::FlowChatError;
use crate::events::{StreamEvent, StreamEventStream};

use super::TurnRequest;
use super::sse::{FrameDecoder, SseFrame};

/// Opens one server-push connection per chat turn.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Open a stream for one turn against the given conversation.
    ///
    /// # Errors
    ///
    /// Fails if the connection cannot be established at all; errors after
    /// the stream is open arrive as [`StreamEvent::Error`] events instead.
    async fn open_turn_stream(
        &self,
        conversation_id: &str,
        request: &TurnRequest,
    ) -> Result<StreamEventStream, FlowChatError>;
}

/// One JSON event as the backend puts it on the wire.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WireEvent {
    /// A fragment of assistant text.
    Content {
        /// The text fragment.
        data: String,
    },
    /// The turn finished normally.
    Done,
    /// The turn failed server-side.
    Error {
        /// Backend-supplied failure description.
        #[serde(default)]
        message: String,
    },
}

/// Decode one SSE frame into a turn event.
///
/// The `[DONE]` sentinel maps to [`StreamEvent::Done`]; unparseable frames
/// are skipped (forward compatibility with new event types).
fn frame_to_event(frame: &SseFrame) -> Option<StreamEvent> {
    if frame.is_done_sentinel() {
        return Some(StreamEvent::Done);
    }
    match serde_json::from_str::<WireEvent>(&frame.data) {
        Ok(WireEvent::Content { data }) => Some(StreamEvent::Content { delta: data }),
        Ok(WireEvent::Done) => Some(StreamEvent::Done),
        Ok(WireEvent::Error { message }) => Some(StreamEvent::Error { message }),
        Err(_) => None,
    }
}

/// Convert a raw HTTP byte stream into a typed turn event stream.
///
/// The returned stream is terminal-safe: it yields at most one terminal
/// event ([`Done`](StreamEvent::Done) or [`Error`](StreamEvent::Error)) and
/// then ends. Byte-level read failures and EOF-without-done both surface as
/// error events.
pub fn decode_event_stream(
    byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
) -> StreamEventStream {
    Box::pin(async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        if let Some(event) = frame_to_event(&frame) {
                            let terminal = event.is_terminal();
                            yield event;
                            if terminal {
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield StreamEvent::Error {
                        message: format!("stream read error: {e}"),
                    };
                    return;
                }
            }
        }

        // EOF. Flush a trailing frame, then require a terminal event.
        if let Some(frame) = decoder.finish()
            && let Some(event) = frame_to_event(&frame)
        {
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                return;
            }
        }
        yield StreamEvent::Error {
            message: "stream ended without a done event".into(),
        };
    })
}
