//! Typed event model for one streaming chat turn.
//!
//! The streaming transport normalizes server-push output to
//! [`StreamEvent`], so the turn controller can `await` a typed stream
//! instead of wiring ad hoc callbacks. A well-behaved turn flows:
//!
//! ```text
//! Content* → Done
//! ```
//!
//! Anything else ends in an [`Error`](StreamEvent::Error) event. Dropping
//! the stream releases the underlying connection.

use std::pin::Pin;

use futures_util::Stream;

/// A normalized event from the streaming chat transport.
///
/// Events arrive in temporal order; content deltas are applied in receipt
/// order to the current assistant placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of assistant text to append to the placeholder.
    Content {
        /// The text fragment.
        delta: String,
    },

    /// The turn finished normally. Last event of a successful stream.
    Done,

    /// The stream failed. Terminal; no further events follow.
    Error {
        /// Description of what went wrong (logged, never shown verbatim).
        message: String,
    },
}

impl StreamEvent {
    /// True for terminal events ([`Done`](Self::Done) or
    /// [`Error`](Self::Error)).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

/// A boxed stream of turn events, scoped to a single chat turn.
pub type StreamEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_event_carries_delta() {
        let event = StreamEvent::Content {
            delta: "Hello".into(),
        };
        match &event {
            StreamEvent::Content { delta } => assert_eq!(delta, "Hello"),
            _ => unreachable!("expected Content"),
        }
    }

    #[test]
    fn terminal_classification() {
        assert!(StreamEvent::Done.is_terminal());
        assert!(
            StreamEvent::Error {
                message: "reset".into()
            }
            .is_terminal()
        );
        assert!(
            !StreamEvent::Content {
                delta: "hi".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn events_are_equal_when_identical() {
        let a = StreamEvent::Content { delta: "x".into() };
        let b = StreamEvent::Content { delta: "x".into() };
        assert_eq!(a, b);
        assert_ne!(a, StreamEvent::Done);
    }

    #[test]
    fn concatenated_deltas_reconstruct_reply() {
        let events = [
            StreamEvent::Content { delta: "Hi".into() },
            StreamEvent::Content {
                delta: " there".into(),
            },
            StreamEvent::Done,
        ];
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Content { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hi there");
    }

    #[test]
    fn events_are_debug_and_clone() {
        let event = StreamEvent::Error {
            message: "boom".into(),
        };
        let cloned = event.clone();
        assert_eq!(event, cloned);
        assert!(format!("{event:?}").contains("boom"));
    }
}
