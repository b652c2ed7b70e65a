//! The turn controller: one user message in, one assistant reply out.
//!
//! Drives the per-turn state machine
//! `Idle → Sending → (Streaming | Awaiting) → Completed | Failed`
//! over the two transports:
//!
//! - Streaming is tried first. A transient failure or timeout **before any
//!   content** falls back silently to the unary transport. A failure
//!   **after partial content** keeps the partial text and surfaces a
//!   non-blocking notice; no fallback, since a partial answer already
//!   exists.
//! - HTTP 401 anywhere routes straight to a sign-in notice — no fallback
//!   attempt, and never the generic failure string.
//!
//! Cancellation is first-class: the caller's [`CancellationToken`] can
//! interrupt `Streaming` or `Awaiting` at any suspension point, and the
//! open transport is dropped as part of the transition.
//!
//! User-visible text is always one of the fixed strings on [`TurnNotice`]
//! or [`FAILURE_MESSAGE`]; transport error detail goes to `tracing` only.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TurnConfig;
use crate::error::FlowChatError;
use crate::events::StreamEvent;
use crate::session::Session;
use crate::transport::{StreamingTransport, TurnRequest, UnaryTransport};

/// How long to wait for the first stream event before falling back.
pub const FIRST_EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed user-facing text for a turn that failed with no content at all.
pub const FAILURE_MESSAGE: &str =
    "Sorry, I ran into a problem answering that. Please try again.";

/// Fixed user-facing text for a turn cancelled before any content arrived.
pub const CANCELLED_MESSAGE: &str = "Cancelled by user.";

/// The per-turn state machine.
///
/// `Completed` and `Failed` are terminal per turn; the controller returns
/// to `Idle` before `run_turn` resolves, ready for the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No active turn.
    Idle,
    /// User message appended; placeholder appended; transport being chosen.
    Sending,
    /// Streaming transport active.
    Streaming,
    /// Unary fallback active.
    Awaiting,
    /// Turn finished with a complete reply.
    Completed,
    /// Turn finished without a complete reply.
    Failed,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A complete reply was produced (streamed or via fallback).
    Completed,
    /// The turn failed; the placeholder holds partial text or a fixed
    /// failure/cancellation string.
    Failed,
}

/// A non-blocking notification for the embedding UI.
///
/// Carries only fixed, friendly strings; never backend error detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnNotice {
    /// The stream broke after partial content; the partial answer is kept.
    StreamInterrupted,
    /// The turn failed outright.
    RequestFailed,
    /// The user stopped the turn.
    Cancelled,
    /// Authentication expired; the UI must redirect to the login flow.
    AuthRequired,
}

impl TurnNotice {
    /// The fixed text shown to the user for this notice.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::StreamInterrupted => {
                "The connection was interrupted. The partial answer has been kept."
            }
            Self::RequestFailed => FAILURE_MESSAGE,
            Self::Cancelled => CANCELLED_MESSAGE,
            Self::AuthRequired => "Your session has expired. Please sign in again.",
        }
    }

    /// True if the UI should redirect to the login flow.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

/// The result of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// How the turn ended.
    pub outcome: TurnOutcome,
    /// A notification to surface, if any. `Completed` turns carry none.
    pub notice: Option<TurnNotice>,
}

impl TurnReport {
    fn completed() -> Self {
        Self {
            outcome: TurnOutcome::Completed,
            notice: None,
        }
    }

    fn failed(notice: TurnNotice) -> Self {
        Self {
            outcome: TurnOutcome::Failed,
            notice: Some(notice),
        }
    }
}

/// Orchestrates one chat turn across the two transports.
#[derive(Debug)]
pub struct TurnController<S, U> {
    streaming: S,
    unary: U,
    state: TurnState,
}

impl<S, U> TurnController<S, U>
where
    S: StreamingTransport,
    U: UnaryTransport,
{
    /// Create a controller over the given transports.
    pub fn new(streaming: S, unary: U) -> Self {
        Self {
            streaming,
            unary,
            state: TurnState::Idle,
        }
    }

    /// The current state. `Idle` between turns.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Run one turn: append the user message and a placeholder, stream the
    /// reply (falling back to unary when allowed), and finalize.
    ///
    /// Turns are strictly sequential; `cancel` interrupts the active
    /// transport at any point.
    ///
    /// # Errors
    ///
    /// Returns [`FlowChatError::TurnInProgress`] if a turn is already
    /// active. All other failures are absorbed into the [`TurnReport`]
    /// (the message list always ends in a consistent, non-streaming state).
    pub async fn run_turn(
        &mut self,
        session: &mut Session,
        conversation_id: &str,
        text: &str,
        config: TurnConfig,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, FlowChatError> {
        if self.state != TurnState::Idle {
            return Err(FlowChatError::TurnInProgress(
                "a turn is already active for this conversation".into(),
            ));
        }

        self.state = TurnState::Sending;
        session.push_user(text);
        let placeholder = match session.begin_assistant() {
            Ok(idx) => idx,
            Err(e) => {
                self.state = TurnState::Idle;
                return Err(e);
            }
        };

        let request = TurnRequest {
            message: text.to_owned(),
            session_id: session.id.clone(),
            workflow_id: conversation_id.to_owned(),
            config,
        };

        let report = self
            .drive(session, conversation_id, placeholder, &request, cancel)
            .await;
        self.state = TurnState::Idle;
        Ok(report)
    }

    /// Streaming phase, then fallback when it qualifies.
    async fn drive(
        &mut self,
        session: &mut Session,
        conversation_id: &str,
        placeholder: usize,
        request: &TurnRequest,
        cancel: &CancellationToken,
    ) -> TurnReport {
        self.state = TurnState::Streaming;

        // The open itself is raced against cancellation and the first-event
        // window: a backend that accepts the connection but never sends
        // headers must not stall the turn.
        let opened = tokio::select! {
            _ = cancel.cancelled() => {
                return self.finish_cancelled(session, placeholder);
            }
            opened = tokio::time::timeout(
                FIRST_EVENT_TIMEOUT,
                self.streaming.open_turn_stream(conversation_id, request),
            ) => opened,
        };

        let mut stream = match opened {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) if e.is_auth() => {
                warn!(conversation_id, error = %e, "authentication required");
                return self.finish_auth(session, placeholder);
            }
            Ok(Err(e)) if e.is_retryable() => {
                // No content can exist yet; a transient failure qualifies
                // for fallback.
                info!(conversation_id, error = %e, "stream open failed; falling back");
                return self
                    .fallback(session, conversation_id, placeholder, request, cancel)
                    .await;
            }
            Ok(Err(e)) => {
                warn!(conversation_id, error = %e, "stream open failed; not retryable");
                return self.finish_failed(session, placeholder);
            }
            Err(_) => {
                let e = FlowChatError::StreamTimeout(
                    "stream open exceeded the first-event window".into(),
                );
                warn!(conversation_id, error = %e, "falling back");
                return self
                    .fallback(session, conversation_id, placeholder, request, cancel)
                    .await;
            }
        };

        let mut got_content = false;
        loop {
            // The 10s window keeps guarding until the first event arrives;
            // once content flows, the stream is given as long as it needs.
            let next = if got_content {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return self.finish_cancelled(session, placeholder);
                    }
                    next = stream.next() => next,
                }
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return self.finish_cancelled(session, placeholder);
                    }
                    first = tokio::time::timeout(FIRST_EVENT_TIMEOUT, stream.next()) => {
                        match first {
                            Ok(event) => event,
                            Err(_) => {
                                let e = FlowChatError::StreamTimeout(
                                    "no stream event within the first-event window".into(),
                                );
                                warn!(conversation_id, error = %e, "falling back");
                                drop(stream);
                                return self
                                    .fallback(session, conversation_id, placeholder, request, cancel)
                                    .await;
                            }
                        }
                    }
                }
            };

            match next {
                Some(StreamEvent::Content { delta }) => {
                    got_content = true;
                    session.messages[placeholder].append_delta(&delta);
                }
                Some(StreamEvent::Done) => {
                    session.messages[placeholder].finalize();
                    self.state = TurnState::Completed;
                    debug!(conversation_id, "turn completed via stream");
                    return TurnReport::completed();
                }
                Some(StreamEvent::Error { message }) if !got_content => {
                    warn!(
                        conversation_id,
                        error = message.as_str(),
                        "stream failed before content; falling back"
                    );
                    drop(stream);
                    return self
                        .fallback(session, conversation_id, placeholder, request, cancel)
                        .await;
                }
                None if !got_content => {
                    warn!(conversation_id, "stream ended without events; falling back");
                    drop(stream);
                    return self
                        .fallback(session, conversation_id, placeholder, request, cancel)
                        .await;
                }
                Some(StreamEvent::Error { message }) => {
                    // Partial content exists: keep it, no fallback.
                    warn!(
                        conversation_id,
                        error = message.as_str(),
                        "stream failed after partial content"
                    );
                    session.messages[placeholder].finalize();
                    self.state = TurnState::Failed;
                    return TurnReport::failed(TurnNotice::StreamInterrupted);
                }
                None => {
                    // Stream ended without a terminal event after content.
                    warn!(conversation_id, "stream ended unexpectedly after partial content");
                    session.messages[placeholder].finalize();
                    self.state = TurnState::Failed;
                    return TurnReport::failed(TurnNotice::StreamInterrupted);
                }
            }
        }
    }

    /// Unary fallback phase. Only reached when the placeholder is empty.
    async fn fallback(
        &mut self,
        session: &mut Session,
        conversation_id: &str,
        placeholder: usize,
        request: &TurnRequest,
        cancel: &CancellationToken,
    ) -> TurnReport {
        self.state = TurnState::Awaiting;

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                return self.finish_cancelled(session, placeholder);
            }
            result = self.unary.send_turn(conversation_id, request) => result,
        };

        match result {
            Ok(text) => {
                session.messages[placeholder].set_content(text);
                session.messages[placeholder].finalize();
                self.state = TurnState::Completed;
                debug!(conversation_id, "turn completed via fallback");
                TurnReport::completed()
            }
            Err(e) if e.is_auth() => {
                warn!(conversation_id, error = %e, "authentication required");
                self.finish_auth(session, placeholder)
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "fallback request failed");
                self.finish_failed(session, placeholder)
            }
        }
    }

    /// Auth takes priority: never write the generic failure string, just
    /// freeze the placeholder and route to login.
    fn finish_auth(&mut self, session: &mut Session, placeholder: usize) -> TurnReport {
        session.messages[placeholder].finalize();
        self.state = TurnState::Failed;
        TurnReport::failed(TurnNotice::AuthRequired)
    }

    /// Terminal failure with no reply from either transport.
    fn finish_failed(&mut self, session: &mut Session, placeholder: usize) -> TurnReport {
        session.messages[placeholder].set_content(FAILURE_MESSAGE);
        session.messages[placeholder].finalize();
        self.state = TurnState::Failed;
        TurnReport::failed(TurnNotice::RequestFailed)
    }

    /// Stop the turn: freeze the placeholder (keeping any partial text) and
    /// report the cancellation. The open transport is dropped by the caller
    /// returning out of its select.
    fn finish_cancelled(&mut self, session: &mut Session, placeholder: usize) -> TurnReport {
        info!("turn cancelled by user");
        if session.messages[placeholder].is_empty() {
            session.messages[placeholder].set_content(CANCELLED_MESSAGE);
        }
        session.messages[placeholder].finalize();
        self.state = TurnState::Failed;
        TurnReport::failed(TurnNotice::Cancelled)
    }
}
