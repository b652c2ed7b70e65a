//! Error types for the flowchat crate.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via
//! [`FlowChatError::code()`]. Codes are part of the public API contract and
//! will not change.
//!
//! User-facing text is never derived from these errors: callers surface the
//! fixed notice strings in [`crate::turn`] and log the error detail instead.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// No provider/model could be resolved from any configuration layer.
    pub const CONFIG_UNRESOLVED: &str = "CONFIG_UNRESOLVED";

    /// Authentication failed (HTTP 401 or missing/expired token).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// Request to the flow backend failed.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// Streaming response encountered an error.
    pub const STREAM_FAILED: &str = "STREAM_FAILED";

    /// No stream event arrived within the allowed window.
    pub const STREAM_TIMEOUT: &str = "STREAM_TIMEOUT";

    /// The backend does not know the given session id.
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";

    /// The session id was rejected as malformed.
    pub const SESSION_ID_INVALID: &str = "SESSION_ID_INVALID";

    /// A turn is already active for this conversation.
    pub const TURN_IN_PROGRESS: &str = "TURN_IN_PROGRESS";

    /// Local key-value persistence failed.
    pub const STORAGE_FAILED: &str = "STORAGE_FAILED";
}

/// Errors produced by the flowchat crate.
///
/// Each variant includes a stable error code accessible via
/// [`FlowChatError::code()`]. The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum FlowChatError {
    /// No provider/model could be resolved from any configuration layer.
    #[error("[{}] {}", error_codes::CONFIG_UNRESOLVED, .0)]
    ConfigUnresolved(String),

    /// Authentication failed (HTTP 401 or missing/expired token).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// Request to the flow backend failed.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// Streaming response encountered an error.
    #[error("[{}] {}", error_codes::STREAM_FAILED, .0)]
    StreamError(String),

    /// No stream event arrived within the allowed window.
    #[error("[{}] {}", error_codes::STREAM_TIMEOUT, .0)]
    StreamTimeout(String),

    /// The backend does not know the given session id.
    #[error("[{}] session not found: {}", error_codes::SESSION_NOT_FOUND, .0)]
    SessionNotFound(String),

    /// The session id was rejected as malformed.
    #[error("[{}] invalid session id: {}", error_codes::SESSION_ID_INVALID, .0)]
    SessionIdInvalid(String),

    /// A turn is already active for this conversation.
    #[error("[{}] {}", error_codes::TURN_IN_PROGRESS, .0)]
    TurnInProgress(String),

    /// Local key-value persistence failed.
    #[error("[{}] {}", error_codes::STORAGE_FAILED, .0)]
    StorageError(String),
}

impl FlowChatError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigUnresolved(_) => error_codes::CONFIG_UNRESOLVED,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::StreamError(_) => error_codes::STREAM_FAILED,
            Self::StreamTimeout(_) => error_codes::STREAM_TIMEOUT,
            Self::SessionNotFound(_) => error_codes::SESSION_NOT_FOUND,
            Self::SessionIdInvalid(_) => error_codes::SESSION_ID_INVALID,
            Self::TurnInProgress(_) => error_codes::TURN_IN_PROGRESS,
            Self::StorageError(_) => error_codes::STORAGE_FAILED,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigUnresolved(m)
            | Self::AuthError(m)
            | Self::RequestError(m)
            | Self::StreamError(m)
            | Self::StreamTimeout(m)
            | Self::SessionNotFound(m)
            | Self::SessionIdInvalid(m)
            | Self::TurnInProgress(m)
            | Self::StorageError(m) => m,
        }
    }

    /// Returns true for session misses that are handled silently.
    ///
    /// A not-found or malformed session id means the stored identifier is
    /// stale: the caller discards it, mints a fresh one, and continues with
    /// an empty history. Nothing is surfaced to the user.
    pub fn is_benign_session_miss(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::SessionIdInvalid(_))
    }

    /// Returns true if this error means the user must re-authenticate.
    ///
    /// Auth failures take priority over every other error-handling path:
    /// the embedding UI redirects to the login flow instead of showing a
    /// generic failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthError(_))
    }

    /// Returns true if this error represents a transient failure.
    ///
    /// The turn controller uses this to decide whether a streaming failure
    /// qualifies for the unary fallback (request/stream/timeout errors do;
    /// auth, config, and session errors do not).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestError(_) | Self::StreamError(_) | Self::StreamTimeout(_) => true,
            Self::ConfigUnresolved(_)
            | Self::AuthError(_)
            | Self::SessionNotFound(_)
            | Self::SessionIdInvalid(_)
            | Self::TurnInProgress(_)
            | Self::StorageError(_) => false,
        }
    }
}

/// Convenience alias for flowchat results.
pub type Result<T> = std::result::Result<T, FlowChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_unresolved_code() {
        let err = FlowChatError::ConfigUnresolved("no provider/model available".into());
        assert_eq!(err.code(), "CONFIG_UNRESOLVED");
    }

    #[test]
    fn auth_error_code() {
        let err = FlowChatError::AuthError("401 from backend".into());
        assert_eq!(err.code(), "AUTH_FAILED");
    }

    #[test]
    fn request_error_code() {
        let err = FlowChatError::RequestError("connection refused".into());
        assert_eq!(err.code(), "REQUEST_FAILED");
    }

    #[test]
    fn stream_error_code() {
        let err = FlowChatError::StreamError("unexpected EOF".into());
        assert_eq!(err.code(), "STREAM_FAILED");
    }

    #[test]
    fn stream_timeout_code() {
        let err = FlowChatError::StreamTimeout("no event within 10s".into());
        assert_eq!(err.code(), "STREAM_TIMEOUT");
    }

    #[test]
    fn session_not_found_code_and_display() {
        let err = FlowChatError::SessionNotFound("sess_123".into());
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
        let display = format!("{err}");
        assert!(display.starts_with("[SESSION_NOT_FOUND]"));
        assert!(display.contains("sess_123"));
    }

    #[test]
    fn session_id_invalid_code() {
        let err = FlowChatError::SessionIdInvalid("not-a-session".into());
        assert_eq!(err.code(), "SESSION_ID_INVALID");
    }

    #[test]
    fn turn_in_progress_code() {
        let err = FlowChatError::TurnInProgress("send while turn active".into());
        assert_eq!(err.code(), "TURN_IN_PROGRESS");
    }

    #[test]
    fn storage_error_code() {
        let err = FlowChatError::StorageError("disk full".into());
        assert_eq!(err.code(), "STORAGE_FAILED");
    }

    #[test]
    fn display_includes_code_prefix() {
        let err = FlowChatError::RequestError("bad gateway".into());
        let display = format!("{err}");
        assert!(display.starts_with("[REQUEST_FAILED]"));
        assert!(display.contains("bad gateway"));
    }

    #[test]
    fn message_returns_inner_text() {
        let err = FlowChatError::StreamError("mid-stream reset".into());
        assert_eq!(err.message(), "mid-stream reset");
    }

    #[test]
    fn all_codes_are_screaming_snake_case() {
        let errors: Vec<FlowChatError> = vec![
            FlowChatError::ConfigUnresolved("x".into()),
            FlowChatError::AuthError("x".into()),
            FlowChatError::RequestError("x".into()),
            FlowChatError::StreamError("x".into()),
            FlowChatError::StreamTimeout("x".into()),
            FlowChatError::SessionNotFound("x".into()),
            FlowChatError::SessionIdInvalid("x".into()),
            FlowChatError::TurnInProgress("x".into()),
            FlowChatError::StorageError("x".into()),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_uppercase() || c == '_'),
                "code {code:?} is not SCREAMING_SNAKE_CASE"
            );
        }
    }

    // ── Classification ────────────────────────────────────────

    #[test]
    fn benign_session_miss_variants() {
        assert!(FlowChatError::SessionNotFound("s".into()).is_benign_session_miss());
        assert!(FlowChatError::SessionIdInvalid("s".into()).is_benign_session_miss());
        assert!(!FlowChatError::RequestError("s".into()).is_benign_session_miss());
        assert!(!FlowChatError::AuthError("s".into()).is_benign_session_miss());
    }

    #[test]
    fn auth_classification() {
        assert!(FlowChatError::AuthError("401".into()).is_auth());
        assert!(!FlowChatError::RequestError("500".into()).is_auth());
        assert!(!FlowChatError::SessionNotFound("s".into()).is_auth());
    }

    #[test]
    fn retryable_classification() {
        assert!(FlowChatError::RequestError("503".into()).is_retryable());
        assert!(FlowChatError::StreamError("reset".into()).is_retryable());
        assert!(FlowChatError::StreamTimeout("10s".into()).is_retryable());
        assert!(!FlowChatError::AuthError("401".into()).is_retryable());
        assert!(!FlowChatError::ConfigUnresolved("none".into()).is_retryable());
        assert!(!FlowChatError::SessionNotFound("s".into()).is_retryable());
        assert!(!FlowChatError::StorageError("io".into()).is_retryable());
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FlowChatError>();
    }
}
