//! HTTP client for the flow orchestration backend.
//!
//! [`FlowApi`] wraps a [`reqwest::Client`] with the backend base URL and a
//! bearer token read from the key-value store. It implements the three
//! seams the rest of the crate is written against — [`HistorySource`],
//! [`StreamingTransport`], and [`UnaryTransport`] — plus the flow, session,
//! and settings endpoints the embedding application needs.
//!
//! Non-2xx responses map onto [`FlowChatError`] variants: 401 is always an
//! auth error; on session-scoped endpoints, 404 (or a "not found" body)
//! means the session id is stale and 400 means it is malformed, both of
//! which callers treat as benign. Everything else becomes a request error
//! whose detail is logged, never shown to users.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{FlowDefaults, GlobalLlmConfig, MemoryConfig, SavedLlmConfig};
use crate::error::FlowChatError;
use crate::events::StreamEventStream;
use crate::session::{HistoryRecord, HistorySource};
use crate::store::{ACCESS_TOKEN_KEY, KvStore};
use crate::transport::unary::ChatResponse;
use crate::transport::{StreamingTransport, TurnRequest, UnaryTransport};
use crate::transport::streaming::decode_event_stream;

/// How long to wait for a connection to the backend.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One flow as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Stable flow identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the flow is deployed and can take chat turns.
    #[serde(default)]
    pub deployed: bool,
    /// LLM defaults declared by the flow itself, if any.
    #[serde(default)]
    pub defaults: Option<FlowDefaults>,
}

/// Payload for creating a new agent flow.
#[derive(Debug, Clone, Serialize)]
pub struct NewAgentflow {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A session as the backend returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPayload {
    /// The session identifier the backend stored the messages under.
    pub session_id: String,
    /// Prior messages, oldest first.
    #[serde(default)]
    pub messages: Vec<HistoryRecord>,
}

/// Client for the flow orchestration backend.
#[derive(Clone)]
pub struct FlowApi {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn KvStore>,
}

impl FlowApi {
    /// Create a client for the backend at `base_url`.
    ///
    /// The bearer token is looked up from the store on every request, so a
    /// token written by the host application after construction is picked up
    /// automatically.
    ///
    /// # Errors
    ///
    /// Returns [`FlowChatError::RequestError`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, store: Arc<dyn KvStore>) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FlowChatError::RequestError(format!("http client build failed: {e}")))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    /// The backend base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn bearer_token(&self) -> Option<String> {
        match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "access token lookup failed; sending unauthenticated");
                None
            }
        }
    }

    async fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = self.bearer_token().await {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a request and fail on non-2xx, with session-aware mapping.
    async fn expect_success(
        builder: reqwest::RequestBuilder,
        context: &str,
        session_id: Option<&str>,
    ) -> crate::error::Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| FlowChatError::RequestError(format!("{context}: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_failure(status, &body, context, session_id))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> crate::error::Result<T> {
        let response =
            Self::expect_success(self.request(Method::GET, path).await, context, None).await?;
        response
            .json()
            .await
            .map_err(|e| FlowChatError::RequestError(format!("{context}: bad payload: {e}")))
    }

    // ── flows ──

    /// List all agent flows.
    pub async fn get_agentflows(&self) -> crate::error::Result<Vec<FlowSummary>> {
        self.get_json("/api/workflows", "list flows").await
    }

    /// Fetch one flow by id.
    pub async fn get_flow(&self, flow_id: &str) -> crate::error::Result<FlowSummary> {
        self.get_json(&format!("/api/workflows/{flow_id}"), "fetch flow")
            .await
    }

    /// Create a new agent flow.
    pub async fn create_agentflow(
        &self,
        new_flow: &NewAgentflow,
    ) -> crate::error::Result<FlowSummary> {
        let response = Self::expect_success(
            self.request(Method::POST, "/api/workflows")
                .await
                .json(new_flow),
            "create flow",
            None,
        )
        .await?;
        response
            .json()
            .await
            .map_err(|e| FlowChatError::RequestError(format!("create flow: bad payload: {e}")))
    }

    /// Delete a flow.
    pub async fn delete_flow(&self, flow_id: &str) -> crate::error::Result<()> {
        Self::expect_success(
            self.request(Method::DELETE, &format!("/api/workflows/{flow_id}"))
                .await,
            "delete flow",
            None,
        )
        .await?;
        Ok(())
    }

    // ── sessions ──

    /// Fetch a chat session and its message history.
    ///
    /// # Errors
    ///
    /// [`FlowChatError::SessionNotFound`] / [`FlowChatError::SessionIdInvalid`]
    /// for stale or malformed ids; callers recover from both silently.
    pub async fn get_session(&self, session_id: &str) -> crate::error::Result<SessionPayload> {
        let response = Self::expect_success(
            self.request(Method::GET, &format!("/api/sessions/{session_id}"))
                .await,
            "fetch session",
            Some(session_id),
        )
        .await?;
        response
            .json()
            .await
            .map_err(|e| FlowChatError::RequestError(format!("fetch session: bad payload: {e}")))
    }

    /// Delete all server-side messages for a session. The id stays valid.
    pub async fn clear_chat_session(&self, session_id: &str) -> crate::error::Result<()> {
        Self::expect_success(
            self.request(Method::DELETE, &format!("/api/sessions/{session_id}/messages"))
                .await,
            "clear session",
            Some(session_id),
        )
        .await?;
        debug!(session_id, "server-side session cleared");
        Ok(())
    }

    /// Update the memory strategy attached to a session.
    pub async fn update_session_memory(
        &self,
        session_id: &str,
        memory: &MemoryConfig,
    ) -> crate::error::Result<()> {
        Self::expect_success(
            self.request(Method::PUT, &format!("/api/sessions/{session_id}/memory"))
                .await
                .json(memory),
            "update session memory",
            Some(session_id),
        )
        .await?;
        Ok(())
    }

    // ── settings ──

    /// Fetch the global LLM configuration and provider catalog.
    pub async fn get_configuration(&self) -> crate::error::Result<GlobalLlmConfig> {
        self.get_json("/api/settings/llm", "fetch configuration")
            .await
    }

    /// Fetch the saved per-flow LLM configuration, if any.
    ///
    /// A flow with no saved configuration is normal; that surfaces as a
    /// payload with `success == false` or empty fields, not an error.
    pub async fn get_chatflow_config(&self, flow_id: &str) -> crate::error::Result<SavedLlmConfig> {
        self.get_json(&format!("/api/workflows/{flow_id}/config"), "fetch flow config")
            .await
    }

    /// Save a per-flow LLM configuration.
    pub async fn update_chatflow_config(
        &self,
        flow_id: &str,
        config: &SavedLlmConfig,
    ) -> crate::error::Result<()> {
        Self::expect_success(
            self.request(Method::PUT, &format!("/api/workflows/{flow_id}/config"))
                .await
                .json(config),
            "save flow config",
            None,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl HistorySource for FlowApi {
    async fn fetch_history(&self, session_id: &str) -> crate::error::Result<Vec<HistoryRecord>> {
        Ok(self.get_session(session_id).await?.messages)
    }
}

#[async_trait]
impl StreamingTransport for FlowApi {
    async fn open_turn_stream(
        &self,
        conversation_id: &str,
        request: &TurnRequest,
    ) -> crate::error::Result<StreamEventStream> {
        let response = self
            .request(
                Method::POST,
                &format!("/api/workflows/{conversation_id}/chat/stream"),
            )
            .await
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| FlowChatError::StreamError(format!("open stream: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_failure(status, &body, "open stream", None));
        }
        Ok(decode_event_stream(response.bytes_stream()))
    }
}

#[async_trait]
impl UnaryTransport for FlowApi {
    async fn send_turn(
        &self,
        conversation_id: &str,
        request: &TurnRequest,
    ) -> crate::error::Result<String> {
        let response = Self::expect_success(
            self.request(
                Method::POST,
                &format!("/api/workflows/{conversation_id}/chat"),
            )
            .await
            .json(request),
            "chat",
            None,
        )
        .await?;
        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| FlowChatError::RequestError(format!("chat: bad payload: {e}")))?;
        payload.into_text()
    }
}

/// Map a non-2xx response onto an error variant.
///
/// `session_id` marks session-scoped endpoints, where 404 and 400 carry the
/// stale/malformed-id meaning the recovery paths rely on.
fn map_failure(
    status: StatusCode,
    body: &str,
    context: &str,
    session_id: Option<&str>,
) -> FlowChatError {
    if status == StatusCode::UNAUTHORIZED {
        return FlowChatError::AuthError(format!("{context}: HTTP 401"));
    }
    if let Some(session_id) = session_id {
        if status == StatusCode::NOT_FOUND || body.to_ascii_lowercase().contains("not found") {
            return FlowChatError::SessionNotFound(session_id.to_owned());
        }
        if status == StatusCode::BAD_REQUEST {
            return FlowChatError::SessionIdInvalid(session_id.to_owned());
        }
    }
    let detail = body.chars().take(200).collect::<String>();
    FlowChatError::RequestError(format!("{context}: HTTP {status}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── map_failure ──

    #[test]
    fn unauthorized_is_always_auth() {
        let err = map_failure(StatusCode::UNAUTHORIZED, "", "chat", None);
        assert!(err.is_auth());

        let err = map_failure(StatusCode::UNAUTHORIZED, "", "fetch session", Some("sess_1"));
        assert!(err.is_auth());
    }

    #[test]
    fn session_scoped_not_found_is_benign() {
        let err = map_failure(StatusCode::NOT_FOUND, "", "fetch session", Some("sess_1"));
        assert!(err.is_benign_session_miss());
        assert_eq!(err.code(), "SESSION_NOT_FOUND");
    }

    #[test]
    fn not_found_body_counts_even_with_other_status() {
        let err = map_failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Session not found"}"#,
            "fetch session",
            Some("sess_1"),
        );
        assert!(err.is_benign_session_miss());
    }

    #[test]
    fn session_scoped_bad_request_is_invalid_id() {
        let err = map_failure(StatusCode::BAD_REQUEST, "", "fetch session", Some("oops"));
        assert_eq!(err.code(), "SESSION_ID_INVALID");
        assert!(err.is_benign_session_miss());
    }

    #[test]
    fn unscoped_not_found_is_a_request_error() {
        let err = map_failure(StatusCode::NOT_FOUND, "", "fetch flow", None);
        assert_eq!(err.code(), "REQUEST_FAILED");
    }

    #[test]
    fn other_failures_keep_status_and_body_detail() {
        let err = map_failure(
            StatusCode::BAD_GATEWAY,
            "upstream exploded",
            "chat",
            None,
        );
        assert_eq!(err.code(), "REQUEST_FAILED");
        assert!(err.message().contains("502"));
        assert!(err.message().contains("upstream exploded"));
    }

    #[test]
    fn long_bodies_are_truncated_in_detail() {
        let body = "x".repeat(5000);
        let err = map_failure(StatusCode::BAD_GATEWAY, &body, "chat", None);
        assert!(err.message().len() < 300);
    }

    // ── construction ──

    #[tokio::test]
    async fn base_url_is_normalized() {
        let store = Arc::new(crate::store::MemoryKvStore::new());
        let api = FlowApi::new("http://localhost:3000///", store);
        match api {
            Ok(api) => assert_eq!(api.base_url(), "http://localhost:3000"),
            Err(_) => unreachable!("client builds"),
        }
    }
}
