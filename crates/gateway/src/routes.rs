//! Route handlers.
//!
//! Ask routes always answer 200 with a well-formed body unless the turn
//! could not be recorded, which is a 500. Streaming routes send the raw
//! fragments as a chunked `text/plain` body; a recording failure aborts
//! the body after the last fragment.
//!
//! Error bodies carry a fixed message. Backend detail goes to the log only.

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use documentor_core::history::SessionId;
use documentor_core::message::Message;
use documentor_engine::{ChatResponse, FragmentStream};

use crate::SharedServices;

/// Build the routes over `services`.
pub fn router(services: SharedServices) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/agent", post(agent_handler))
        .route("/agent/stream", post(agent_stream_handler))
        .route("/sessions/{session_id}", delete(clear_session_handler))
        .route("/sessions/{session_id}/messages", get(session_messages_handler))
        .with_state(services)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(alias = "question")]
    pub user_question: String,

    /// Omit to use the shared default session.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionMessages {
    pub session_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub const NOT_RECORDED_ERROR: &str = "Conversation could not be recorded";
pub const NOT_CLEARED_ERROR: &str = "Session could not be cleared";
pub const UNAVAILABLE_ERROR: &str = "Session history is unavailable";

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn session_of(services: &SharedServices, request: &AskRequest) -> SessionId {
    SessionId::resolve(request.session_id.as_deref(), &services.default_session)
}

fn fragment_body(fragments: FragmentStream) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(fragments),
    )
        .into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

async fn chat_handler(
    State(services): State<SharedServices>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = session_of(&services, &request);
    info!(session_id = %session, "chat request");

    services
        .query
        .answer(&request.user_question, session.as_str())
        .await
        .map(Json)
        .map_err(|e| {
            error!(session_id = %session, error = %e, "Chat turn not recorded");
            internal_error(NOT_RECORDED_ERROR)
        })
}

async fn chat_stream_handler(
    State(services): State<SharedServices>,
    Json(request): Json<AskRequest>,
) -> Response {
    let session = session_of(&services, &request);
    info!(session_id = %session, "chat stream request");
    fragment_body(
        services
            .query
            .stream_answer(request.user_question, session.as_str()),
    )
}

async fn agent_handler(
    State(services): State<SharedServices>,
    Json(request): Json<AskRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = session_of(&services, &request);
    info!(session_id = %session, "agent request");

    services
        .agent
        .run_agent_query(&request.user_question, session.as_str())
        .await
        .map(Json)
        .map_err(|e| {
            error!(session_id = %session, error = %e, "Agent turn not recorded");
            internal_error(NOT_RECORDED_ERROR)
        })
}

async fn agent_stream_handler(
    State(services): State<SharedServices>,
    Json(request): Json<AskRequest>,
) -> Response {
    let session = session_of(&services, &request);
    info!(session_id = %session, "agent stream request");
    fragment_body(
        services
            .agent
            .stream_agent_answer(request.user_question, session.as_str()),
    )
}

async fn clear_session_handler(
    State(services): State<SharedServices>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    services.clear_session(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Session not cleared");
        internal_error(NOT_CLEARED_ERROR)
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_messages_handler(
    State(services): State<SharedServices>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionMessages>, ApiError> {
    let messages = services.history.get(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Session history not read");
        internal_error(UNAVAILABLE_ERROR)
    })?;
    Ok(Json(SessionMessages {
        session_id,
        messages,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Services;
    use async_trait::async_trait;
    use axum::http::Request;
    use documentor_core::error::{HistoryError, ProviderError};
    use documentor_core::history::{HistoryStore, MessageLog};
    use documentor_core::message::Role;
    use documentor_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use documentor_core::retriever::Passage;
    use documentor_core::tool::ToolRegistry;
    use documentor_engine::{
        AgentEngine, EMPTY_QUESTION_ANSWER, GenerationSettings, QueryEngine, SessionLocks,
    };
    use documentor_history::InMemoryHistory;
    use documentor_retrieval::KeywordRetriever;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers "echo: <question>".
    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let question = request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Human)
                .map(|m| m.text().into_owned())
                .unwrap_or_default();
            Ok(ProviderResponse {
                message: Message::ai(format!("echo: {question}")),
                usage: None,
                model: request.model,
            })
        }
    }

    struct BrokenHistory;

    #[async_trait]
    impl HistoryStore for BrokenHistory {
        fn name(&self) -> &str {
            "broken"
        }
        async fn get(&self, _: &str) -> Result<MessageLog, HistoryError> {
            Err(HistoryError::QueryFailed("database is locked".into()))
        }
        async fn append(&self, _: &str, _: Message) -> Result<(), HistoryError> {
            Err(HistoryError::Storage("database is locked".into()))
        }
        async fn clear(&self, _: &str) -> Result<(), HistoryError> {
            Err(HistoryError::Storage("database is locked".into()))
        }
    }

    fn services_with(history: Arc<dyn HistoryStore>) -> SharedServices {
        let provider: Arc<dyn Provider> = Arc::new(EchoProvider);
        let retriever = Arc::new(KeywordRetriever::from_passages(vec![
            Passage::new("Use Bearer tokens.").with_source("auth.md"),
        ]));
        let settings = GenerationSettings::new("test-model");
        let locks = Arc::new(SessionLocks::new());
        Arc::new(Services {
            query: QueryEngine::new(history.clone(), retriever, provider.clone(), settings.clone())
                .with_locks(locks.clone()),
            agent: AgentEngine::new(
                history.clone(),
                provider,
                Arc::new(ToolRegistry::new()),
                settings,
            )
            .with_locks(locks),
            history,
            default_session: "default".into(),
        })
    }

    pub(crate) fn services() -> SharedServices {
        services_with(Arc::new(InMemoryHistory::new()))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = router(services()).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn chat_answers_with_sources_and_records() {
        let state = services();
        let response = router(state.clone())
            .oneshot(post_json(
                "/chat",
                serde_json::json!({"user_question": "Which tokens?", "session_id": "s1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(chat.answer, "echo: Which tokens?");
        assert_eq!(chat.sources, Some(vec!["Use Bearer tokens.".to_string()]));

        let response = router(state)
            .oneshot(get_request("/sessions/s1/messages"))
            .await
            .unwrap();
        let log: SessionMessages = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(log.session_id, "s1");
        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.messages[0].role, Role::Human);
    }

    #[tokio::test]
    async fn missing_session_uses_default() {
        let state = services();
        router(state.clone())
            .oneshot(post_json("/chat", serde_json::json!({"user_question": "hi"})))
            .await
            .unwrap();
        assert_eq!(state.history.get("default").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_question_is_not_an_http_error() {
        let response = router(services())
            .oneshot(post_json("/chat", serde_json::json!({"user_question": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let chat: ChatResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(chat.answer, EMPTY_QUESTION_ANSWER);
    }

    #[tokio::test]
    async fn chat_stream_sends_plain_text() {
        let response = router(services())
            .oneshot(post_json(
                "/chat/stream",
                serde_json::json!({"user_question": "Which tokens?", "session_id": "s"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(text, "echo: Which tokens?");
    }

    #[tokio::test]
    async fn agent_route_has_null_sources() {
        let response = router(services())
            .oneshot(post_json(
                "/agent",
                serde_json::json!({"question": "Which tokens?", "session_id": "a"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json["answer"], "echo: Which tokens?");
        assert!(json["sources"].is_null());
    }

    #[tokio::test]
    async fn agent_stream_sends_final_step() {
        let response = router(services())
            .oneshot(post_json(
                "/agent/stream",
                serde_json::json!({"user_question": "ping", "session_id": "a"}),
            ))
            .await
            .unwrap();
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert_eq!(text, "echo: ping");
    }

    #[tokio::test]
    async fn clear_session_is_idempotent() {
        let state = services();
        state.history.append("s", Message::human("q")).await.unwrap();

        for _ in 0..2 {
            let response = router(state.clone())
                .oneshot(
                    Request::builder()
                        .method("DELETE")
                        .uri("/sessions/s")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }
        assert!(state.history.get("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_failure_is_500() {
        let response = router(services_with(Arc::new(BrokenHistory)))
            .oneshot(post_json("/chat", serde_json::json!({"user_question": "q"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: ErrorResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(err.error, NOT_RECORDED_ERROR);
        assert!(!err.error.contains("database"));
    }

    #[tokio::test]
    async fn session_routes_hide_backend_errors() {
        let state = services_with(Arc::new(BrokenHistory));
        let requests = [
            (
                Request::builder()
                    .method("DELETE")
                    .uri("/sessions/s")
                    .body(Body::empty())
                    .unwrap(),
                NOT_CLEARED_ERROR,
            ),
            (get_request("/sessions/s/messages"), UNAVAILABLE_ERROR),
            (
                post_json("/agent", serde_json::json!({"user_question": "q"})),
                NOT_RECORDED_ERROR,
            ),
        ];

        for (request, expected) in requests {
            let response = router(state.clone()).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body = String::from_utf8(body_bytes(response).await).unwrap();
            assert!(!body.contains("database is locked"));
            let err: ErrorResponse = serde_json::from_str(&body).unwrap();
            assert_eq!(err.error, expected);
        }
    }
}
