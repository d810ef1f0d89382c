//! HTTP API gateway for Documentor.
//!
//! Exposes the conversation engines over REST:
//!
//! - `GET    /health`: liveness
//! - `POST   /chat`, `POST /chat/stream`: retrieval Q&A
//! - `POST   /agent`, `POST /agent/stream`: tool-using agent
//! - `DELETE /sessions/{id}`: clear a session
//! - `GET    /sessions/{id}/messages`: read a session log
//!
//! Built on Axum.

pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use documentor_config::{AppConfig, GatewayConfig};
use documentor_core::error::{HistoryError, RetrievalError};
use documentor_core::history::HistoryStore;
use documentor_engine::{AgentEngine, GenerationSettings, QueryEngine, SessionLocks, TurnError};

/// Failures while assembling or serving the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("No generation provider configured for '{0}'")]
    NoProvider(String),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request handler needs. Built once per process.
pub struct Services {
    pub query: QueryEngine,
    pub agent: AgentEngine,
    pub history: Arc<dyn HistoryStore>,
    /// Session used when a request names none. Shared by every such caller.
    pub default_session: String,
}

pub type SharedServices = Arc<Services>;

impl Services {
    /// Wire provider, retriever, tools and history from `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        let providers = documentor_providers::build_from_config(config);
        let provider = providers
            .default_provider()
            .ok_or_else(|| GatewayError::NoProvider(config.generation.provider.clone()))?;

        let retriever = documentor_retrieval::build_from_config(config, provider.clone())?;
        let history = documentor_history::build_from_config(config).await?;
        let tools = Arc::new(documentor_tools::registry_with(
            provider.clone(),
            retriever.clone(),
            &config.generation.model,
            &config.agent.tools,
        ));

        let settings = GenerationSettings::from_config(&config.generation);
        let locks = Arc::new(SessionLocks::new());

        let query = QueryEngine::new(history.clone(), retriever, provider.clone(), settings.clone())
            .with_top_k(config.retrieval.top_k)
            .with_locks(locks.clone());
        let agent = AgentEngine::new(history.clone(), provider, tools, settings)
            .with_max_iterations(config.agent.max_iterations)
            .with_locks(locks);

        info!(
            provider = %config.generation.provider,
            model = %config.generation.model,
            history = history.name(),
            "Services assembled"
        );

        Ok(Self {
            query,
            agent,
            history,
            default_session: config.session.default_session_id.clone(),
        })
    }

    /// Empty `session_id`, waiting for any turn running on it to record.
    pub async fn clear_session(&self, session_id: &str) -> Result<usize, TurnError> {
        self.query.clear_session(session_id).await
    }
}

/// Build the router with every route and the configured layers.
pub fn build_router(services: SharedServices, config: &GatewayConfig) -> Router {
    routes::router(services)
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until the process stops.
pub async fn start(config: AppConfig) -> Result<(), GatewayError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let services = Arc::new(Services::from_config(&config).await?);
    let app = build_router(services, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
