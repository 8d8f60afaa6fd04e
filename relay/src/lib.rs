//! Portfolio chat relay.
//!
//! Accepts one visitor message on `POST /api/chat`, pairs it with a fixed
//! system prompt, forwards it to an OpenAI-compatible chat-completion API and
//! returns the reply text. The credential and prompt never leave the server.
//! Optionally serves the built site so it doubles as the local dev server.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod routes;
pub mod upstream;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use portfolio_common::wire::CHAT_PATH;

use crate::config::RelayConfig;
use crate::knowledge::KnowledgeSource;
use crate::upstream::OpenAiClient;

/// Read-only state shared by every request.
pub struct AppState {
    pub config: RelayConfig,
    pub upstream: OpenAiClient,
    pub knowledge: Arc<dyn KnowledgeSource>,
}

impl AppState {
    pub fn new(config: RelayConfig, knowledge: Arc<dyn KnowledgeSource>) -> Self {
        let upstream = OpenAiClient::new(&config.upstream_url);
        Self {
            config,
            upstream,
            knowledge,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut app = Router::new()
        .route(CHAT_PATH, any(routes::chat_handler))
        .route("/health", get(routes::health_handler));

    if let Some(dir) = &state.config.static_dir {
        let site = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(site);
    }

    app.layer(cors).with_state(state)
}

/// Serve the relay on an already-bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
