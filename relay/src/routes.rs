use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::Json;
use serde::Serialize;

use portfolio_common::wire::{parse_json, str_field, ChatReply};

use crate::error::RelayError;
use crate::upstream::UpstreamOutcome;
use crate::AppState;

// ─── Chat ───────────────────────────────────────────────────────────────────

/// `/api/chat`: validate, forward one turn upstream, translate the answer.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Result<Json<ChatReply>, RelayError> {
    if method != Method::POST {
        return Err(RelayError::MethodNotAllowed);
    }

    let api_key = state
        .config
        .api_key
        .as_deref()
        .ok_or(RelayError::MissingCredential)?;

    let body = std::str::from_utf8(&body).ok().and_then(parse_json);
    let message = str_field(body.as_ref(), "message")
        .filter(|m| !m.trim().is_empty())
        .ok_or(RelayError::MissingMessage)?;

    let model = state.config.model.as_str();
    let system_prompt = state.knowledge.system_prompt();

    match state
        .upstream
        .complete(api_key, model, &system_prompt, message)
        .await?
    {
        UpstreamOutcome::Reply(reply) => Ok(Json(ChatReply { reply })),
        UpstreamOutcome::Rejected { status, detail } => {
            tracing::warn!(status, model, detail = %detail, "upstream rejected chat request");
            Err(RelayError::Upstream {
                status,
                model: model.to_string(),
                detail,
            })
        }
    }
}

// ─── Health ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    model: String,
    credential_configured: bool,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        model: state.config.model.clone(),
        credential_configured: state.config.api_key.is_some(),
    })
}
