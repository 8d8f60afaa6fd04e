//! Failure modes of a `/api/chat` invocation and their HTTP rendering.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use portfolio_common::wire::ErrorBody;

const UNEXPECTED: &str = "Unexpected server error";

#[derive(Debug, Error)]
pub enum RelayError {
    /// Anything other than POST.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The upstream credential is not configured.
    #[error("Missing OPENAI_API_KEY")]
    MissingCredential,

    /// Body unparsable, or `message` missing, non-string or blank.
    #[error("Missing 'message' in request body")]
    MissingMessage,

    /// Upstream answered with a non-2xx status.
    #[error("OpenAI error ({status}) [model={model}]: {detail}")]
    Upstream {
        status: u16,
        model: String,
        detail: String,
    },

    /// The upstream call failed before a full response was read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingMessage => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent back in the `error` field.
    pub fn client_message(&self) -> String {
        let msg = self.to_string();
        if msg.is_empty() {
            UNEXPECTED.to_string()
        } else {
            msg
        }
    }
}

/// Short name for the kind of transport failure, for operator logs.
fn transport_kind(err: &reqwest::Error) -> &'static str {
    if err.is_connect() {
        "connect"
    } else if err.is_timeout() {
        "timeout"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else if err.is_request() {
        "request"
    } else {
        "unknown"
    }
}

fn source_chain(err: &dyn StdError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut cur = err.source();
    while let Some(e) = cur {
        chain.push(e.to_string());
        cur = e.source();
    }
    chain
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let Self::Transport(ref err) = self {
            tracing::error!(
                error = %err,
                name = transport_kind(err),
                sources = ?source_chain(err),
                "/api/chat invocation failed"
            );
        }
        let status = self.status();
        (status, Json(ErrorBody::new(self.client_message()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_keeps_status_and_names_model() {
        let err = RelayError::Upstream {
            status: 429,
            model: "gpt-4o-mini".into(),
            detail: "Rate limit".into(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.client_message(),
            "OpenAI error (429) [model=gpt-4o-mini]: Rate limit"
        );
    }

    #[test]
    fn validation_errors_use_fixed_texts() {
        assert_eq!(RelayError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            RelayError::MissingMessage.client_message(),
            "Missing 'message' in request body"
        );
        assert_eq!(
            RelayError::MissingCredential.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
