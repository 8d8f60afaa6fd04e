//! Client for the OpenAI-compatible chat-completion endpoint.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use portfolio_common::wire::{parse_json, str_field};

use crate::error::RelayError;

const COMPLETIONS_PATH: &str = "/chat/completions";
const FALLBACK_DETAIL: &str = "OpenAI request failed";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Turn<'a>; 2],
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

/// Result of a completed upstream round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Reply(String),
    Rejected { status: u16, detail: String },
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), COMPLETIONS_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the system prompt and one user turn; no earlier turns are included.
    pub async fn complete(
        &self,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<UpstreamOutcome, RelayError> {
        let req = CompletionRequest {
            model,
            messages: [
                Turn {
                    role: "system",
                    content: system_prompt,
                },
                Turn {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        let data = parse_json(&raw);

        if !status.is_success() {
            return Ok(UpstreamOutcome::Rejected {
                status: status.as_u16(),
                detail: error_detail(data.as_ref(), &raw),
            });
        }

        Ok(UpstreamOutcome::Reply(extract_reply(data.as_ref())))
    }
}

/// Best human-readable description of an upstream failure body.
pub fn error_detail(data: Option<&Value>, raw: &str) -> String {
    if let Some(e) = str_field(data, "error") {
        return e.to_string();
    }
    if let Some(e) = str_field(data.and_then(|d| d.get("error")), "message") {
        return e.to_string();
    }
    if let Some(e) = str_field(data, "message") {
        return e.to_string();
    }
    if !raw.is_empty() {
        return raw.to_string();
    }
    FALLBACK_DETAIL.to_string()
}

/// `choices[0].message.content` if it is a string, otherwise empty.
pub fn extract_reply(data: Option<&Value>) -> String {
    data.and_then(|d| d.get("choices"))
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
