//! HTTP client for the chat relay.
//!
//! Every failure is folded into a [`RelayOutcome`] so the widget only ever
//! appends a bot message, never surfaces an error.

use portfolio_common::conversation::{ChatRelay, RelayOutcome};
use portfolio_common::wire::{ChatRequest, CHAT_PATH};

/// Relay endpoint, overridden at compile-time via PORTFOLIO_CHAT_ENDPOINT.
pub fn chat_endpoint() -> String {
    option_env!("PORTFOLIO_CHAT_ENDPOINT")
        .filter(|url| !url.is_empty())
        .unwrap_or(CHAT_PATH)
        .to_string()
}

#[derive(Clone, Debug)]
pub struct HttpRelay {
    endpoint: String,
}

impl HttpRelay {
    pub fn from_env() -> Self {
        Self {
            endpoint: chat_endpoint(),
        }
    }
}

impl ChatRelay for HttpRelay {
    async fn send(&self, message: String) -> RelayOutcome {
        let body = match serde_json::to_string(&ChatRequest { message }) {
            Ok(b) => b,
            Err(e) => return RelayOutcome::Transport(e.to_string()),
        };
        match post_json(&self.endpoint, &body).await {
            Ok((status, raw)) => RelayOutcome::from_response(status, &raw),
            Err(e) => {
                tracing::warn!("Chat relay request failed: {e}");
                RelayOutcome::Transport(e)
            }
        }
    }
}

// ─── HTTP helpers (WASM) ─────────────────────────────────────────────────────

/// POST `body` as JSON and return the status with the raw response text.
/// Non-2xx statuses are not errors here; only transport failures are.
#[cfg(target_family = "wasm")]
async fn post_json(url: &str, body: &str) -> Result<(u16, String), String> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let opts = web_sys::RequestInit::new();
    opts.set_method("POST");
    opts.set_body(&wasm_bindgen::JsValue::from_str(body));

    let request = web_sys::Request::new_with_str_and_init(url, &opts).map_err(js_message)?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(js_message)?;

    let window = web_sys::window().ok_or("No window")?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_message)?;

    let resp: web_sys::Response = resp_value
        .dyn_into()
        .map_err(|_| "Response is not a Response object".to_string())?;

    let text = JsFuture::from(resp.text().map_err(js_message)?)
        .await
        .map_err(js_message)?;

    Ok((resp.status(), text.as_string().unwrap_or_default()))
}

/// `error.message` for thrown JS errors, debug text otherwise.
#[cfg(target_family = "wasm")]
fn js_message(value: wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => format!("{:?}", value),
    }
}

// Non-WASM stub for type checking
#[cfg(not(target_family = "wasm"))]
async fn post_json(_url: &str, _body: &str) -> Result<(u16, String), String> {
    Err("Chat relay only available in WASM".to_string())
}
