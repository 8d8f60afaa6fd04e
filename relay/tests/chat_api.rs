//! End-to-end tests for `/api/chat` against a scripted fake upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use portfolio_relay::config::RelayConfig;
use portfolio_relay::knowledge::KnowledgeSource;
use portfolio_relay::AppState;

const API_KEY: &str = "sk-test-credential";
const SYSTEM_PROMPT: &str = "You describe the portfolio owner.";

struct FixedKnowledge;

impl KnowledgeSource for FixedKnowledge {
    fn system_prompt(&self) -> String {
        SYSTEM_PROMPT.to_string()
    }
}

// ─── Fake upstream ──────────────────────────────────────────────────────────

struct FakeUpstream {
    calls: AtomicUsize,
    status: u16,
    body: String,
    last_request: Mutex<Option<Value>>,
    last_auth: Mutex<Option<String>>,
}

async fn completions(
    State(fake): State<Arc<FakeUpstream>>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> (StatusCode, String) {
    fake.calls.fetch_add(1, Ordering::SeqCst);
    *fake.last_request.lock().unwrap() = Some(req);
    *fake.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    (StatusCode::from_u16(fake.status).unwrap(), fake.body.clone())
}

async fn spawn_upstream(status: u16, body: &str) -> (String, Arc<FakeUpstream>) {
    let fake = Arc::new(FakeUpstream {
        calls: AtomicUsize::new(0),
        status,
        body: body.to_string(),
        last_request: Mutex::new(None),
        last_auth: Mutex::new(None),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(fake.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1", addr), fake)
}

async fn spawn_relay(config: RelayConfig) -> String {
    let state = Arc::new(AppState::new(config, Arc::new(FixedKnowledge)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        portfolio_relay::serve(listener, state).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_raw(relay: &str, body: &str) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/chat", relay))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

fn openai_reply(text: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]}).to_string()
}

// ─── Success ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn forwards_one_turn_and_returns_reply() {
    let (upstream, fake) = spawn_upstream(200, &openai_reply("Hi there")).await;
    let relay = spawn_relay(RelayConfig::new(Some(API_KEY), None, &upstream)).await;

    let (status, body) = post_raw(&relay, r#"{"message":"  Hello  "}"#).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"reply": "Hi there"}));
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);

    let sent = fake.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent["model"], "gpt-4o-mini");
    assert_eq!(
        sent["messages"],
        json!([
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": "  Hello  "}
        ])
    );
    assert_eq!(
        fake.last_auth.lock().unwrap().as_deref(),
        Some("Bearer sk-test-credential")
    );
}

#[tokio::test]
async fn missing_content_yields_empty_reply() {
    for upstream_body in [r#"{"choices":[]}"#, "not json at all", r#"{"choices":[{"message":{"content":7}}]}"#] {
        let (upstream, _fake) = spawn_upstream(200, upstream_body).await;
        let relay = spawn_relay(RelayConfig::new(Some(API_KEY), None, &upstream)).await;

        let (status, body) = post_raw(&relay, r#"{"message":"Hello"}"#).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"reply": ""}));
    }
}

// ─── Validation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_or_missing_message_is_rejected_without_upstream_call() {
    let (upstream, fake) = spawn_upstream(200, &openai_reply("unused")).await;
    let relay = spawn_relay(RelayConfig::new(Some(API_KEY), None, &upstream)).await;

    for body in [
        "{}",
        r#"{"message":""}"#,
        r#"{"message":"   \n\t"}"#,
        r#"{"message":42}"#,
        r#"{"message":null}"#,
        "{broken",
        "",
    ] {
        let (status, resp) = post_raw(&relay, body).await;
        assert_eq!(status, 400, "body {body:?}");
        assert_eq!(resp, json!({"error": "Missing 'message' in request body"}));
    }
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_credential_fails_before_upstream_for_any_input() {
    let (upstream, fake) = spawn_upstream(200, &openai_reply("unused")).await;
    let relay = spawn_relay(RelayConfig::new(None, None, &upstream)).await;

    for body in [r#"{"message":"Hello"}"#, "{}", "garbage"] {
        let (status, resp) = post_raw(&relay, body).await;
        assert_eq!(status, 500);
        assert_eq!(resp, json!({"error": "Missing OPENAI_API_KEY"}));
    }
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_post_is_method_not_allowed() {
    let (upstream, fake) = spawn_upstream(200, &openai_reply("unused")).await;
    let relay = spawn_relay(RelayConfig::new(Some(API_KEY), None, &upstream)).await;

    let resp = reqwest::get(format!("{}/api/chat", relay)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"error": "Method Not Allowed"}));
    assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
}

// ─── Upstream failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn upstream_status_is_passed_through_with_model_name() {
    let (upstream, _fake) =
        spawn_upstream(429, r#"{"error":{"message":"Rate limit reached"}}"#).await;
    let relay =
        spawn_relay(RelayConfig::new(Some(API_KEY), Some("\"gpt-4-turbo\""), &upstream)).await;

    let (status, body) = post_raw(&relay, r#"{"message":"Hello"}"#).await;

    assert_eq!(status, 429);
    assert_eq!(
        body,
        json!({"error": "OpenAI error (429) [model=gpt-4-turbo]: Rate limit reached"})
    );
}

#[tokio::test]
async fn upstream_plain_text_error_becomes_detail() {
    let (upstream, _fake) = spawn_upstream(503, "Service Unavailable").await;
    let relay = spawn_relay(RelayConfig::new(Some(API_KEY), Some("   "), &upstream)).await;

    let (status, body) = post_raw(&relay, r#"{"message":"Hello"}"#).await;

    assert_eq!(status, 503);
    assert_eq!(
        body["error"],
        "OpenAI error (503) [model=gpt-4o-mini]: Service Unavailable"
    );
}

#[tokio::test]
async fn unreachable_upstream_is_internal_error_without_credential_leak() {
    // Bind then drop to get a port nothing listens on.
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let relay = spawn_relay(RelayConfig::new(
        Some(API_KEY),
        None,
        &format!("http://{}/v1", addr),
    ))
    .await;

    let (status, body) = post_raw(&relay, r#"{"message":"Hello"}"#).await;

    assert_eq!(status, 500);
    let error = body["error"].as_str().unwrap();
    assert!(!error.is_empty());
    assert!(!error.contains(API_KEY));
}

// ─── Health ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_model_and_credential_presence() {
    let relay = spawn_relay(RelayConfig::new(None, Some("'gpt-4o'"), "http://127.0.0.1:9/v1")).await;

    let body: Value = reqwest::get(format!("{}/health", relay))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        json!({"status": "ok", "model": "gpt-4o", "credential_configured": false})
    );
}
