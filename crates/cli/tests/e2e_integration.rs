//! End-to-end integration tests for ChatRelay.
//!
//! These exercise the whole path a browser request takes: HTTP gateway,
//! chat service, SQLite history and a real HTTP call to an
//! OpenAI-compatible backend (served locally by a mock).

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use tower::ServiceExt;

use chatrelay_chat::{ChatRequest, ChatService, ChatSettings, FALLBACK_RESPONSE};
use chatrelay_config::{AppConfig, StorageBackend};
use chatrelay_core::error::ProviderError;
use chatrelay_core::exchange::SessionId;
use chatrelay_core::message::Message;
use chatrelay_core::provider::{Provider, ProviderRequest, ProviderResponse};
use chatrelay_core::store::ExchangeStore;
use chatrelay_gateway::{GatewayState, build_chat_service, build_router};
use chatrelay_storage::open_store;

// ── Mock LLM backend ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Backend {
    prompts: Arc<Mutex<Vec<String>>>,
    status: Option<u16>,
    reply: Option<String>,
}

async fn completions(
    State(backend): State<Backend>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
    let question = prompt.rsplit("Question: ").next().unwrap_or_default().to_string();
    backend.prompts.lock().unwrap().push(prompt);

    if let Some(code) = backend.status {
        let status = StatusCode::from_u16(code).unwrap();
        return (status, Json(serde_json::json!({"error": {"message": "boom"}})));
    }

    let content = backend.reply.clone().unwrap_or(format!("Answer to: {question}"));
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "model": body["model"],
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        })),
    )
}

/// Serve `backend` on an ephemeral port; returns its base URL.
async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn config_for(dir: &tempfile::TempDir, backend_url: &str) -> AppConfig {
    let mut config = AppConfig {
        default_provider: "openai".into(),
        default_model: "gpt-4o-mini".into(),
        api_key: Some("sk-test".into()),
        ..AppConfig::default()
    };
    config.provider.api_url = Some(backend_url.into());
    config.provider.timeout_secs = 5;
    config.storage.backend = StorageBackend::Sqlite;
    config.storage.path = dir.path().join("chat_history.db").to_string_lossy().into_owned();
    config.logging.transcript_path = Some(
        dir.path().join("transcript.jsonl").to_string_lossy().into_owned(),
    );
    config
}

async fn app_for(config: &AppConfig) -> Router {
    let chat = build_chat_service(config).await.unwrap();
    build_router(Arc::new(GatewayState { chat }), &config.gateway)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}

fn chat_request(question: &str, session: &str) -> Request<Body> {
    let body = serde_json::json!({"question": question, "session_id": session});
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── E2E: HTTP → service → SQLite → backend ───────────────────────────────

#[tokio::test]
async fn e2e_two_turns_share_context_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let config = config_for(&dir, &url);
    let app = app_for(&config).await;

    let (status, first) = send(&app, chat_request("My favourite colour is teal", "e2e-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["response"], "Answer to: My favourite colour is teal");
    assert_eq!(first["model"], "gpt-4o-mini");

    let (status, _) = send(&app, chat_request("What is my favourite colour?", "e2e-1")).await;
    assert_eq!(status, StatusCode::OK);

    {
        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], "Context:\n\n\nQuestion: My favourite colour is teal");
        assert_eq!(
            prompts[1],
            "Context:\nUser: My favourite colour is teal\n\
             Assistant: Answer to: My favourite colour is teal\n\n\
             Question: What is my favourite colour?"
        );
    }

    let req = Request::builder()
        .uri("/sessions/e2e-1/history")
        .body(Body::empty())
        .unwrap();
    let (status, history) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["count"], 2);
    assert_eq!(history["exchanges"][0]["user_input"], "My favourite colour is teal");
    assert_eq!(history["exchanges"][1]["user_input"], "What is my favourite colour?");

    let transcript =
        tokio::fs::read_to_string(config.logging.transcript_path.as_ref().unwrap()).await.unwrap();
    assert_eq!(transcript.lines().count(), 2);
}

#[tokio::test]
async fn e2e_sessions_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let app = app_for(&config_for(&dir, &url)).await;

    send(&app, chat_request("token: s3cr3t", "alice")).await;
    send(&app, chat_request("hello", "bob")).await;

    let prompts = backend.prompts.lock().unwrap();
    assert!(!prompts[1].contains("s3cr3t"));
}

#[tokio::test]
async fn e2e_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let config = config_for(&dir, &url);

    {
        let app = app_for(&config).await;
        let (status, _) = send(&app, chat_request("Remember 42", "persist")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let app = app_for(&config).await;
    send(&app, chat_request("What did I ask you to remember?", "persist")).await;

    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[1].contains("User: Remember 42"));
}

#[tokio::test]
async fn e2e_backend_error_returns_500_and_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend {
        status: Some(503),
        ..Backend::default()
    };
    let url = spawn_backend(backend).await;
    let config = config_for(&dir, &url);
    let app = app_for(&config).await;

    let (status, body) = send(&app, chat_request("Hi", "down")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "The model backend failed to generate a response.");

    let store = open_store(&config.storage).await.unwrap();
    assert_eq!(store.count(&SessionId::from("down")).await.unwrap(), 0);
}

#[tokio::test]
async fn e2e_blank_backend_answer_becomes_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend {
        reply: Some("   ".into()),
        ..Backend::default()
    };
    let url = spawn_backend(backend).await;
    let config = config_for(&dir, &url);
    let app = app_for(&config).await;

    let (status, body) = send(&app, chat_request("Hi", "blank")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], FALLBACK_RESPONSE);

    let store = open_store(&config.storage).await.unwrap();
    let latest = store.latest(&SessionId::from("blank")).await.unwrap().unwrap();
    assert_eq!(latest.chatbot_response, FALLBACK_RESPONSE);
}

#[tokio::test]
async fn e2e_empty_question_is_rejected_before_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let config = config_for(&dir, &url);
    let app = app_for(&config).await;

    let (status, body) = send(&app, chat_request(" \n ", "empty")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Question cannot be empty.");
    assert!(backend.prompts.lock().unwrap().is_empty());

    let store = open_store(&config.storage).await.unwrap();
    assert_eq!(store.count(&SessionId::from("empty")).await.unwrap(), 0);
}

#[tokio::test]
async fn e2e_missing_api_key_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&dir, "http://127.0.0.1:9/v1");
    config.api_key = None;
    config.default_provider = "groq".into();
    config.provider.api_url = None;

    assert!(build_chat_service(&config).await.is_err());
}

#[tokio::test]
async fn e2e_invalid_table_name_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&dir, "http://127.0.0.1:9/v1");
    config.storage.table = "history; DROP TABLE x".into();

    assert!(build_chat_service(&config).await.is_err());
}

// ── E2E: concurrency against SQLite ──────────────────────────────────────

struct InstantProvider;

#[async_trait::async_trait]
impl Provider for InstantProvider {
    fn name(&self) -> &str {
        "instant"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            message: Message::assistant("ok"),
            usage: None,
            model: request.model,
        })
    }
}

#[tokio::test]
async fn e2e_concurrent_same_session_requests_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir, "http://127.0.0.1:9/v1");
    let store = open_store(&config.storage).await.unwrap();
    let service = Arc::new(ChatService::new(
        store.clone(),
        Arc::new(InstantProvider),
        ChatSettings::from_config(&config),
    ));

    let mut handles = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .chat(ChatRequest {
                    session_id: SessionId::from("busy"),
                    question: format!("q{i}"),
                    model: None,
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let session = SessionId::from("busy");
    assert_eq!(store.count(&session).await.unwrap(), 8);
    let recent = store.fetch_recent(&session, 5).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn e2e_router_builds_from_config() {
    let config = AppConfig {
        api_key: Some("AIza-test".into()),
        ..AppConfig::default()
    };
    let router = chatrelay_providers::build_from_config(&config).unwrap();
    assert_eq!(router.require_default().unwrap().name(), "gemini");
}
