//! HTTP API for ChatRelay.
//!
//! Routes:
//! - `GET /` liveness message
//! - `POST /chat` one question, one answer, persisted per session
//! - `GET /sessions/{session_id}/history` stored exchanges, oldest first
//!
//! Built on Axum. Layers applied to every route:
//! - HTTP trace logging
//! - CORS (configured origins, or any origin when none are listed)
//! - Request body size limit (1 MB)
//! - Whole-request timeout (408 on expiry)
//! - Panic catcher (generic 500)

pub mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use chatrelay_chat::{ChatService, ChatSettings, TranscriptLog};
use chatrelay_config::{AppConfig, GatewayConfig};

pub use error::ApiError;

/// Most exchanges one history request may return.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub chat: Arc<ChatService>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all routes and layers.
pub fn build_router(state: SharedState, config: &GatewayConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(DefaultBodyLimit::max(1024 * 1024));

    Router::new()
        .route("/", get(handlers::root))
        .route("/chat", post(handlers::chat))
        .route("/sessions/{session_id}/history", get(handlers::history))
        .layer(middleware)
        .with_state(state)
}

/// CORS for the browser front end. An empty list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Assemble the chat path from configuration: store, backend, settings and
/// the optional transcript.
pub async fn build_chat_service(
    config: &AppConfig,
) -> Result<Arc<ChatService>, Box<dyn std::error::Error>> {
    let store = chatrelay_storage::open_store(&config.storage).await?;
    let provider = chatrelay_providers::build_from_config(config)?.require_default()?;

    let mut service = ChatService::new(store, provider, ChatSettings::from_config(config));
    if let Some(path) = &config.logging.transcript_path {
        info!(path = %path, "Transcript logging enabled");
        service = service.with_transcript(TranscriptLog::new(path));
    }
    Ok(Arc::new(service))
}

/// Start the gateway HTTP server and run until Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let chat = build_chat_service(&config).await?;
    let app = build_router(Arc::new(GatewayState { chat }), &config.gateway);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        model = %config.default_model,
        provider = %config.default_provider,
        storage = config.storage.backend.as_str(),
        "Gateway listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
