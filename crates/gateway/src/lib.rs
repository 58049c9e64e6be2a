//! HTTP gateway for StatGPT.
//!
//! Exposes the chat pipeline at `POST /chat` and `POST /api/chat`, health
//! checks at `GET /health` and `GET /healthz`, and answers CORS preflights on
//! any path. Every response, including errors, preflights and 404s, carries
//! the same access-control headers.
//!
//! Built on Axum.

pub mod error;
pub mod middleware;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Router, middleware as axum_middleware};
use serde_json::{Map, Value};
use statgpt_config::AppConfig;
use statgpt_core::error::Error;
use statgpt_core::provider::Provider;
use statgpt_core::store::KvStore;
use statgpt_pipeline::{ChatOutcome, ChatPipeline};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::ApiError;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: Arc<AppConfig>,
    pub pipeline: ChatPipeline,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        config: Arc<AppConfig>,
        provider: Arc<dyn Provider>,
        store: Option<Arc<dyn KvStore>>,
    ) -> SharedState {
        let pipeline = ChatPipeline::new(config.clone(), provider);
        let pipeline = match store {
            Some(store) => pipeline.with_store(store),
            None => pipeline,
        };
        Arc::new(Self { config, pipeline })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers, outermost first: HTTP tracing, uniform headers and preflight,
/// request body limit, shared-secret gate.
pub fn build_router(state: SharedState) -> Router {
    let max_body_bytes = state.config.gateway.max_body_bytes;

    Router::new()
        .route("/health", get(health_handler).fallback(method_not_allowed_handler))
        .route("/healthz", get(health_handler).fallback(method_not_allowed_handler))
        .route("/api/health", get(health_handler).fallback(method_not_allowed_handler))
        .route("/api/healthz", get(health_handler).fallback(method_not_allowed_handler))
        .route("/chat", post(chat_handler).fallback(method_not_allowed_handler))
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed_handler))
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::uniform_headers,
                ))
                .layer(DefaultBodyLimit::max(max_body_bytes))
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::require_shared_secret,
                )),
        )
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Fails before binding when the provider or the configured key-value store
/// cannot be built.
pub async fn start(config: AppConfig) -> statgpt_core::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider: Arc<dyn Provider> =
        Arc::new(statgpt_providers::OpenAiResponsesProvider::from_config(&config)?);
    let store = statgpt_store::from_config(&config.kv)?;
    if store.is_none() {
        info!("No key-value credentials configured; compiled-context pointers will be rejected");
    }
    if config.gateway.shared_secret.is_none() {
        warn!("No shared secret configured; chat endpoints are open");
    }

    let state = GatewayState::new(Arc::new(config), provider, store);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("server error: {e}")))?;

    Ok(())
}

// --- Handlers ---

async fn health_handler() -> Json<Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn chat_handler(
    State(state): State<SharedState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatOutcome>, ApiError> {
    let body = parse_body(&body?)?;
    let outcome = state.pipeline.run(&body).await?;
    Ok(Json(outcome))
}

/// An empty body counts as `{}`. Anything but a JSON object is rejected.
fn parse_body(raw: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::InvalidJson(
            "request body must be a JSON object".into(),
        )),
        Err(e) => Err(ApiError::InvalidJson(e.to_string())),
    }
}
