//! Response-header and shared-secret middleware.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use statgpt_config::GatewayConfig;
use tracing::{debug, warn};

use crate::SharedState;
use crate::error::ApiError;

pub const SECRET_HEADER: &str = "x-stattrust-secret";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, x-stattrust-secret";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Answer preflights and stamp the same header set on every response,
/// whatever its status.
pub async fn uniform_headers(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let origin = allow_origin(&state.config.gateway, req.headers());
    debug!(
        request_id = %request_id,
        method = %req.method(),
        path = req.uri().path(),
        "Request received"
    );

    let mut response = if req.method() == Method::OPTIONS {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "ok",
        )
            .into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    if origin != "*" {
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject POST requests that do not carry the configured shared secret.
/// A gateway without a secret accepts everything.
pub async fn require_shared_secret(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.gateway.shared_secret.as_deref() else {
        return Ok(next.run(req).await);
    };
    if req.method() != Method::POST {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    if provided != Some(expected) {
        warn!(path = req.uri().path(), "Rejected request with missing or invalid shared secret");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

/// `*` when any origin is allowed; otherwise the caller's origin if listed,
/// else the first configured origin.
fn allow_origin(config: &GatewayConfig, headers: &HeaderMap) -> String {
    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        return "*".into();
    }
    let requested = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    match requested {
        Some(origin) if config.allowed_origins.iter().any(|o| o == origin) => origin.to_string(),
        _ => config.allowed_origins[0].clone(),
    }
}
