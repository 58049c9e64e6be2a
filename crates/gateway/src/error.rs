//! HTTP error mapping.

use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use statgpt_core::error::{ContextError, Error};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    /// Body is not a JSON object (400).
    InvalidJson(String),
    /// Shared secret missing or wrong (401).
    Unauthorized,
    /// No route (404).
    NotFound,
    /// Route exists but not for this method (405).
    MethodNotAllowed,
    /// Body over the configured limit (413).
    PayloadTooLarge(String),
    /// Compiled context could not be resolved (500).
    Context(ContextError),
    /// The completion call failed (500).
    Completion(String),
    /// Anything else (500).
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Context(e) => ApiError::Context(e),
            Error::Provider(e) => ApiError::Completion(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidJson(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            ApiError::InvalidJson(detail) => (StatusCode::BAD_REQUEST, "Invalid JSON", Some(detail)),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found", None),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None)
            }
            ApiError::PayloadTooLarge(detail) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large", Some(detail))
            }
            ApiError::Context(e) => {
                tracing::error!(error = %e, "Compiled context resolution failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to resolve compiled context",
                    Some(e.to_string()),
                )
            }
            ApiError::Completion(detail) => {
                tracing::error!(error = %detail, "Completion request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Completion request failed",
                    Some(detail),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", Some(detail))
            }
        };

        (status, Json(ErrorBody { error, detail })).into_response()
    }
}
