//! Error types for the StatGPT domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum.

use thiserror::Error;

/// The top-level error type for all StatGPT operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Key-value service errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Compiled context resolution ---
    #[error("Compiled context error: {0}")]
    Context(#[from] ContextError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Key-value request failed: {0}")]
    Request(String),

    #[error("Key-value service returned status {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Key-value lookup timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Malformed key-value response: {0}")]
    MalformedResponse(String),
}

/// Failures while resolving a compiled context. Every variant except
/// `NoContextSupplied` means a source was supplied and could not be used.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("compiledInline is not valid JSON: {0}")]
    InvalidInline(String),

    #[error(
        "compiledPointer provided but KV REST credentials are missing \
         (set UPSTASH_REDIS_REST_URL/TOKEN or KV_REST_API_URL/TOKEN)"
    )]
    MissingCredentials,

    #[error("compiledPointer lookup failed (key={key}): {reason}")]
    LookupFailed { key: String, reason: String },

    #[error("compiledPointer provided but blob not found in KV (key={key})")]
    BlobNotFound { key: String },

    #[error("compiledPointer blob is not valid JSON (key={key}): {reason}")]
    InvalidBlob { key: String, reason: String },

    #[error("embedded compiled context is not valid JSON: {0}")]
    InvalidEmbedded(String),

    #[error("no compiled context supplied")]
    NoContextSupplied,
}

impl ContextError {
    /// Whether this error only says that nothing was supplied.
    pub fn is_absent(&self) -> bool {
        matches!(self, ContextError::NoContextSupplied)
    }
}
