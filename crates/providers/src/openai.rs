//! OpenAI Responses-API provider implementation.
//!
//! Uses the `/v1/responses` endpoint because it accepts mixed text, image
//! and file content parts in a single user message. Works with OpenAI and
//! any proxy exposing the same endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use statgpt_core::error::ProviderError;
use statgpt_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::time::Duration;
use tracing::{debug, warn};

/// A completion provider backed by the Responses API.
pub struct OpenAiResponsesProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiResponsesProvider {
    /// Create a new provider against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build the provider described by the application config.
    pub fn from_config(config: &statgpt_config::AppConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured("OPENAI_API_KEY is not set".into())
        })?;
        Self::new(
            "openai",
            &config.api_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Request body for `POST /responses`.
    fn to_api_body(request: &ProviderRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "input": request.input,
            "temperature": request.temperature,
            "max_output_tokens": request.max_output_tokens,
        })
    }

    /// Convert the API payload into our response type.
    fn from_api_response(api: ApiResponse, requested_model: &str) -> ProviderResponse {
        let text = match api.output_text {
            Some(text) => text,
            None => api
                .output
                .iter()
                .filter(|item| item.kind == "message")
                .flat_map(|item| item.content.iter())
                .filter(|c| c.kind == "output_text")
                .filter_map(|c| c.text.as_deref())
                .collect::<String>(),
        };

        let usage = api.usage.map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
            total_tokens: u.total_tokens.unwrap_or(u.input_tokens + u.output_tokens),
        });

        ProviderResponse {
            text,
            usage,
            model: if api.model.is_empty() {
                requested_model.to_string()
            } else {
                api.model
            },
        }
    }
}

#[async_trait]
impl Provider for OpenAiResponsesProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/responses", self.base_url);
        let body = Self::to_api_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.input.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: status,
                message: format!("Failed to parse response: {e}"),
            })?;

        Ok(Self::from_api_response(api_response, &request.model))
    }
}

// --- Responses API wire types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    output: Vec<ApiOutputItem>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiOutputItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ApiOutputContent>,
}

#[derive(Debug, Deserialize)]
struct ApiOutputContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
    #[serde(default)]
    total_tokens: Option<u32>,
}
