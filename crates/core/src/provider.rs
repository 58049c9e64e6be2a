//! Provider trait — the abstraction over the completion service.
//!
//! A Provider takes the fully normalized input messages and returns the
//! model's free-text reply plus usage counters. The pipeline never knows which
//! backend answered.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-5-mini")
    pub model: String,

    /// Ordered input messages, system message first
    pub input: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The reply text (all output text segments concatenated)
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Calls are at-most-once: implementations must not retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let text = request
                .input
                .last()
                .map(|m| m.text())
                .unwrap_or_default();
            Ok(ProviderResponse {
                text,
                usage: None,
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn provider_trait_is_object_safe() {
        let provider: Box<dyn Provider> = Box::new(EchoProvider);
        let response = provider
            .complete(ProviderRequest {
                model: "gpt-5-mini".into(),
                input: vec![Message::system("sys"), Message::user("hello")],
                temperature: 0.3,
                max_output_tokens: 100,
            })
            .await
            .unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.model, "gpt-5-mini");
    }

    #[test]
    fn request_serializes_input_messages() {
        let req = ProviderRequest {
            model: "gpt-5-mini".into(),
            input: vec![Message::user("hi")],
            temperature: 0.0,
            max_output_tokens: 1500,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["input"][0]["content"][0]["type"], "input_text");
        assert_eq!(json["max_output_tokens"], 1500);
    }
}
