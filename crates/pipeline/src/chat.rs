//! The chat pipeline: request body → completion input → normalized reply.

use serde::Serialize;
use serde_json::{Map, Value};
use statgpt_config::AppConfig;
use statgpt_core::error::Error;
use statgpt_core::message::Message;
use statgpt_core::provider::{Provider, ProviderRequest, Usage};
use statgpt_core::store::KvStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::attachments::{merge_attachments, resolve_attachments};
use crate::compiled::{ContextSource, resolve_compiled_context, strip_embedded};
use crate::confidence::ConfidenceNormalizer;
use crate::prompt::build_system_prompt;
use crate::request::{ChatRequest, Mode};
use crate::summary::summarize;

/// A completion request ready to send, plus what went into it.
#[derive(Debug, Clone)]
pub struct PreparedChat {
    pub request: ProviderRequest,
    pub mode: Mode,
    pub has_attachments: bool,
    pub context_source: Option<ContextSource>,
}

/// The response body of a successful chat call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub usage: Option<Usage>,
    /// The model that was requested, after the vision override.
    pub model: String,
    pub has_attachments: bool,
}

/// Stateless per-request orchestration over the completion provider and the
/// optional key-value store.
pub struct ChatPipeline {
    config: Arc<AppConfig>,
    provider: Arc<dyn Provider>,
    store: Option<Arc<dyn KvStore>>,
    confidence: ConfidenceNormalizer,
}

impl ChatPipeline {
    pub fn new(config: Arc<AppConfig>, provider: Arc<dyn Provider>) -> Self {
        let confidence = ConfidenceNormalizer::new(&config.confidence);
        Self {
            config,
            provider,
            store: None,
            confidence,
        }
    }

    /// Attach the key-value store used to resolve compiled-context pointers.
    pub fn with_store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the completion request for a body without calling the provider.
    pub async fn prepare(&self, body: &Map<String, Value>) -> Result<PreparedChat, Error> {
        let config = &self.config;
        let req = ChatRequest::new(body);
        let mode = req.mode();

        let mut model = req.model().unwrap_or(&config.default_model).to_string();
        let temperature = if mode.is_extract() {
            0.0
        } else {
            req.temperature().unwrap_or(config.default_temperature)
        };
        let max_output_tokens = req.max_tokens().unwrap_or(config.default_max_tokens);

        let attachments = resolve_attachments(body, &config.attachments);
        let has_attachments = !attachments.is_empty();
        let mut messages = req.messages();

        let resolved = match resolve_compiled_context(body, self.store.as_deref()).await {
            Ok(resolved) => Some(resolved),
            Err(e) if e.is_absent() && !config.context.require_compiled_context => None,
            Err(e) => return Err(e.into()),
        };
        let context_source = resolved.as_ref().map(|r| r.source);

        let base = req.system().unwrap_or(&config.default_system);
        let base = match context_source {
            Some(ContextSource::Embedded) => strip_embedded(base),
            _ => base.to_string(),
        };
        let digest = resolved.map(|r| summarize(&r.context, &config.context));
        let slip = req.slip();
        let system = build_system_prompt(&base, digest.as_deref(), slip.as_deref(), mode);

        if has_attachments {
            model = config.effective_vision_model().to_string();
            merge_attachments(&mut messages, attachments, mode);
        }

        let mut input = Vec::with_capacity(messages.len() + 1);
        input.push(Message::system(system));
        input.extend(messages);

        debug!(
            mode = mode.as_str(),
            temperature,
            max_output_tokens,
            system_chars = input[0].text().len(),
            "Prepared completion input"
        );

        Ok(PreparedChat {
            request: ProviderRequest {
                model,
                input,
                temperature,
                max_output_tokens,
            },
            mode,
            has_attachments,
            context_source,
        })
    }

    /// Prepare, call the provider once, and normalize the reply.
    pub async fn run(&self, body: &Map<String, Value>) -> Result<ChatOutcome, Error> {
        let prepared = self.prepare(body).await?;
        let model = prepared.request.model.clone();

        info!(
            provider = self.provider.name(),
            model = %model,
            mode = prepared.mode.as_str(),
            messages = prepared.request.input.len(),
            has_attachments = prepared.has_attachments,
            context = prepared.context_source.map_or("none", ContextSource::as_str),
            "Processing chat request"
        );

        let response = self.provider.complete(prepared.request).await?;

        debug!(
            responded_model = %response.model,
            reply_chars = response.text.len(),
            "Completion received"
        );

        Ok(ChatOutcome {
            reply: self.confidence.normalize(&response.text),
            usage: response.usage,
            model,
            has_attachments: prepared.has_attachments,
        })
    }
}
