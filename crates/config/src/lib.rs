//! Configuration loading, validation, and management for StatGPT.
//!
//! Loads configuration from `$STATGPT_CONFIG` (or `./statgpt.toml`) with
//! environment variable overrides. Built once at startup and passed by
//! reference into every component; nothing reads the environment afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Completion service base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model used whenever a request carries attachments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,

    /// System prompt used when the request does not supply one
    #[serde(default = "default_system")]
    pub default_system: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max output tokens per completion
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Completion request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub attachments: AttachmentConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub kv: KvConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-5-mini".into()
}
fn default_system() -> String {
    "You are StatGPT. Be concise, factual, and sports-savvy.".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("vision_model", &self.vision_model)
            .field("default_system", &self.default_system)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("attachments", &self.attachments)
            .field("context", &self.context)
            .field("kv", &self.kv)
            .field("gateway", &self.gateway)
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// How attachment descriptors are turned into locators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Public base URL that storage keys are resolved against (no trailing `/`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,

    /// Mime type for raw base64 payloads that do not declare one.
    #[serde(default = "default_mime")]
    pub default_mime: String,
}

fn default_mime() -> String {
    "image/png".into()
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            public_base_url: None,
            default_mime: default_mime(),
        }
    }
}

/// Bounds for the compiled-context digest injected into the system prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_sections_inline")]
    pub max_sections_inline: usize,

    #[serde(default = "default_max_chars_per_section")]
    pub max_chars_per_section: usize,

    #[serde(default = "default_prompt_preview_chars")]
    pub prompt_preview_chars: usize,

    /// Fail requests that supply no compiled context at all.
    #[serde(default)]
    pub require_compiled_context: bool,
}

fn default_max_sections_inline() -> usize {
    12
}
fn default_max_chars_per_section() -> usize {
    1800
}
fn default_prompt_preview_chars() -> usize {
    300
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_sections_inline: default_max_sections_inline(),
            max_chars_per_section: default_max_chars_per_section(),
            prompt_preview_chars: default_prompt_preview_chars(),
            require_compiled_context: false,
        }
    }
}

/// Key-value REST service (Upstash / Vercel KV).
#[derive(Clone, Serialize, Deserialize)]
pub struct KvConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_kv_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_kv_timeout_secs() -> u64 {
    5
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            rest_url: None,
            token: None,
            timeout_secs: default_kv_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for KvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvConfig")
            .field("rest_url", &self.rest_url)
            .field("token", &redact(&self.token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl KvConfig {
    /// The `(rest_url, token)` pair, only when both halves are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.rest_url.as_deref(), self.token.as_deref()) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => Some((url, token)),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// When set, POST requests must carry a matching `x-stattrust-secret` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_max_body_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            shared_secret: None,
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("shared_secret", &redact(&self.shared_secret))
            .field("allowed_origins", &self.allowed_origins)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Defaults used when canonicalizing the trailing Signal / Confidence lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    #[serde(default = "default_signal")]
    pub default_signal: String,

    /// Percentage used when no tier word is recognized.
    #[serde(default = "default_fallback_pct")]
    pub fallback_pct: u8,

    #[serde(default)]
    pub tiers: TierPercentages,
}

fn default_signal() -> String {
    "See notes above".into()
}
fn default_fallback_pct() -> u8 {
    60
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            default_signal: default_signal(),
            fallback_pct: default_fallback_pct(),
            tiers: TierPercentages::default(),
        }
    }
}

/// Default percentage injected per confidence tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPercentages {
    pub very_low: u8,
    pub low: u8,
    pub medium: u8,
    pub high: u8,
    pub very_high: u8,
}

impl Default for TierPercentages {
    fn default() -> Self {
        Self {
            very_low: 25,
            low: 40,
            medium: 60,
            high: 75,
            very_high: 85,
        }
    }
}

/// Environment variable pairs accepted for the key-value REST service, in priority order.
const KV_ENV_PAIRS: [(&str, &str); 2] = [
    ("UPSTASH_REDIS_REST_URL", "UPSTASH_REDIS_REST_TOKEN"),
    ("KV_REST_API_URL", "KV_REST_API_TOKEN"),
];

impl AppConfig {
    /// Load configuration from `$STATGPT_CONFIG` or `./statgpt.toml`, then
    /// apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        std::env::var("STATGPT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("statgpt.toml"))
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(key) = var("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.default_model = model;
        }
        if let Some(model) = var("OPENAI_VISION_MODEL") {
            self.vision_model = Some(model);
        }
        if let Some(system) = var("STATGPT_SYSTEM") {
            self.default_system = system;
        }
        if let Some(raw) = var("STATGPT_TEMPERATURE") {
            self.default_temperature = parse_env("STATGPT_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = var("STATGPT_MAX_TOKENS") {
            self.default_max_tokens = parse_env("STATGPT_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = var("STATGPT_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("STATGPT_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(base) = var("ATTACHMENTS_PUBLIC_BASE_URL") {
            self.attachments.public_base_url = Some(base);
        }
        if let Some(raw) = var("MAX_SECTIONS_INLINE") {
            self.context.max_sections_inline = parse_env("MAX_SECTIONS_INLINE", &raw)?;
        }
        if let Some(raw) = var("MAX_CHARS_PER_SECTION") {
            self.context.max_chars_per_section = parse_env("MAX_CHARS_PER_SECTION", &raw)?;
        }
        if let Some(raw) = var("STATGPT_REQUIRE_CONTEXT") {
            self.context.require_compiled_context = parse_flag("STATGPT_REQUIRE_CONTEXT", &raw)?;
        }

        // The first complete URL/token pair wins.
        if let Some((url, token)) = KV_ENV_PAIRS
            .iter()
            .find_map(|(url_k, tok_k)| Some((var(*url_k)?, var(*tok_k)?)))
        {
            self.kv.rest_url = Some(url);
            self.kv.token = Some(token);
        }
        if let Some(raw) = var("KV_TIMEOUT_SECS") {
            self.kv.timeout_secs = parse_env("KV_TIMEOUT_SECS", &raw)?;
        }

        if let Some(host) = var("HOST") {
            self.gateway.host = host;
        }
        if let Some(raw) = var("PORT") {
            self.gateway.port = parse_env("PORT", &raw)?;
        }
        if let Some(secret) = var("STATGPT_SHARED_SECRET") {
            self.gateway.shared_secret = Some(secret);
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            self.gateway.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self.normalize();
        Ok(())
    }

    /// Strip trailing slashes from base URLs and drop blank optional strings.
    fn normalize(&mut self) {
        for url in [
            &mut self.attachments.public_base_url,
            &mut self.kv.rest_url,
        ] {
            *url = url
                .take()
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty());
        }
        self.vision_model = self
            .vision_model
            .take()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        if self.context.max_chars_per_section == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_chars_per_section must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// The model used for requests with attachments.
    pub fn effective_vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.default_model)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| {
        ConfigError::ValidationError(format!("{name} has an invalid value: {raw:?}"))
    })
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ValidationError(format!(
            "{name} must be a boolean flag, got {raw:?}"
        ))),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            vision_model: None,
            default_system: default_system(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            attachments: AttachmentConfig::default(),
            context: ContextConfig::default(),
            kv: KvConfig::default(),
            gateway: GatewayConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
