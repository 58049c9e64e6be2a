//! `statgpt serve` — Start the HTTP gateway.

use statgpt_config::AppConfig;
use tracing::info;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        return Err("OPENAI_API_KEY is not set; the gateway cannot reach the completion service".into());
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        model = %config.default_model,
        vision_model = %config.effective_vision_model(),
        shared_secret = config.gateway.shared_secret.is_some(),
        kv_pointers = config.kv.credentials().is_some(),
        "StatGPT gateway configured"
    );

    statgpt_gateway::start(config).await?;

    Ok(())
}
