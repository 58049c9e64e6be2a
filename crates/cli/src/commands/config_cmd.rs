//! `statgpt config` — Show the effective configuration.

use statgpt_config::AppConfig;

const REDACTED: &str = "[REDACTED]";

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&redacted(config))?;
    println!("{toml_str}");
    Ok(())
}

/// Replace every secret that is set with a placeholder.
fn redacted(mut config: AppConfig) -> AppConfig {
    for secret in [
        &mut config.api_key,
        &mut config.kv.token,
        &mut config.gateway.shared_secret,
    ] {
        if secret.is_some() {
            *secret = Some(REDACTED.into());
        }
    }
    config
}
