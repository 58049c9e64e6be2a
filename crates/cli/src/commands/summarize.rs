//! `statgpt summarize` — Print the prompt digest of a compiled-context file.

use statgpt_config::AppConfig;
use statgpt_core::CompiledContext;
use std::path::Path;

pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let raw = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    println!("{}", digest(&config, &raw)?);
    Ok(())
}

fn digest(config: &AppConfig, raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let context = CompiledContext::from_json_str(raw)
        .map_err(|e| format!("Not a compiled context: {e}"))?;
    Ok(statgpt_pipeline::summarize(&context, &config.context))
}
