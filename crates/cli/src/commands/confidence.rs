//! `statgpt confidence` — Normalize the trailing Signal / Confidence lines of a reply.

use statgpt_config::AppConfig;
use statgpt_pipeline::ConfidenceNormalizer;
use std::io::Read;
use std::path::Path;

pub fn run(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let reply = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    println!("{}", normalize(&config, &reply));
    Ok(())
}

fn normalize(config: &AppConfig, reply: &str) -> String {
    ConfidenceNormalizer::new(&config.confidence).normalize(reply)
}
