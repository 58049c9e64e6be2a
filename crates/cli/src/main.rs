//! StatGPT CLI — the main entry point.
//!
//! Commands:
//! - `serve`      — Start the HTTP gateway
//! - `confidence` — Normalize the Signal / Confidence lines of a reply
//! - `summarize`  — Print the prompt digest of a compiled-context file
//! - `config`     — Show the effective configuration (secrets redacted)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "statgpt",
    about = "StatGPT — chat gateway for sports statistics analysis",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Normalize a model reply read from FILE (or stdin)
    Confidence {
        /// Reply text file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Print the bounded digest of a compiled-context JSON file
    Summarize {
        /// Compiled-context JSON file
        file: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Confidence { file } => commands::confidence::run(file.as_deref())?,
        Commands::Summarize { file } => commands::summarize::run(&file)?,
        Commands::Config => commands::config_cmd::show()?,
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["statgpt", "--verbose", "serve", "--port", "9000"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000) }));

        let cli = Cli::parse_from(["statgpt", "confidence", "--log-json"]);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Confidence { file: None }));

        let cli = Cli::parse_from(["statgpt", "summarize", "ctx.json"]);
        assert!(matches!(cli.command, Commands::Summarize { ref file } if file == &PathBuf::from("ctx.json")));
    }
}
