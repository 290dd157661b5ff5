//! yamlsense-lsp binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// YAML language server with JSON Schema support
#[derive(Parser, Debug)]
#[command(name = "yamlsense-lsp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Communicate over stdin/stdout (the only transport; accepted for
    /// editor compatibility)
    #[arg(long)]
    stdio: bool,

    /// Log level when neither YAMLSENSE_LOG nor RUST_LOG is set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env("YAMLSENSE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cli.log_level))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(stdio = cli.stdio, "starting yamlsense-lsp");
    yamlsense_lsp::start_server().await
}
