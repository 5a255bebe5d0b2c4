//! weft-gen - AI pattern-generation microservice
//!
//! Streams large-language-model completions of live-coding pattern
//! code to a browser client over SSE, gating every artifact through
//! extraction + validation with a single bounded corrective retry.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weft_gen::AppState;

#[derive(Debug, Parser)]
#[command(name = "weft-gen", about = "AI pattern-generation service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "WEFT_CONFIG", default_value = "weft.toml")]
    config: PathBuf,

    /// Listen port (overrides the config file)
    #[arg(long, env = "WEFT_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Starting weft-gen (pattern generation) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = weft_common::config::load_config(&args.config)?;
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    let port = config.port();

    let state = AppState::new(config);
    let app = weft_gen::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
