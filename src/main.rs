//! StudyHub API Server
//!
//! Run with: cargo run --bin studyhub
//!
//! # Configuration
//!
//! Loaded from `--config <path>` or the default locations, then overridden
//! by environment variables:
//! - `STUDYHUB_HOST` / `STUDYHUB_PORT`: Bind address (default: 0.0.0.0:8085)
//! - `STUDYHUB_PROVIDER_URL`: OpenAI-compatible API base URL
//! - `STUDYHUB_PROVIDER_API_KEY` or `OPENAI_API_KEY`: Provider API key
//! - `STUDYHUB_MODEL`: Chat model
//! - `STUDYHUB_BACKEND_URL`: Study backend REST API
//! - `STUDYHUB_LOG_LEVEL` / `STUDYHUB_LOG_FORMAT`: Logging (`RUST_LOG` wins)

use clap::Parser;
use std::path::PathBuf;
use studyhub::api::{serve, AppState};
use studyhub::config::{Config, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "studyhub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "StudyHub assistant relay server")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging);

    tracing::info!("Starting StudyHub API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Provider: {} (model {})", config.provider.base_url, config.provider.model);
    tracing::info!("Study backend: {}", config.backend.base_url);

    let state = AppState::new(config)?;

    if !state.provider.is_configured() {
        tracing::warn!("No provider API key set; assistant requests will fail until one is configured");
    }

    match state.backend.health_check().await {
        Ok(_) => tracing::info!("Study backend connection verified"),
        Err(e) => tracing::warn!("Study backend not available: {} (tool calls will fail)", e),
    }

    serve(state).await?;

    tracing::info!("StudyHub API server stopped");
    Ok(())
}

/// Initialize tracing from config; `RUST_LOG` takes precedence
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("studyhub={},tower_http=info", logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
