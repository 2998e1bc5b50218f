//! Ziggy - knowledge-base assistant
//!
//! Serves the chat page plus three JSON endpoints: knowledge base answers,
//! knowledge base source search, and freeform chat.
//!
//! # Usage
//!
//! ```bash
//! COHERE_API_KEY=... cargo run --release
//!
//! # Different port and store location
//! ./ziggy --port 9000 --db-path /srv/ziggy/db
//! ```
//!
//! # Environment Variables
//!
//! - `COHERE_API_KEY`: Cohere API key (required for answers, search and chat)
//! - `PORT`: HTTP port (default: 8080)
//! - `ZIGGY_CONFIG`: Path to a TOML config file
//! - `ZIGGY_CORS_ORIGINS`: Comma-separated origins allowed to call the API
//! - `RUST_LOG`: Logging level (default: info)
//!
//! A `.env` file in the working directory is read before anything else.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ziggy::api::{create_app, ApiState};
use ziggy::config::{self, AppConfig};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ziggy")]
#[command(about = "Ziggy knowledge-base assistant")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file
    #[arg(short, long, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the bind host (default: 0.0.0.0)
    #[arg(long)]
    host: Option<String>,

    /// Override the HTTP port (default: $PORT or 8080)
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the knowledge store directory (default: content/db)
    #[arg(long, value_name = "DIR")]
    db_path: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be applied before clap reads env-backed flags
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_logging(args.log_json);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to read .env file"),
    }

    let mut app_config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        app_config.server.host = host;
    }
    if let Some(port) = args.port {
        app_config.server.port = port;
    }
    if let Some(db_path) = args.db_path {
        app_config.knowledge.db_path = db_path;
    }
    app_config.validate().context("Invalid configuration")?;

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Ziggy - Knowledge Base Assistant");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");
    info!(
        "🧠 Models: chat={} embed={}",
        app_config.cohere.chat_model, app_config.cohere.embed_model
    );
    info!(
        "📚 Knowledge store: {} (opened on first use, top {} per query)",
        app_config.knowledge.db_path.display(),
        app_config.knowledge.top_k
    );
    if !app_config.has_api_key() {
        warn!("COHERE_API_KEY is not set: answers, search and chat will report errors");
    }
    info!("");

    let state = ApiState::from_config(&app_config)?;
    let app = create_app(state);

    let server_addr = app_config.server.bind_addr();
    info!("🌐 Starting HTTP server on {}...", server_addr);
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("✓ HTTP server listening on {}", server_addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    info!("✓ Ziggy shutdown complete");
    Ok(())
}
