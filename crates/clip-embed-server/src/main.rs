//! CLIP embedding server.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:8000, batches of up to 8, 2ms batch timeout
//! clip-embed-server
//!
//! # Custom config file
//! clip-embed-server --config /path/to/server.toml
//!
//! # Larger batches, longer wait
//! clip-embed-server --max-batch-size 32 --batch-timeout-ms 10
//!
//! # Environment overrides (used if the CLI flag is not given)
//! CLIP_SERVER_PORT=9000 EMBEDDING_BATCH_MAX_SIZE=16 clip-embed-server
//!
//! # Debug logging
//! RUST_LOG=debug clip-embed-server
//! ```
//!
//! # Priority
//!
//! CLI arguments > Environment variables > Config file > Defaults

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use clip_embed_batching::{Scheduler, StubEmbeddingBackend};
use clip_embed_server::{create_router, AppState, CliOverrides, ServerConfig};

/// Batched CLIP embedding server
#[derive(Parser, Debug)]
#[command(name = "clip-embed-server")]
#[command(version)]
#[command(about = "HTTP server that batches concurrent CLIP embedding requests")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host
    #[arg(long)]
    host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum requests per batch
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Maximum wait after the first request of a batch, in milliseconds
    #[arg(long)]
    batch_timeout_ms: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            max_batch_size: self.max_batch_size,
            batch_timeout_ms: self.batch_timeout_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("CLIP embedding server starting...");

    let mut config = if let Some(ref path) = args.config {
        info!("Loading configuration from: {:?}", path);
        ServerConfig::from_file(path)?
    } else {
        info!("Using default configuration");
        ServerConfig::default()
    };
    config = config.with_env_overrides();
    config.apply_cli(&args.overrides());

    // Validate after overrides so bad CLI/env values fail fast
    config.validate()?;

    let model = &config.embedding.model;
    warn!(
        model = %model.model_name,
        dimension = model.dimension,
        "Using stub embedding backend: vectors are hash-derived, not model output"
    );
    let backend = Arc::new(StubEmbeddingBackend::new(
        model.model_name.clone(),
        model.dimension,
    ));

    let scheduler = Arc::new(Scheduler::new(config.embedding.batch.clone(), backend)?);
    scheduler.start()?;

    let router = create_router(AppState::new(scheduler.clone()));
    let addr = config.http.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Draining in-flight batches...");
    scheduler.stop().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
