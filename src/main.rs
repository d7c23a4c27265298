//! Crawl service entry point
//!
//! Serves the crawl HTTP API backed by the HTTP crawl engine and an
//! in-memory task store.

use anyhow::Context;
use clap::Parser;
use crawl_relay::config::{load_config_with_hash, Config};
use crawl_relay::engine::{HttpEngine, RunConfig};
use crawl_relay::service::{router, serve, spawn_sweeper, AppState};
use crawl_relay::storage::InMemoryTaskStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Crawl service: fetches pages and returns them as markdown
#[derive(Parser, Debug)]
#[command(name = "crawl-service")]
#[command(version)]
#[command(about = "HTTP crawl service with asynchronous task polling", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let token = std::env::var(&config.auth.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty());
    if token.is_none() {
        tracing::warn!(
            "{} is not set; crawl endpoints will accept unauthenticated requests",
            config.auth.token_env
        );
    }

    let engine = HttpEngine::new(&config.engine).context("failed to initialize crawl engine")?;
    let state = AppState::new(
        Arc::new(engine),
        Arc::new(InMemoryTaskStore::new(config.tasks.retention())),
        RunConfig::from(&config.engine),
        config.engine.max_concurrent_crawls,
        token,
    );

    let sweeper = spawn_sweeper(state.store(), config.tasks.sweep_interval());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    serve(listener, router(state), shutdown_signal()).await?;

    sweeper.abort();
    tracing::info!("Crawl service stopped");
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_relay=info,crawl_service=info,warn"),
            1 => EnvFilter::new("crawl_relay=debug,crawl_service=debug,info"),
            2 => EnvFilter::new("crawl_relay=trace,crawl_service=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
