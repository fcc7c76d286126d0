//! snipauth Server Binary
//!
//! Authorization and test-orchestration service for the snippet platform.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! snipauth --config config.yaml
//!
//! # With environment variables only
//! SNIPAUTH_SERVICES__EXECUTION_BASE_URL=http://localhost:8081 snipauth
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use snipauth_api::http::{create_router, AppState};
use snipauth_api::observability::{init_logging, LoggingConfig};
use snipauth_server::{HttpExecutionClient, HttpResourceClient, ServerConfig};
use snipauth_storage::{DataStore, MemoryDataStore};

/// snipauth - permission, rule and test-case service for snippets
#[derive(Parser, Debug)]
#[command(name = "snipauth")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig::from_settings(&config.logging));

    info!(version = env!("CARGO_PKG_VERSION"), "Starting snipauth server");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            let storage = MemoryDataStore::new_shared();
            run_server(storage, addr, &config).await
        }
        other => {
            error!("Unknown storage backend: {}", other);
            anyhow::bail!("Unknown storage backend: {}", other);
        }
    }
}

/// Wires the collaborator clients and engines, then serves until shutdown.
async fn run_server<S: DataStore>(
    storage: Arc<S>,
    addr: SocketAddr,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    let services = &config.services;
    let resources = HttpResourceClient::new(&services.resource_base_url, services.timeout_ms)?;
    let executor = HttpExecutionClient::new(&services.execution_base_url, services.timeout_ms)?;
    info!(
        resource_service = %services.resource_base_url,
        execution_service = %services.execution_base_url,
        "Collaborator services configured"
    );

    let state = AppState::new(storage, Arc::new(resources), Arc::new(executor));
    let router = create_router(state).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    run_http_server(router, addr).await
}

/// Run the HTTP server with graceful shutdown.
async fn run_http_server(router: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
