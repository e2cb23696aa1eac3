//! # Factuur Server
//!
//! HTTP backend for invoicing and revenue reporting.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Factuur Server                                  │
//! │                                                                         │
//! │  UI/automation ──► HTTP (8080) ──► services ──► SQLite                  │
//! │                                       │                                 │
//! │                                       ├──► PDF rendering (printpdf)     │
//! │                                       ├──► SMTP delivery (lettre)       │
//! │                                       └──► payment QR (EPC + qrcode)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod dto;
mod error;
mod routes;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use factuur_db::{Database, DbConfig};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Factuur server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        port = config.http_port,
        db = %config.database_path.display(),
        shop = %config.shop.name,
        "Configuration loaded"
    );

    // Connect to the database; migrations run on connect
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    // Create shared state
    let http_port = config.http_port;
    let state = Arc::new(AppState { db, config });

    // Build the router
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("0.0.0.0:{http_port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
