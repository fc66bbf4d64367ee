//! Quote API Server Binary
//!
//! Starts the HTTP API for quoting and premium calculation.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin quote-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin quote-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - HS256 secret for bearer tokens (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_MAX_CONNECTIONS` / `API_MIN_CONNECTIONS` - Pool sizing
//! * `API_LOG_LEVEL` - Log level or filter directive (default: info); `RUST_LOG` wins when set
//! * `API_JSON_LOGS` - Emit JSON log lines (default: false)
//! * `API_AUTO_CALCULATE` - Recalculate after create and edit (default: true)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_quote::QuotePort;
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresQuoteAdapter};
use interface_api::{config::ApiConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("Failed to load configuration")?;

    init_tracing(&config.log_level, config.json_logs);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        auto_calculate = config.auto_calculate,
        "Starting quote API server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone())
            .max_connections(config.max_connections)
            .min_connections(config.min_connections),
    )
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    let port: Arc<dyn QuotePort> = Arc::new(PostgresQuoteAdapter::new(pool));
    let app = create_router(port, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Installs the global subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can finish.
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
