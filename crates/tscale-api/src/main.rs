use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tscale_config::AppConfig;
use tscale_db::{DatasetStore, DbClient, MemoryStore, PoolSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    tscale_obs::init("tscale");

    // Config
    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config unreadable, using defaults");
        AppConfig::default()
    });

    let store = open_store(&cfg).await?;
    info!(store = store.name(), "Dataset store ready");

    let (app, state) = tscale_api::build_app(store, tscale_api::AppSettings::from_config(&cfg))?;

    // Start HTTP server
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    // Mark ready just before serving
    tscale_api::set_ready(&state, true);

    info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("TimeScale stopped");
    Ok(())
}

async fn open_store(cfg: &AppConfig) -> Result<Arc<dyn DatasetStore>> {
    let Some(url) = cfg.database_url() else {
        warn!("No database configured; datasets are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let settings = PoolSettings {
        max_connections: cfg.max_connections(),
        acquire_timeout: Duration::from_secs(cfg.acquire_timeout_secs()),
    };
    let client = DbClient::connect(&url, &settings)
        .await
        .context("Failed to connect to database")?;
    client.ping().await.context("Database ping failed")?;
    client
        .ensure_schema()
        .await
        .context("Failed to create tables")?;

    Ok(Arc::new(client))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = ?e, "failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
