//! RedShell judge service entry point.

use anyhow::{Context, Result};
use redshell::{build_router, AppState, RedshellConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RedshellConfig::from_env();
    let listen_addr = config.listen_addr.clone();
    let app = build_router(AppState::from_config(config));

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    info!("RedShell judge listening on {}", listen_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
