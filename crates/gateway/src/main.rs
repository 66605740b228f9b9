//! warden-gateway: HTTP entrypoint.

use anyhow::Context;
use gateway::{build_router, AppState, Config};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_json_logging();
    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();
    let state = AppState::from_config(config)
        .map_err(|e| anyhow::anyhow!("startup failed: {}", e))?;
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {}", bind_addr))?;
    info!(addr = %bind_addr, "warden gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
