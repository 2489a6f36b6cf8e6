//! solvault-actions
//!
//! HTTP Action service for the solvault contribution vault.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solvault_actions::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "solvault_actions=debug,solvault_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_env().context("invalid configuration")?;
    let config = state.config.clone();
    tracing::info!(
        cluster = config.cluster.cluster.as_str(),
        rpc_url = %config.cluster.rpc_url,
        program_id = %config.cluster.program_id,
        vault = %state.vault_address(),
        "solvault configured"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Action service listening on {} (public url {})", addr, config.base_url);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app_router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
