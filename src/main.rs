//! Stats Card - GitHub statistics cards behind a stale-tolerant cache
//!
//! Serves SVG stats cards over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stats_card::api::{create_router, AppState};
use stats_card::{spawn_sweep_task, Config};

/// Main entry point for the stats card server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the GitHub client, fetcher and coordinator
/// 4. Start background expiry sweeper
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to info for this crate, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stats_card=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stats card server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: ttl={}s, retention={}s, sweep_interval={}s, port={}, token={}, allow_list={}",
        config.cache_ttl.as_secs(),
        config.retention.as_secs(),
        config.sweep_interval.as_secs(),
        config.server_port,
        config.github_token.is_some(),
        config.allowed_users.as_ref().map_or(0, |users| users.len())
    );

    let port = config.server_port;
    let sweep_interval = config.sweep_interval;
    let retention = config.retention;

    let state = AppState::from_config(config).context("failed to build GitHub client")?;
    info!("Coordinator initialized");

    let sweep_handle = spawn_sweep_task(
        state.coordinator.store().clone(),
        Arc::clone(state.coordinator.clock()),
        sweep_interval,
        retention,
    );
    info!("Background expiry sweeper started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweeper and allows graceful shutdown.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Expiry sweeper aborted");
}
