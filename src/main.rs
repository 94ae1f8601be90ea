//! stripecache - an in-memory cache server
//!
//! Serves the sharded LRU store over HTTP, running every store command on
//! the elastic executor.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stripecache::api::create_router;
use stripecache::{AppState, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the sharded store and start the executor
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM stop the server, then drain the executor
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stripecache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stripecache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: total_capacity={}B, stripe_count={}, workers={}..{}, max_queue={}, idle_timeout={}ms, port={}",
        config.total_capacity,
        config.stripe_count,
        config.low_watermark,
        config.high_watermark,
        config.max_queue_size,
        config.idle_timeout_ms,
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to build cache store")?;
    info!(
        "Cache store initialized: {} shards of {} bytes",
        state.store.stripe_count(),
        state.store.shard_capacity()
    );

    let executor = Arc::clone(&state.executor);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Let queued and in-flight commands finish before exiting.
    info!("HTTP server stopped, draining executor");
    tokio::task::spawn_blocking(move || executor.stop(true))
        .await
        .context("executor shutdown task failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
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
}
