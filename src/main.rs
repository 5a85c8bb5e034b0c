//! Dump Cache - admin server for the analysis result caches
//!
//! Runs the caches, the file watcher and the expiry sweeper behind a small
//! HTTP administration API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dump_cache::api::{create_router, AppState};
use dump_cache::config::Config;
use dump_cache::tasks::spawn_cleanup_task;

/// Main entry point for the dump cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the caches and the invalidation service
/// 4. Watch the files named in `WATCH_PATHS`
/// 5. Start background expiry sweeper
/// 6. Serve the admin API until SIGINT/SIGTERM, then shut down the watcher
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dump_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dump Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, ttl={}s, port={}, cleanup_interval={}s, debounce={}ms",
        config.cache.max_entries,
        config.cache.ttl_secs,
        config.server_port,
        config.cleanup_interval,
        config.watch_debounce_ms
    );

    let state = AppState::from_config(&config).context("failed to start invalidation service")?;
    info!("Caches and invalidation service initialized");

    for path in &config.watch_paths {
        if !state.invalidation.watch_file(path) {
            warn!("Not watching {}", path.display());
        }
    }

    let cleanup_handle = spawn_cleanup_task(state.caching.clone(), config.cleanup_interval);
    info!("Background expiry sweeper started");

    let invalidation = state.invalidation.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    invalidation.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweeper and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
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

    cleanup_handle.abort();
    warn!("Expiry sweeper aborted");
}
