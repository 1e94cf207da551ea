//! Swap Engine Binary
//!
//! Starts the swap routing and execution engine.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin swap-engine
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `WALLET_PUBLIC_KEY`: Public key of the signing wallet
//! - `WALLET_SECRET_KEY`: Secret key of the signing wallet
//!
//! ## Optional
//! - `SWAP_ENGINE_CONFIG`: Path to the YAML config (default: config.yaml)
//! - `RUST_LOG`: Log filter (default: `swap_engine=info`)
//!
//! Span export to an OTLP collector is enabled by the
//! `observability.logging.otlp` config section.

use std::time::Duration;

use anyhow::Context;
use swap_engine::config::{Config, load_config};
use swap_engine::infrastructure::config::{BackgroundTasks, Container};
use swap_engine::infrastructure::http::create_router;
use swap_engine::observability::{init_metrics, init_tracing};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config_path = std::env::var("SWAP_ENGINE_CONFIG").ok();
    let config = load_config(config_path.as_deref()).context("failed to load configuration")?;

    let tracing_guard =
        init_tracing(&config.observability.logging).context("failed to initialize tracing")?;
    if config.observability.metrics.enabled {
        init_metrics(&config.observability.metrics).context("failed to start metrics exporter")?;
        tracing::info!(addr = %config.observability.metrics.listen_addr, "Metrics exporter started");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting swap engine");
    log_config(&config);

    let container = Container::from_config(&config).context("failed to wire venues")?;
    let shutdown = CancellationToken::new();
    let background = container.start(&shutdown);

    let app = create_router(container.app_state(env!("CARGO_PKG_VERSION")));
    let addr = config
        .server
        .socket_addr()
        .context("invalid server bind address")?;

    tracing::info!(%addr, "HTTP server starting");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health");
    tracing::info!("  POST /api/orders/execute");
    tracing::info!("  GET  /api/orders/{{order_id}}");
    tracing::info!("  GET  /api/orders/progress?order_id=... (WebSocket)");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tokio::spawn(shutdown_signal(shutdown.clone()));

    tracing::info!("Swap engine ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("HTTP server error")?;

    // The server may also stop on its own; make sure background services follow.
    shutdown.cancel();
    container.queue().close();
    await_background(background).await;

    tracing::info!("Swap engine stopped");
    tracing_guard.shutdown();
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

fn log_config(config: &Config) {
    let venues: Vec<&str> = config.venues.iter().map(|v| v.id.as_str()).collect();
    if venues.is_empty() {
        tracing::warn!("No venues configured; every order will fail with no_pool_available");
    }
    tracing::info!(
        venues = ?venues,
        quote_timeout_ms = config.routing.quote_timeout_ms,
        venue_failure_policy = ?config.routing.venue_failure_policy,
        attempts = config.queue.attempts,
        concurrency = config.queue.concurrency,
        retry_policy = ?config.queue.retry_policy,
        wallet = %config.wallet.public_key,
        "Configuration loaded"
    );
}

/// Wait for the worker pool to drain, bounded by the shutdown timeout.
async fn await_background(background: BackgroundTasks) {
    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, background.join())
        .await
        .is_err()
    {
        tracing::warn!("Background services did not stop before the shutdown timeout");
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
