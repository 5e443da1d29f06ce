//! zipbatch-server – entry point.
//!
//! Startup order:
//! 1. Load configuration (optional TOML file, then environment variables).
//! 2. Initialise structured tracing (JSON in production, pretty in dev).
//! 3. Wire the task store, archive pool and task service.
//! 4. Build the Axum router and serve HTTP until SIGINT/SIGTERM, then give
//!    open connections a bounded drain period.
//! 5. Drain the archive pool within the configured grace period.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::load()?;

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: ZIPBATCH_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "zipbatch-server starting");

    // ── 3. Task service + archive pool ─────────────────────────────────────────
    let grace = cfg.shutdown_grace();
    let drain = cfg.http_drain();
    let addr: SocketAddr = cfg.bind_address.parse()?;
    info!(
        archive_dir = %cfg.archive_directory.display(),
        public_url = %cfg.public_base_url(),
        max_active_tasks = cfg.max_active_tasks,
        max_files_per_task = cfg.max_files_per_task,
        "task service configured"
    );
    let (state, archive_pool) = AppState::new(cfg);

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::new(state));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    serve(listener, app, shutdown_signal(), drain).await?;

    // ── 5. Archive jobs ────────────────────────────────────────────────────────
    archive_pool.shutdown(grace).await;

    info!("zipbatch-server stopped");
    Ok(())
}

/// Serve `app` until `signal` resolves, then wait at most `drain` for open
/// connections before giving up on them.
async fn serve(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()>,
    drain: Duration,
) -> std::io::Result<()> {
    let stop = CancellationToken::new();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(stop.clone().cancelled_owned())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = signal => stop.cancel(),
    }

    match tokio::time::timeout(drain, &mut server).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                drain_secs = drain.as_secs_f64(),
                "connections still open after the drain period; closing them"
            );
            Ok(())
        }
    }
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
