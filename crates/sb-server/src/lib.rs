//! sb-server: HTTP delivery of the streambox catalog.
//!
//! This crate wires the other sb-* crates into a running server:
//!
//! - Axum router with basic auth, request IDs, CORS and tracing
//! - In-process re-scans that atomically replace the catalog
//! - A background sweeper for the playlist cache
//! - Graceful shutdown via signal handling with a bounded grace window

pub mod context;
pub mod error;
pub mod middleware;
pub mod network;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sb_av::ToolRegistry;
use sb_core::config::Config;
use sb_core::{credentials, Credentials, TtlCache};

use crate::context::{AppContext, RescanRequest};

/// Start the streambox server.
///
/// Loads credentials when auth is enabled, binds the listener, performs the
/// initial scan of `catalog.root` (if set) and serves until a shutdown signal
/// arrives.
pub async fn start(config: Config) -> sb_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let tools = ToolRegistry::discover(&config.tools);
    let credentials = load_credentials(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| sb_core::Error::Config(format!("Invalid server address: {e}")))?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| sb_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    let local_addr = listener.local_addr()?;

    let public_host = network::advertised_host(config.server.public_host.as_deref()).await?;
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let sweep_every = Duration::from_secs(config.cache.cleanup_interval_secs.max(1));

    let ctx = AppContext::new(config, tools, credentials, public_host, local_addr.port());

    if let Some(root) = ctx.config.catalog.root.clone() {
        let catalog = &ctx.config.catalog;
        ctx.rescan(RescanRequest {
            root: &root,
            recursive: catalog.recursive,
            probe_durations: catalog.probe_durations,
            sort: catalog.sort,
            order: catalog.order,
        })
        .await?;
    } else {
        tracing::info!("No catalog root configured; starting with an empty catalog");
    }

    let sweeper = spawn_cache_sweeper(
        ctx.playlist_cache.clone(),
        sweep_every,
        ctx.shutdown.clone(),
    );

    let app = router::build_router(ctx.clone());
    tracing::info!(
        "Serving on {local_addr}, playlist at http://{}:{}/playlist.m3u8",
        ctx.public_host,
        ctx.public_port
    );

    let shutdown = ctx.shutdown.clone();
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
        }
    });

    tokio::select! {
        result = &mut server => {
            shutdown.cancel();
            let _ = sweeper.await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(sb_core::Error::Io { source: e }),
                Err(e) => Err(sb_core::Error::Internal(format!("Server task failed: {e}"))),
            };
        }
        _ = shutdown_signal(shutdown.clone()) => {}
    }

    shutdown.cancel();
    match tokio::time::timeout(grace, &mut server).await {
        Ok(_) => tracing::info!("Server drained"),
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, closing connections");
            server.abort();
        }
    }
    let _ = sweeper.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn load_credentials(config: &Config) -> sb_core::Result<Option<Credentials>> {
    if !config.auth.enabled {
        return Ok(None);
    }
    let path = config
        .auth
        .credentials_path
        .clone()
        .unwrap_or_else(credentials::default_path);
    let creds = credentials::load(&path)?;
    tracing::info!(path = %path.display(), user = %creds.username, "Basic auth enabled");
    Ok(Some(creds))
}

/// Periodically evict expired playlist renderings until `cancel` fires.
pub fn spawn_cache_sweeper(
    cache: Arc<TtlCache<Bytes>>,
    every: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = cache.cleanup();
                    if evicted > 0 {
                        tracing::debug!(evicted, "Swept expired playlist cache entries");
                    }
                }
            }
        }
    })
}

/// Resolve on SIGINT, SIGTERM or cancellation of `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
