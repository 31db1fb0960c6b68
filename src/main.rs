//! Page Cache - an HTTP page fetcher with TTL caching and access counting

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use page_cache::api::create_router;
use page_cache::cache::{KeyValueStore, MemoryStore, RedisStore};
use page_cache::fetch::HttpFetcher;
use page_cache::{spawn_cleanup_task, AppState, CachedPageFetcher, Config};

/// Main entry point for the page cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the backing store (Redis when `REDIS_URL` is set, memory otherwise)
/// 4. Start the TTL cleanup task for the memory store
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "page_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting page cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: page_ttl={}s, fetch_timeout={}s, port={}, cleanup_interval={}s, store={}",
        config.page_ttl,
        config.fetch_timeout,
        config.server_port,
        config.cleanup_interval,
        if config.redis_url.is_some() { "redis" } else { "memory" }
    );

    let (store, cleanup_handle): (Arc<dyn KeyValueStore>, Option<JoinHandle<()>>) =
        match &config.redis_url {
            Some(url) => {
                let store = RedisStore::new(url).context("Invalid REDIS_URL")?;
                info!("Using Redis store");
                (Arc::new(store) as Arc<dyn KeyValueStore>, None)
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                let handle = spawn_cleanup_task(store.clone(), config.cleanup_interval);
                info!("Using in-process store with background cleanup");
                (store as Arc<dyn KeyValueStore>, Some(handle))
            }
        };

    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    let pages = CachedPageFetcher::new(store, Arc::new(fetcher)).with_ttl(config.page_ttl());

    let app = create_router(AppState::new(pages));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
