use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sleeper_server::config::{AppConfig, ConfigError};
use sleeper_server::facade::CachedSleeperClient;
use sleeper_server::limiter::TokenBucket;
use sleeper_server::sleeper::{SleeperClient, UpstreamError};
use sleeper_server::web::{AppState, create_router};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create Sleeper client: {0}")]
    Client(#[from] UpstreamError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sleeper_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    info!(
        base_url = %config.sleeper.base_url,
        requests_per_minute = config.rate_limit.requests_per_minute,
        burst = config.rate_limit.burst,
        "starting Sleeper proxy"
    );

    let upstream = SleeperClient::new(config.sleeper.clone())?;
    let limiter = TokenBucket::new(&config.rate_limit);
    let client = CachedSleeperClient::new(upstream, limiter, &config.cache, config.retry);
    let state = AppState::new(client);

    // Purge expired entries in the background
    let sweeper = state.sleeper.clone();
    let sweep_interval = config.sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            sweeper.sweep_cache().await;
            let stats = sweeper.cache_stats();
            info!(
                entries = stats.entry_count,
                hits = stats.hits,
                misses = stats.misses,
                "swept response cache"
            );
        }
    });

    let app = create_router(state);

    let addr = config.listen_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!(%addr, "listening");
    info!("  GET  /health        - Health check");
    info!("  GET  /capabilities  - Available functions");
    info!("  POST /invoke        - Invoke a function");
    info!("  GET  /cache/stats   - Cache statistics");

    axum::serve(listener, app)
        .await
        .map_err(StartupError::Serve)
}
