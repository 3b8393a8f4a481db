use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use rss_relay::api::create_router;
use rss_relay::config::Config;
use rss_relay::fetcher::Fetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (also picks up records from the log crate)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env()?;
    let fetcher = Fetcher::new(&config).context("Failed to create upstream client")?;
    let app = create_router(Arc::new(fetcher));

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    let port = config.port;
    tracing::info!("RSS relay listening on port {port}");
    tracing::info!("health check: http://localhost:{port}/api/health");
    tracing::info!("rss relay: http://localhost:{port}/api/rss?url=<RSS_URL>");
    tracing::info!("image relay: http://localhost:{port}/api/image-proxy?url=<IMAGE_URL>");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("RSS relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
