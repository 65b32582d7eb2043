//! # API Cache Demo Server
//!
//! Binary entry point for the demo HTTP service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apicache_api::context::register_exclusions;
use apicache_api::repository::InMemoryUserRepository;
use apicache_api::{ApiConfig, ApiContext, build_router};
use apicache_engine::Cache;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!(
        version = apicache_api::VERSION,
        "Starting API cache demo service"
    );

    // Initialize the response cache; an unreachable store leaves it in pass-through
    let cache = Cache::init(register_exclusions(config.cache.clone())).await?;
    if !cache.is_connected() {
        tracing::warn!(status = %cache.status(), "Serving without response cache");
    }

    // Build API context
    let ctx = ApiContext::new(cache, Arc::new(InMemoryUserRepository::new()))?;

    // Build router
    let app = build_router(ctx, &config);

    // Start server
    let addr = config.server_addr;
    tracing::info!(%addr, prefix = %config.api_prefix, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
