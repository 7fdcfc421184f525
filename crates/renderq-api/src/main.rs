//! RenderQ tracker server

use renderq_api::{AppState, routes};
use renderq_config::LogFormat;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let config_path = std::env::var("RENDERQ_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("renderq.kdl"));
    let config = renderq_config::load(&config_path)?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    info!(total_jobs = config.total_jobs, "Starting render queue tracker");
    let state = AppState::from_config(&config).await?;

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    info!("Starting server on {}", config.listen);
    let listener = TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
