mod comparison;
mod config;
mod errors;
mod extraction;
mod plans;
mod provider;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::provider::build_provider;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Malformed env vars abort startup before anything binds
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coverdiff API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the extraction provider
    let provider = build_provider(&config.provider)?;
    info!(
        "Extraction provider initialized ({}, fallback credential: {})",
        provider.name(),
        if config.fallback_api_key.is_some() { "configured" } else { "none" }
    );
    info!("Upload limit: {} bytes per document", config.limits.max_bytes);

    let state = AppState {
        config: config.clone(),
        provider,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
