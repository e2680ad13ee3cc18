//! HTTP surface of the service.
//!
//! Routes:
//! - `GET /` informational page
//! - `GET /health` liveness check
//! - `GET /generate-audio` tagged audio download

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::Result;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub embedder: Arc<Embedder>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            embedder: Arc::new(Embedder::new(config)?),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/generate-audio", get(handlers::generate_audio))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let addr = config.bind;
    let app = router(AppState::new(config)?);

    let listener = TcpListener::bind(addr).await?;
    info!("Starting HTTP server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
