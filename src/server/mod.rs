//! HTTP server for liveness and progress inspection.
//!
//! This module implements an optional, read-only HTTP server that:
//! - Answers liveness checks from an orchestrator
//! - Exposes the dispatcher's counters for observability
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if the server is running
//! - `GET /api/v1/status` - Returns the dispatch statistics as JSON

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatch::DispatchStats;

pub mod health;
pub mod status;

pub use health::health_handler;
pub use status::status_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. The server
/// never writes to the statistics.
#[derive(Clone)]
pub struct AppState {
    stats: DispatchStats,
}

impl AppState {
    pub fn new(stats: DispatchStats) -> Self {
        AppState { stats }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/api/v1/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Serves the router on `addr` until `shutdown` is cancelled.
pub async fn serve(
    addr: SocketAddr,
    app_state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Health server listening");

    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
