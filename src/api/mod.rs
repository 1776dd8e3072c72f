//! REST API for bid optimization and forecast ensembling.
//!
//! Routes:
//! - `GET /health`: liveness probe
//! - `POST /optimize`: forecast points → optimal day-ahead bid
//! - `POST /ensemble`: model predictions and truth → blended forecast

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::config::BiddingConfig;

pub use types::{EnsembleRequest, ErrorResponse, HealthResponse, OptimizeRequest};

/// Immutable application state shared across all request handlers.
///
/// Requests may override parts of `config`; the shared value itself is
/// never mutated, so no locks are needed.
pub struct AppState {
    /// Defaults applied to every request.
    pub config: BiddingConfig,
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/optimize", post(handlers::post_optimize))
        .route("/ensemble", post(handlers::post_ensemble))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
