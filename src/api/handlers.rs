//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::AppState;
use super::types::{EnsembleRequest, ErrorResponse, HealthResponse, OptimizeRequest};
use crate::bidding::BidOptimization;
use crate::ensemble::{EnsembleOutcome, combine_forecasts};
use crate::error::BidError;

/// Error mapped onto an HTTP status with an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<BidError> for ApiError {
    fn from(err: BidError) -> Self {
        let status = match err {
            BidError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BidError::NoConvergence { .. } | BidError::DeadlineExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BidError::Csv(_) | BidError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Liveness probe.
///
/// `GET /health` → 200 + `HealthResponse` JSON
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Optimizes a day-ahead bid for the posted forecast.
///
/// `POST /optimize` → 200 + `BidOptimization` JSON
/// Malformed body or invalid parameters → 400 + `ErrorResponse`
/// No converged grid point or deadline hit → 422 + `ErrorResponse`
pub async fn post_optimize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Json<BidOptimization>, ApiError> {
    let Json(request) = payload?;
    let config = request.resolve(&state.config);

    let errors = config.validate();
    if !errors.is_empty() {
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ApiError::bad_request(message));
    }

    // The grid scan is CPU-bound; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || config.optimize(&request.forecast))
        .await
        .map_err(|e| {
            warn!(error = %e, "optimization task failed");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "optimization task failed".to_string(),
            }
        })?;

    Ok(Json(outcome?))
}

/// Scores, selects, and blends the posted model predictions.
///
/// `POST /ensemble` → 200 + `EnsembleOutcome` JSON
/// Invalid predictions or config → 400 + `ErrorResponse`
pub async fn post_ensemble(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EnsembleRequest>, JsonRejection>,
) -> Result<Json<EnsembleOutcome>, ApiError> {
    let Json(request) = payload?;
    let config = request.config.as_ref().unwrap_or(&state.config.ensemble);
    let outcome = combine_forecasts(&request.predictions, &request.truth, config)?;
    Ok(Json(outcome))
}
