//! API request and response types.
//!
//! Success bodies reuse the library's serializable result types
//! (`BidOptimization`, `EnsembleOutcome`) unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bidding::{CostParameters, NeurodynamicParams};
use crate::config::{BiddingConfig, GridConfig};
use crate::ensemble::EnsembleConfig;
use crate::forecast::ForecastSet;

/// Liveness response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Crate version.
    pub version: String,
}

/// Body of `POST /optimize`.
///
/// Omitted sections fall back to the server's configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizeRequest {
    /// Real-time price forecast (non-empty).
    pub forecast: ForecastSet,
    #[serde(default)]
    pub cost: Option<CostParameters>,
    #[serde(default)]
    pub search: Option<NeurodynamicParams>,
    #[serde(default)]
    pub grid: Option<GridConfig>,
}

impl OptimizeRequest {
    /// Server defaults with this request's overrides applied.
    pub fn resolve(&self, defaults: &BiddingConfig) -> BiddingConfig {
        BiddingConfig {
            cost: self.cost.unwrap_or(defaults.cost),
            search: self.search.unwrap_or(defaults.search),
            grid: self.grid.clone().unwrap_or_else(|| defaults.grid.clone()),
            ensemble: defaults.ensemble.clone(),
        }
    }
}

/// Body of `POST /ensemble`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsembleRequest {
    /// Model name → predicted series.
    pub predictions: BTreeMap<String, Vec<f64>>,
    /// Validation ground truth.
    pub truth: Vec<f64>,
    /// Overrides the server's ensemble configuration.
    #[serde(default)]
    pub config: Option<EnsembleConfig>,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
