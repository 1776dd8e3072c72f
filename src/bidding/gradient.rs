//! Finite-difference revenue gradient with market-shape corrections.

use crate::forecast::ForecastSet;

use super::revenue::revenue;
use super::types::CostParameters;

/// Central-difference half-width.
pub const FINITE_DIFFERENCE_STEP: f64 = 0.01;

/// Correction added to the raw revenue gradient.
///
/// Implementations bias the search away from corner solutions. They must
/// push the power away from both `0` and `max_power` and may modulate that
/// pressure by price.
pub trait GradientPenalty: Sync {
    /// Returns the additive correction at `(da_price, power)`.
    fn correction(&self, da_price: f64, power: f64, cost: &CostParameters) -> f64;
}

/// Empirical competition and utilization terms of the production bidder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketHeuristics;

impl MarketHeuristics {
    /// Price-dependent competitive pressure once the margin exceeds 5.
    pub fn competition(da_price: f64, cost: &CostParameters) -> f64 {
        let margin = da_price - cost.generation_cost - 5.0;
        if margin > 0.0 {
            -0.1 * margin * (da_price / 10.0).sin()
        } else {
            0.0
        }
    }

    /// Pushes power away from both extremes of the operating range.
    pub fn utilization(da_price: f64, power: f64, cost: &CostParameters) -> f64 {
        let ratio = power / cost.max_power;
        if ratio < 0.2 {
            0.2 * (0.2 - ratio) * (-5.0 * ratio).exp()
        } else if ratio > 0.8 {
            -0.15 * (ratio - 0.8) * (1.0 + (da_price / 8.0).sin())
        } else {
            0.0
        }
    }
}

impl GradientPenalty for MarketHeuristics {
    fn correction(&self, da_price: f64, power: f64, cost: &CostParameters) -> f64 {
        Self::competition(da_price, cost) + Self::utilization(da_price, power, cost)
    }
}

/// Raw central-difference derivative of [`revenue`] with respect to power.
pub fn revenue_gradient(
    da_price: f64,
    power: f64,
    forecast: &ForecastSet,
    cost: &CostParameters,
) -> f64 {
    let h = FINITE_DIFFERENCE_STEP;
    let up = revenue(da_price, power + h, forecast, cost);
    let down = revenue(da_price, power - h, forecast, cost);
    (up - down) / (2.0 * h)
}

/// Corrected gradient driving the neurodynamic search.
pub fn gradient(
    da_price: f64,
    power: f64,
    forecast: &ForecastSet,
    cost: &CostParameters,
    penalty: &dyn GradientPenalty,
) -> f64 {
    revenue_gradient(da_price, power, forecast, cost) + penalty.correction(da_price, power, cost)
}
