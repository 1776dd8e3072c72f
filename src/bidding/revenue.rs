//! Expected revenue of a day-ahead (price, power) bid.

use crate::error::{BidError, Result};
use crate::forecast::{ForecastPoint, ForecastSet};

use super::types::CostParameters;

/// Share of the bid that may be settled as regulation in one interval.
const REGULATION_SHARE: f64 = 0.1;

/// Expected revenue of bidding `power` at `da_price`, averaged over the
/// forecast horizon.
///
/// Each forecast point contributes the day-ahead margin
/// `(da_price - generation_cost) * power` plus an imbalance adjustment:
/// up-regulation when the real-time price is above the bid, down-regulation
/// when it is below, nothing when equal.
pub fn revenue(da_price: f64, power: f64, forecast: &ForecastSet, cost: &CostParameters) -> f64 {
    mean_revenue(da_price, power, forecast.points(), cost)
}

/// Slice-level variant of [`revenue`] for callers holding raw points.
///
/// # Errors
///
/// Returns [`BidError::InvalidInput`] if `points` is empty.
pub fn revenue_of_points(
    da_price: f64,
    power: f64,
    points: &[ForecastPoint],
    cost: &CostParameters,
) -> Result<f64> {
    if points.is_empty() {
        return Err(BidError::invalid("cannot average revenue over zero forecast points"));
    }
    Ok(mean_revenue(da_price, power, points, cost))
}

fn mean_revenue(da_price: f64, power: f64, points: &[ForecastPoint], cost: &CostParameters) -> f64 {
    let day_ahead = (da_price - cost.generation_cost) * power;
    let total: f64 = points
        .iter()
        .map(|p| day_ahead + imbalance_adjustment(da_price, power, p.predicted_price, cost))
        .sum();
    total / points.len() as f64
}

/// Settlement of the deviation between the bid and one real-time price.
fn imbalance_adjustment(da_price: f64, power: f64, rt_price: f64, cost: &CostParameters) -> f64 {
    if rt_price > da_price {
        let up = (power * REGULATION_SHARE).min(cost.max_up_regulation);
        up * (rt_price - cost.upward_cost)
    } else if rt_price < da_price {
        let down = (power * REGULATION_SHARE).min(cost.max_down_regulation);
        down * (cost.downward_cost - rt_price)
    } else {
        0.0
    }
}
