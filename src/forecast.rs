//! Real-time price forecasts consumed by the bidding optimizer.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BidError, Result};

/// Default spacing between forecast points (15-minute settlement intervals).
pub const DEFAULT_INTERVAL_MINUTES: i64 = 15;

/// Default half-width of the confidence band, as a fraction of the price.
pub const DEFAULT_CONFIDENCE_MARGIN: f64 = 0.08;

/// One predicted real-time price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Start of the settlement interval.
    pub timestamp: DateTime<Utc>,
    /// Predicted real-time (imbalance) price.
    pub predicted_price: f64,
    /// Upper edge of the confidence band, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_upper: Option<f64>,
    /// Lower edge of the confidence band, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_lower: Option<f64>,
}

impl ForecastPoint {
    /// Creates a point without a confidence band.
    pub fn new(timestamp: DateTime<Utc>, predicted_price: f64) -> Self {
        Self {
            timestamp,
            predicted_price,
            confidence_upper: None,
            confidence_lower: None,
        }
    }
}

/// Ordered, non-empty forecast covering the bidding horizon.
///
/// The set is immutable once built; every constructor rejects empty input
/// and non-finite prices so revenue averaging can never divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastPoint>", into = "Vec<ForecastPoint>")]
pub struct ForecastSet {
    points: Vec<ForecastPoint>,
}

impl ForecastSet {
    /// Builds a forecast set from explicit points.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::InvalidInput`] if `points` is empty or any
    /// predicted price is not finite.
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(BidError::invalid("forecast set must not be empty"));
        }
        if let Some(i) = points.iter().position(|p| !p.predicted_price.is_finite()) {
            return Err(BidError::invalid(format!(
                "forecast point {i} has a non-finite predicted price"
            )));
        }
        Ok(Self { points })
    }

    /// Builds a forecast set from a bare price series.
    ///
    /// Points are spaced `interval` apart starting at `start`, with a
    /// symmetric confidence band of `confidence_margin * price`.
    ///
    /// # Errors
    ///
    /// Same as [`ForecastSet::new`].
    pub fn from_series(
        start: DateTime<Utc>,
        interval: TimeDelta,
        prices: &[f64],
        confidence_margin: f64,
    ) -> Result<Self> {
        let mut timestamp = start;
        let mut points = Vec::with_capacity(prices.len());
        for &price in prices {
            let margin = price * confidence_margin;
            points.push(ForecastPoint {
                timestamp,
                predicted_price: price,
                confidence_upper: Some(price + margin),
                confidence_lower: Some(price - margin),
            });
            timestamp += interval;
        }
        Self::new(points)
    }

    /// Returns the forecast points in horizon order.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Iterates over the predicted prices.
    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.predicted_price)
    }

    /// Number of forecast points (always >= 1).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false` for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<ForecastPoint>> for ForecastSet {
    type Error = BidError;

    fn try_from(points: Vec<ForecastPoint>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<ForecastSet> for Vec<ForecastPoint> {
    fn from(set: ForecastSet) -> Self {
        set.points
    }
}

/// Summary statistics of a forecast set, reported next to the optimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketStats {
    /// Mean predicted price.
    pub avg_price: f64,
    /// Lowest predicted price.
    pub min_price: f64,
    /// Highest predicted price.
    pub max_price: f64,
    /// Population standard deviation of the predicted prices.
    pub volatility: f64,
}

impl MarketStats {
    /// Computes the statistics of `forecast`.
    pub fn from_forecast(forecast: &ForecastSet) -> Self {
        let n = forecast.len() as f64;
        let mut sum = 0.0;
        let mut min_price = f64::INFINITY;
        let mut max_price = f64::NEG_INFINITY;
        for p in forecast.prices() {
            sum += p;
            min_price = min_price.min(p);
            max_price = max_price.max(p);
        }
        let avg_price = sum / n;
        let variance = forecast
            .prices()
            .map(|p| (p - avg_price).powi(2))
            .sum::<f64>()
            / n;

        Self {
            avg_price,
            min_price,
            max_price,
            volatility: variance.sqrt(),
        }
    }
}

/// Naive "tomorrow is today" forecaster.
///
/// Copies the provided baseline and repeats/truncates it to match the
/// requested horizon. Used to stretch a blended forecast that is shorter
/// than the bidding horizon.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveForecast;

impl NaiveForecast {
    /// Produce a naive forecast for the given horizon.
    ///
    /// # Arguments
    ///
    /// * `baseline` - Historical or blended values used as the template
    /// * `horizon` - Number of steps to forecast
    ///
    /// # Returns
    ///
    /// A vector of length `horizon`; empty when `baseline` is empty.
    pub fn forecast(&self, baseline: &[f64], horizon: usize) -> Vec<f64> {
        if baseline.is_empty() {
            return Vec::new();
        }
        baseline.iter().copied().cycle().take(horizon).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = ForecastSet::new(Vec::new()).unwrap_err();
        assert!(matches!(err, BidError::InvalidInput(_)));
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let points = vec![
            ForecastPoint::new(start(), 400.0),
            ForecastPoint::new(start(), f64::NAN),
        ];
        let err = ForecastSet::new(points).unwrap_err();
        assert!(err.to_string().contains("point 1"));
    }

    #[test]
    fn from_series_spaces_points_and_adds_band() {
        let set = ForecastSet::from_series(
            start(),
            TimeDelta::minutes(DEFAULT_INTERVAL_MINUTES),
            &[400.0, 500.0],
            DEFAULT_CONFIDENCE_MARGIN,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        let second = &set.points()[1];
        assert_eq!(second.timestamp, start() + TimeDelta::minutes(15));
        assert_eq!(second.confidence_upper, Some(540.0));
        assert_eq!(second.confidence_lower, Some(460.0));
    }

    #[test]
    fn deserializing_empty_array_fails() {
        let parsed: std::result::Result<ForecastSet, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn market_stats_of_known_series() {
        let set = ForecastSet::from_series(start(), TimeDelta::hours(1), &[2.0, 4.0, 6.0], 0.0)
            .unwrap();
        let stats = MarketStats::from_forecast(&set);
        assert_eq!(stats.avg_price, 4.0);
        assert_eq!(stats.min_price, 2.0);
        assert_eq!(stats.max_price, 6.0);
        assert!((stats.volatility - (8.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn naive_forecast_matches_horizon_length() {
        let baseline = vec![1.0, 2.0, 3.0];
        let forecast = NaiveForecast.forecast(&baseline, 7);
        assert_eq!(forecast, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn naive_forecast_truncates_long_baseline() {
        let baseline = vec![0.5, 1.0, 1.5, 2.0];
        assert_eq!(NaiveForecast.forecast(&baseline, 2), vec![0.5, 1.0]);
        assert!(NaiveForecast.forecast(&[], 5).is_empty());
    }
}
