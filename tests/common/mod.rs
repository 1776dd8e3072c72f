//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use da_bidding::bidding::CostParameters;
use da_bidding::forecast::ForecastSet;

/// Fixed delivery-day start so fixtures are reproducible.
pub fn delivery_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

/// Builds a 15-minute forecast set from a bare price series with ±8% bands.
pub fn forecast_from(prices: &[f64]) -> ForecastSet {
    ForecastSet::from_series(delivery_start(), TimeDelta::minutes(15), prices, 0.08).unwrap()
}

/// Constant-price forecast of `n` points.
pub fn flat_forecast(price: f64, n: usize) -> ForecastSet {
    forecast_from(&vec![price; n])
}

/// One day of 15-minute prices oscillating around 420.
pub fn diurnal_forecast() -> ForecastSet {
    let prices: Vec<f64> = (0..96)
        .map(|i| 420.0 + 45.0 * (i as f64 * PI / 48.0).sin())
        .collect();
    forecast_from(&prices)
}

/// Generator with cost 375 and a wider regulation spread (530 / 310).
pub fn tight_margin_cost() -> CostParameters {
    CostParameters {
        generation_cost: 375.0,
        upward_cost: 530.0,
        downward_cost: 310.0,
        ..CostParameters::default()
    }
}

/// Validation truth used by the ensemble fixtures.
pub fn validation_truth() -> Vec<f64> {
    (0..12)
        .map(|i| 410.0 + 25.0 * (i as f64 * PI / 6.0).cos())
        .collect()
}

/// Four models whose MAEs against [`validation_truth`] are 5, 8, 12, and 20.
///
/// Each model alternates between over- and under-shooting by its error so
/// the errors do not cancel in the blend.
pub fn four_models() -> BTreeMap<String, Vec<f64>> {
    let truth = validation_truth();
    [("arima", 12.0), ("gbm", 5.0), ("lstm", 8.0), ("naive", 20.0)]
        .into_iter()
        .map(|(name, err)| {
            let series = truth
                .iter()
                .enumerate()
                .map(|(i, t)| if i % 2 == 0 { t + err } else { t - err })
                .collect();
            (name.to_string(), series)
        })
        .collect()
}
