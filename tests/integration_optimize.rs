//! Integration tests for the day-ahead bid optimizer.

mod common;

use approx::assert_abs_diff_eq;
use da_bidding::BidError;
use da_bidding::bidding::{
    CostParameters, GridScanner, NeurodynamicParams, PriceRange, detect_threshold_regions,
    optimize, revenue,
};
use da_bidding::forecast::ForecastSet;

#[test]
fn constant_500_forecast_bids_full_power_at_top_of_grid() {
    let forecast = common::flat_forecast(500.0, 96);
    let cost = common::tight_margin_cost();
    let params = NeurodynamicParams::default();

    let out = optimize(&forecast, &cost, &params, PriceRange::default(), 2.0).unwrap();

    assert_eq!(out.convergence_stats.total_points, 76);
    assert_eq!(out.optimal_price, 500.0);
    assert_abs_diff_eq!(out.optimal_power, 100.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out.expected_revenue, 12_500.0, epsilon = 1e-3);
    assert!(out.best.converged);
    assert_eq!(out.market_stats.volatility, 0.0);
}

#[test]
fn default_grid_has_76_points_and_smooth_curve_has_no_regions() {
    let grid = PriceRange::default().grid(2.0).unwrap();
    assert_eq!(grid.len(), 76);
    assert_eq!(grid[0], 350.0);
    assert_eq!(grid[75], 500.0);

    let curve: Vec<(f64, f64)> = grid
        .iter()
        .enumerate()
        .map(|(i, &price)| (price, 20.0 + 1.05 * i as f64))
        .collect();
    assert!(detect_threshold_regions(&curve).is_empty());
}

#[test]
fn optimization_is_deterministic() {
    let forecast = common::diurnal_forecast();
    let cost = CostParameters::default();
    let params = NeurodynamicParams::default();
    let range = PriceRange::new(380.0, 480.0);

    let a = optimize(&forecast, &cost, &params, range, 4.0).unwrap();
    let b = optimize(&forecast, &cost, &params, range, 4.0).unwrap();

    assert_eq!(a.results.len(), b.results.len());
    for (x, y) in a.results.iter().zip(&b.results) {
        assert_eq!(x.day_ahead_price.to_bits(), y.day_ahead_price.to_bits());
        assert_eq!(x.power.to_bits(), y.power.to_bits());
        assert_eq!(x.objective.to_bits(), y.objective.to_bits());
        assert_eq!(x.iterations, y.iterations);
        assert_eq!(x.status, y.status);
    }
    assert_eq!(a.threshold_regions, b.threshold_regions);
}

#[test]
fn results_respect_power_bounds_and_grid_order() {
    let forecast = common::diurnal_forecast();
    let cost = CostParameters {
        max_power: 60.0,
        ..CostParameters::default()
    };
    let params = NeurodynamicParams::default();

    let out = optimize(&forecast, &cost, &params, PriceRange::default(), 5.0).unwrap();

    assert!(out.results.iter().all(|r| (0.0..=60.0).contains(&r.power)));
    assert!(
        out.results
            .windows(2)
            .all(|w| w[0].day_ahead_price < w[1].day_ahead_price)
    );
    assert!(out.price_grid.windows(2).all(|w| w[0] < w[1]));
    // revenue surface spans 50..=max_power in 2.5 steps
    assert_eq!(out.power_grid.first(), Some(&50.0));
    assert_eq!(out.power_grid.last(), Some(&60.0));
    for r in &out.threshold_regions {
        assert!(r.start <= r.center && r.center <= r.end);
    }
}

#[test]
fn zero_max_iter_yields_no_convergence() {
    let forecast = common::diurnal_forecast();
    let cost = CostParameters::default();
    let params = NeurodynamicParams {
        max_iter: 0,
        ..NeurodynamicParams::default()
    };
    let err = optimize(&forecast, &cost, &params, PriceRange::default(), 2.0).unwrap_err();
    assert!(matches!(err, BidError::NoConvergence { total_points: 76 }));
}

#[test]
fn empty_forecast_is_rejected_at_construction() {
    let err = ForecastSet::new(Vec::new()).unwrap_err();
    assert!(matches!(err, BidError::InvalidInput(_)));
}

#[test]
fn revenue_is_finite_across_power_range() {
    let forecast = common::diurnal_forecast();
    let cost = CostParameters::default();
    for price in [350.0, 380.0, 420.0, 465.0, 500.0] {
        for step in 0..=40 {
            let power = cost.max_power * step as f64 / 40.0;
            assert!(revenue(price, power, &forecast, &cost).is_finite());
        }
    }
}

#[test]
fn scan_matches_optimize_results() {
    let forecast = common::diurnal_forecast();
    let cost = CostParameters::default();
    let params = NeurodynamicParams::default();
    let range = PriceRange::new(400.0, 440.0);
    let grid = range.grid(10.0).unwrap();

    let scanner = GridScanner::new(&forecast, &cost, &params);
    let scanned = scanner.scan(&grid).unwrap();
    let optimized = scanner.optimize(range, 10.0).unwrap();

    assert_eq!(scanned, optimized.results);
}
