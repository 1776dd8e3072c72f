//! Grid scan over candidate day-ahead prices and global bid selection.

use std::fmt;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{BidError, Result};
use crate::forecast::{ForecastSet, MarketStats};

use super::gradient::{GradientPenalty, MarketHeuristics};
use super::revenue::revenue;
use super::search::NeurodynamicSearch;
use super::threshold::{ThresholdRegion, detect_threshold_regions};
use super::types::{CostParameters, NeurodynamicParams, OptimizationResult, PriceRange};

/// First power level of the revenue surface.
const POWER_GRID_START: f64 = 50.0;
/// Spacing of the revenue surface along the power axis.
const POWER_GRID_STEP: f64 = 2.5;

/// How many grid points produced a usable search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergenceStats {
    /// Grid size.
    pub total_points: usize,
    /// Grid points whose search converged or stalled.
    pub converged_points: usize,
    /// `converged_points / total_points`.
    pub converged_ratio: f64,
}

impl ConvergenceStats {
    fn from_results(results: &[OptimizationResult]) -> Self {
        let total_points = results.len();
        let converged_points = results.iter().filter(|r| r.converged).count();
        let converged_ratio = if total_points > 0 {
            converged_points as f64 / total_points as f64
        } else {
            0.0
        };
        Self {
            total_points,
            converged_points,
            converged_ratio,
        }
    }
}

/// Full outcome of a bidding optimization.
#[derive(Debug, Clone, Serialize)]
pub struct BidOptimization {
    /// Day-ahead price of the best converged grid point.
    pub optimal_price: f64,
    /// Power bid at `optimal_price`.
    pub optimal_power: f64,
    /// Expected revenue of the optimal bid.
    pub expected_revenue: f64,
    /// Converged grid prices in ascending order.
    pub price_grid: Vec<f64>,
    /// Power levels of the revenue surface.
    pub power_grid: Vec<f64>,
    /// `revenue_matrix[i][j]` is the revenue at `price_grid[i]`, `power_grid[j]`.
    pub revenue_matrix: Vec<Vec<f64>>,
    /// Grid convergence summary.
    pub convergence_stats: ConvergenceStats,
    /// Regime changes in the price→power curve.
    pub threshold_regions: Vec<ThresholdRegion>,
    /// Statistics of the input forecast.
    pub market_stats: MarketStats,
    /// Search result of the winning grid point.
    pub best: OptimizationResult,
    /// Every grid point's search result, in grid order.
    pub results: Vec<OptimizationResult>,
}

impl BidOptimization {
    /// `(price, power)` pairs of the converged grid points, ascending by price.
    pub fn power_curve(&self) -> Vec<(f64, f64)> {
        converged_curve(&self.results)
    }
}

impl fmt::Display for BidOptimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Bid Optimization ---")?;
        writeln!(f, "Optimal day-ahead price: {:.2}", self.optimal_price)?;
        writeln!(f, "Optimal power:           {:.2}", self.optimal_power)?;
        writeln!(f, "Expected revenue:        {:.2}", self.expected_revenue)?;
        writeln!(
            f,
            "Converged grid points:   {}/{} ({:.1}%)",
            self.convergence_stats.converged_points,
            self.convergence_stats.total_points,
            self.convergence_stats.converged_ratio * 100.0
        )?;
        writeln!(
            f,
            "Forecast price:          avg {:.2}, range [{:.2}, {:.2}], volatility {:.2}",
            self.market_stats.avg_price,
            self.market_stats.min_price,
            self.market_stats.max_price,
            self.market_stats.volatility
        )?;
        write!(f, "Threshold regions:       {}", self.threshold_regions.len())?;
        for r in &self.threshold_regions {
            write!(f, "\n  [{:.2}, {:.2}] around {:.2}", r.start, r.end, r.center)?;
        }
        Ok(())
    }
}

/// Runs one neurodynamic search per grid price and reduces to the best bid.
///
/// Grid points share only read-only inputs, so the map step runs on the
/// rayon pool when the `parallel` feature is enabled. Results are identical
/// either way.
pub struct GridScanner<'a> {
    forecast: &'a ForecastSet,
    cost: &'a CostParameters,
    params: &'a NeurodynamicParams,
    penalty: &'a dyn GradientPenalty,
    deadline: Option<Instant>,
}

impl<'a> GridScanner<'a> {
    /// Creates a scanner using the default gradient corrections.
    pub fn new(
        forecast: &'a ForecastSet,
        cost: &'a CostParameters,
        params: &'a NeurodynamicParams,
    ) -> Self {
        Self {
            forecast,
            cost,
            params,
            penalty: &MarketHeuristics,
            deadline: None,
        }
    }

    /// Replaces the gradient correction used by every search.
    pub fn with_penalty(mut self, penalty: &'a dyn GradientPenalty) -> Self {
        self.penalty = penalty;
        self
    }

    /// Stops scheduling grid points once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Searches every price of `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::DeadlineExceeded`] if the deadline expired before
    /// every grid point was searched.
    pub fn scan(&self, grid: &[f64]) -> Result<Vec<OptimizationResult>> {
        let search =
            NeurodynamicSearch::with_penalty(self.forecast, self.cost, self.params, self.penalty);
        let evaluate = |&price: &f64| -> Option<OptimizationResult> {
            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            Some(search.run(price))
        };

        #[cfg(feature = "parallel")]
        let mapped: Vec<Option<OptimizationResult>> = grid.par_iter().map(evaluate).collect();
        #[cfg(not(feature = "parallel"))]
        let mapped: Vec<Option<OptimizationResult>> = grid.iter().map(evaluate).collect();

        let evaluated = mapped.iter().filter(|r| r.is_some()).count();
        if evaluated < grid.len() {
            return Err(BidError::DeadlineExceeded {
                evaluated,
                total: grid.len(),
            });
        }
        Ok(mapped.into_iter().flatten().collect())
    }

    /// Scans `range` at `step` and selects the revenue-maximizing bid.
    ///
    /// # Errors
    ///
    /// - [`BidError::InvalidInput`] for invalid costs, search parameters, or grid.
    /// - [`BidError::NoConvergence`] if no grid point converged.
    /// - [`BidError::DeadlineExceeded`] if the deadline expired.
    pub fn optimize(&self, range: PriceRange, step: f64) -> Result<BidOptimization> {
        self.cost.validate()?;
        self.params.validate()?;
        let grid = range.grid(step)?;
        debug!(points = grid.len(), min = range.min, max = range.max, step, "scanning price grid");

        let results = self.scan(&grid)?;
        let convergence_stats = ConvergenceStats::from_results(&results);

        let best = results
            .iter()
            .filter(|r| r.converged)
            .fold(None::<&OptimizationResult>, |best, r| match best {
                Some(b) if b.objective >= r.objective => Some(b),
                _ => Some(r),
            })
            .copied()
            .ok_or(BidError::NoConvergence {
                total_points: results.len(),
            })?;

        let curve = converged_curve(&results);
        let threshold_regions = detect_threshold_regions(&curve);
        let price_grid: Vec<f64> = curve.iter().map(|&(price, _)| price).collect();
        let power_grid = power_grid(self.cost.max_power);
        let revenue_matrix = price_grid
            .iter()
            .map(|&price| {
                power_grid
                    .iter()
                    .map(|&power| revenue(price, power, self.forecast, self.cost))
                    .collect()
            })
            .collect();

        info!(
            price = best.day_ahead_price,
            power = best.power,
            revenue = best.objective,
            converged = convergence_stats.converged_points,
            total = convergence_stats.total_points,
            regions = threshold_regions.len(),
            "selected day-ahead bid"
        );

        Ok(BidOptimization {
            optimal_price: best.day_ahead_price,
            optimal_power: best.power,
            expected_revenue: best.objective,
            price_grid,
            power_grid,
            revenue_matrix,
            convergence_stats,
            threshold_regions,
            market_stats: MarketStats::from_forecast(self.forecast),
            best,
            results,
        })
    }
}

/// Optimizes a day-ahead bid over a fixed-step price grid.
///
/// Convenience wrapper around [`GridScanner::optimize`] with the default
/// gradient corrections and no deadline.
///
/// # Errors
///
/// See [`GridScanner::optimize`].
pub fn optimize(
    forecast: &ForecastSet,
    cost: &CostParameters,
    params: &NeurodynamicParams,
    range: PriceRange,
    step: f64,
) -> Result<BidOptimization> {
    GridScanner::new(forecast, cost, params).optimize(range, step)
}

fn converged_curve(results: &[OptimizationResult]) -> Vec<(f64, f64)> {
    let mut curve: Vec<(f64, f64)> = results
        .iter()
        .filter(|r| r.converged)
        .map(|r| (r.day_ahead_price, r.power))
        .collect();
    curve.sort_by(|a, b| a.0.total_cmp(&b.0));
    curve
}

/// Power axis of the revenue surface: `50, 52.5, ..., max_power`, or from
/// zero when `max_power` is below the first level.
fn power_grid(max_power: f64) -> Vec<f64> {
    let start = if max_power >= POWER_GRID_START {
        POWER_GRID_START
    } else {
        0.0
    };
    let count = ((max_power - start) / POWER_GRID_STEP + 1e-9).floor() as usize + 1;
    (0..count)
        .map(|i| start + i as f64 * POWER_GRID_STEP)
        .collect()
}
