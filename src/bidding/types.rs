//! Core bidding types: cost parameters, search tuning, and per-price results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BidError, Result};

/// Generator cost structure and physical limits.
///
/// # Examples
///
/// ```
/// use da_bidding::bidding::CostParameters;
///
/// let cost = CostParameters::default();
/// assert_eq!(cost.generation_cost, 380.0);
/// assert!(cost.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostParameters {
    /// Marginal generation cost per unit of power.
    pub generation_cost: f64,
    /// Cost of up-regulation (paid when real-time price exceeds the bid).
    pub upward_cost: f64,
    /// Cost of down-regulation (paid when real-time price is below the bid).
    pub downward_cost: f64,
    /// Maximum dispatchable power (must be > 0).
    pub max_power: f64,
    /// Cap on the up-regulation quantity settled per interval.
    pub max_up_regulation: f64,
    /// Cap on the down-regulation quantity settled per interval.
    pub max_down_regulation: f64,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            generation_cost: 380.0,
            upward_cost: 500.0,
            downward_cost: 300.0,
            max_power: 100.0,
            max_up_regulation: 3.0,
            max_down_regulation: 3.0,
        }
    }
}

impl CostParameters {
    /// Checks that every field is finite and strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("generation_cost", self.generation_cost),
            ("upward_cost", self.upward_cost),
            ("downward_cost", self.downward_cost),
            ("max_power", self.max_power),
            ("max_up_regulation", self.max_up_regulation),
            ("max_down_regulation", self.max_down_regulation),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(BidError::invalid(format!(
                    "cost parameter `{name}` must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Clamps `power` into `[0, max_power]`.
    pub fn clamp_power(&self, power: f64) -> f64 {
        power.clamp(0.0, self.max_power)
    }
}

/// Tuning for the per-price neurodynamic search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeurodynamicParams {
    /// Base learning rate before decay and gradient scaling.
    pub eta_base: f64,
    /// Floor on the adaptive learning rate.
    pub eta_min: f64,
    /// Iteration cap. Zero is accepted and yields an unconverged result.
    pub max_iter: usize,
    /// Step-size threshold under which the search is converged.
    pub tolerance: f64,
    /// Consecutive non-improving iterations tolerated before stalling.
    pub patience: usize,
    /// Exploration noise amplitude as a fraction of `max_power`.
    pub noise_factor: f64,
    /// Velocity retention factor.
    pub momentum: f64,
}

impl Default for NeurodynamicParams {
    fn default() -> Self {
        Self {
            eta_base: 0.05,
            eta_min: 0.0005,
            max_iter: 500,
            tolerance: 1e-5,
            patience: 50,
            noise_factor: 0.05,
            momentum: 0.85,
        }
    }
}

impl NeurodynamicParams {
    /// Checks learning-rate ordering and that all rates are finite.
    ///
    /// `max_iter == 0` is not rejected here; it produces an unconverged
    /// search which the grid scanner reports as
    /// [`BidError::NoConvergence`].
    ///
    /// # Errors
    ///
    /// Returns [`BidError::InvalidInput`] on the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("eta_base", self.eta_base),
            ("eta_min", self.eta_min),
            ("tolerance", self.tolerance),
            ("noise_factor", self.noise_factor),
            ("momentum", self.momentum),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(BidError::invalid(format!(
                    "search parameter `{name}` must be finite and >= 0, got {value}"
                )));
            }
        }
        if self.eta_min > self.eta_base {
            return Err(BidError::invalid(format!(
                "eta_min ({}) must be <= eta_base ({})",
                self.eta_min, self.eta_base
            )));
        }
        Ok(())
    }
}

/// Upper bound on the number of prices in one grid scan.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Inclusive range of candidate day-ahead prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Lowest candidate price.
    pub min: f64,
    /// Highest candidate price.
    pub max: f64,
}

impl PriceRange {
    /// Creates a new price range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Number of grid points at `step`, without building the grid.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::InvalidInput`] if the bounds are not finite,
    /// `min > max`, `step` is not strictly positive, or the grid would hold
    /// more than [`MAX_GRID_POINTS`] prices.
    pub fn point_count(&self, step: f64) -> Result<usize> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(BidError::invalid(format!(
                "price range [{}, {}] must be finite with min <= max",
                self.min, self.max
            )));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(BidError::invalid(format!(
                "price grid step must be finite and > 0, got {step}"
            )));
        }
        let count = ((self.max - self.min) / step + 1e-9).floor() + 1.0;
        if !count.is_finite() || count > MAX_GRID_POINTS as f64 {
            return Err(BidError::invalid(format!(
                "price grid [{}, {}] at step {step} exceeds {MAX_GRID_POINTS} points",
                self.min, self.max
            )));
        }
        Ok(count as usize)
    }

    /// Fixed-step grid over the range, generated by index to avoid
    /// accumulating floating-point drift.
    ///
    /// # Errors
    ///
    /// Same conditions as [`PriceRange::point_count`].
    pub fn grid(&self, step: f64) -> Result<Vec<f64>> {
        let count = self.point_count(step)?;
        Ok((0..count).map(|i| self.min + i as f64 * step).collect())
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::new(350.0, 500.0)
    }
}

/// Terminal state of one neurodynamic search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// Consecutive iterates moved less than the tolerance.
    Converged,
    /// No improvement for `patience` iterations.
    Stalled,
    /// A gradient or objective evaluation was not finite.
    Diverged,
    /// Ran out of iterations.
    Exhausted,
}

impl SearchStatus {
    /// Whether this status counts as converged for grid selection.
    pub fn is_converged(self) -> bool {
        matches!(self, Self::Converged | Self::Stalled)
    }

    /// Lower-case label used in CSV and log output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::Stalled => "stalled",
            Self::Diverged => "diverged",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one neurodynamic search at a fixed day-ahead price.
///
/// `power` and `objective` are the best-found pair, not necessarily the
/// last iterate. `power` is always within `[0, max_power]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// Day-ahead price this search was run for.
    pub day_ahead_price: f64,
    /// Best-found power bid.
    pub power: f64,
    /// Expected revenue at `power`.
    pub objective: f64,
    /// `true` for [`SearchStatus::Converged`] and [`SearchStatus::Stalled`].
    pub converged: bool,
    /// Loop iterations executed.
    pub iterations: usize,
    /// How the search terminated.
    pub status: SearchStatus,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "price={:>7.2} | power={:>7.3}  revenue={:>10.2} | {} after {} iter",
            self.day_ahead_price, self.power, self.objective, self.status, self.iterations,
        )
    }
}
