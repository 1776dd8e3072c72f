//! Neurodynamic local search for the revenue-maximizing power at one price.
//!
//! The search is a momentum gradient ascent with an adaptive learning rate
//! and decaying exploration noise. All randomness comes from a
//! [`PriceSeededRng`] derived from the day-ahead price, so identical inputs
//! always reproduce the identical trajectory.

use std::f64::consts::PI;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{trace, warn};

use crate::forecast::ForecastSet;

use super::gradient::{GradientPenalty, MarketHeuristics, gradient};
use super::revenue::revenue;
use super::types::{CostParameters, NeurodynamicParams, OptimizationResult, SearchStatus};

/// Deterministic generator owned by one search.
///
/// The seed depends on the day-ahead price alone:
/// `floor(price * 1000) mod 2^32`.
#[derive(Debug, Clone)]
pub struct PriceSeededRng {
    seed: u64,
    rng: StdRng,
}

impl PriceSeededRng {
    /// Creates the generator for `da_price`.
    pub fn for_price(da_price: f64) -> Self {
        let seed = Self::seed_for(da_price);
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The seed derived from `da_price`.
    pub fn seed_for(da_price: f64) -> u64 {
        ((da_price * 1000.0).floor() as i64).rem_euclid(1 << 32) as u64
    }

    /// Seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform sample in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Mutable state of one search, threaded through the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    /// Current iterate.
    pub power: f64,
    /// Momentum-smoothed step.
    pub velocity: f64,
    /// Best power seen so far.
    pub best_power: f64,
    /// Revenue at `best_power`; `-inf` until the first evaluation.
    pub best_objective: f64,
    /// Iterations executed.
    pub iteration: usize,
    /// Consecutive iterations without improvement.
    pub no_improve_count: usize,
}

impl SearchState {
    fn new(power: f64) -> Self {
        Self {
            power,
            velocity: 0.0,
            best_power: power,
            best_objective: f64::NEG_INFINITY,
            iteration: 0,
            no_improve_count: 0,
        }
    }
}

/// Result of a search together with its visited iterates.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTrace {
    /// Final result.
    pub result: OptimizationResult,
    /// Proposed power at every executed iteration, in order.
    pub trajectory: Vec<f64>,
}

/// Per-price optimizer over read-only inputs.
///
/// Holds no mutable state: every call to [`NeurodynamicSearch::run`] builds
/// its own [`SearchState`] and [`PriceSeededRng`], so one instance can be
/// shared across worker threads.
pub struct NeurodynamicSearch<'a> {
    forecast: &'a ForecastSet,
    cost: &'a CostParameters,
    params: &'a NeurodynamicParams,
    penalty: &'a dyn GradientPenalty,
}

impl<'a> NeurodynamicSearch<'a> {
    /// Creates a search using the [`MarketHeuristics`] gradient corrections.
    pub fn new(
        forecast: &'a ForecastSet,
        cost: &'a CostParameters,
        params: &'a NeurodynamicParams,
    ) -> Self {
        Self::with_penalty(forecast, cost, params, &MarketHeuristics)
    }

    /// Creates a search with a caller-supplied gradient correction.
    pub fn with_penalty(
        forecast: &'a ForecastSet,
        cost: &'a CostParameters,
        params: &'a NeurodynamicParams,
        penalty: &'a dyn GradientPenalty,
    ) -> Self {
        Self {
            forecast,
            cost,
            params,
            penalty,
        }
    }

    /// Runs the search at `da_price` with its price-derived generator.
    pub fn run(&self, da_price: f64) -> OptimizationResult {
        let (result, _) = self.run_with_rng(da_price, PriceSeededRng::for_price(da_price));
        result
    }

    /// Runs the search and records every proposed iterate.
    pub fn run_traced(&self, da_price: f64) -> SearchTrace {
        let mut trajectory = Vec::new();
        let mut rng = PriceSeededRng::for_price(da_price);
        let result = self.iterate(da_price, &mut rng, Some(&mut trajectory));
        SearchTrace { result, trajectory }
    }

    /// Runs the search with an explicit generator, handing it back afterwards.
    pub fn run_with_rng(
        &self,
        da_price: f64,
        mut rng: PriceSeededRng,
    ) -> (OptimizationResult, PriceSeededRng) {
        let result = self.iterate(da_price, &mut rng, None);
        (result, rng)
    }

    fn iterate(
        &self,
        da_price: f64,
        rng: &mut PriceSeededRng,
        mut trajectory: Option<&mut Vec<f64>>,
    ) -> OptimizationResult {
        let cost = self.cost;
        let params = self.params;
        let mut state = SearchState::new(initial_power(da_price, cost, rng));
        let mut status = SearchStatus::Exhausted;

        while state.iteration < params.max_iter {
            let iter = state.iteration;
            state.iteration += 1;

            let grad = gradient(da_price, state.power, self.forecast, cost, self.penalty);
            if !grad.is_finite() {
                status = SearchStatus::Diverged;
                break;
            }

            let eta = adaptive_learning_rate(iter, grad, da_price, params);
            let noise = exploration_noise(iter, da_price, cost, params, rng);

            state.velocity = params.momentum * state.velocity + eta * grad;
            let proposed = cost.clamp_power(state.power + state.velocity + noise);
            if let Some(t) = trajectory.as_mut() {
                t.push(proposed);
            }

            let objective = revenue(da_price, proposed, self.forecast, cost);
            if !objective.is_finite() {
                status = SearchStatus::Diverged;
                break;
            }

            if objective > state.best_objective {
                state.best_objective = objective;
                state.best_power = proposed;
                state.no_improve_count = 0;
            } else {
                state.no_improve_count += 1;
            }

            if (proposed - state.power).abs() < params.tolerance {
                state.power = proposed;
                status = SearchStatus::Converged;
                break;
            }
            if state.no_improve_count >= params.patience {
                status = SearchStatus::Stalled;
                break;
            }
            state.power = proposed;
        }

        if status == SearchStatus::Diverged {
            warn!(
                da_price,
                iteration = state.iteration,
                "search diverged, keeping best-found power"
            );
        }
        trace!(
            da_price,
            power = state.best_power,
            objective = state.best_objective,
            iterations = state.iteration,
            %status,
            "search finished"
        );

        OptimizationResult {
            day_ahead_price: da_price,
            power: state.best_power,
            objective: state.best_objective,
            converged: status.is_converged(),
            iterations: state.iteration,
            status,
        }
    }
}

/// Starting power from the price/cost tier plus a price-ratio perturbation.
pub(crate) fn initial_power(da_price: f64, cost: &CostParameters, rng: &mut PriceSeededRng) -> f64 {
    let g = cost.generation_cost;
    let (low, span) = if da_price > g + 20.0 {
        (0.7, 0.2)
    } else if da_price > g {
        (0.4, 0.3)
    } else {
        (0.1, 0.2)
    };
    let seeded = cost.max_power * (low + span * rng.uniform());
    let perturbation = ((da_price / g) * PI).sin() * cost.max_power * 0.1;
    cost.clamp_power(seeded + perturbation)
}

/// Decaying learning rate, damped for steep gradients and boosted for flat ones.
pub(crate) fn adaptive_learning_rate(
    iter: usize,
    grad: f64,
    da_price: f64,
    params: &NeurodynamicParams,
) -> f64 {
    let mut eta = params.eta_base * (-(iter as f64) / 1000.0).exp();
    let magnitude = grad.abs();
    if magnitude > 1.0 {
        eta *= 0.5;
    } else if magnitude < 0.1 {
        eta *= 1.5;
    }
    eta *= 0.8 + 0.4 * da_price / 400.0;
    eta.max(params.eta_min)
}

/// Seeded exploration noise shrinking over the iteration budget, plus a
/// deterministic price-dependent oscillation.
fn exploration_noise(
    iter: usize,
    da_price: f64,
    cost: &CostParameters,
    params: &NeurodynamicParams,
    rng: &mut PriceSeededRng,
) -> f64 {
    let progress = iter as f64 / params.max_iter as f64;
    let amplitude = params.noise_factor * cost.max_power * (1.0 - progress).max(0.0).sqrt();
    let oscillation =
        0.01 * cost.max_power * (da_price / 20.0).sin() * (iter as f64 / 50.0).cos();
    (rng.uniform() - 0.5) * 2.0 * amplitude + oscillation
}
