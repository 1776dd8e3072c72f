//! TOML-based bidding configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::bidding::{
    BidOptimization, CostParameters, GridScanner, MAX_GRID_POINTS, NeurodynamicParams, PriceRange,
};
use crate::ensemble::{EnsembleConfig, SelectionMethod};
use crate::forecast::ForecastSet;

/// Top-level bidding configuration parsed from TOML.
///
/// All fields have defaults matching the baseline market. Load from
/// TOML with [`BiddingConfig::from_toml_file`] or use
/// [`BiddingConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BiddingConfig {
    /// Generator and regulation costs.
    #[serde(default)]
    pub cost: CostParameters,
    /// Neurodynamic search tuning.
    #[serde(default)]
    pub search: NeurodynamicParams,
    /// Candidate day-ahead price grid.
    #[serde(default)]
    pub grid: GridConfig,
    /// Forecast ensemble selection and weighting.
    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

/// Candidate day-ahead price grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Lowest candidate price.
    pub price_min: f64,
    /// Highest candidate price (inclusive).
    pub price_max: f64,
    /// Spacing between candidate prices.
    pub price_step: f64,
    /// Wall-clock budget for one optimization, in milliseconds.
    pub deadline_ms: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        let range = PriceRange::default();
        Self {
            price_min: range.min,
            price_max: range.max,
            price_step: 2.0,
            deadline_ms: None,
        }
    }
}

impl GridConfig {
    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.price_min, self.price_max)
    }

    /// Deadline measured from `start`, if a budget is configured.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.deadline_ms.map(|ms| start + Duration::from_millis(ms))
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"cost.max_power"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl BiddingConfig {
    /// Returns the baseline market (cost 380 / 500 / 300, prices 350..500).
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the tight-margin preset: higher-efficiency generator facing
    /// a steeper regulation spread.
    pub fn tight_margin() -> Self {
        Self {
            cost: CostParameters {
                generation_cost: 375.0,
                upward_cost: 530.0,
                downward_cost: 310.0,
                ..CostParameters::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "tight_margin"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "tight_margin" => Ok(Self::tight_margin()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Optimizes a bid for `forecast` over the configured price grid.
    ///
    /// The deadline, if configured, starts counting at the call.
    ///
    /// # Errors
    ///
    /// See [`GridScanner::optimize`].
    pub fn optimize(&self, forecast: &ForecastSet) -> crate::error::Result<BidOptimization> {
        let mut scanner = GridScanner::new(forecast, &self.cost, &self.search);
        if let Some(deadline) = self.grid.deadline_from(Instant::now()) {
            scanner = scanner.with_deadline(deadline);
        }
        scanner.optimize(self.grid.price_range(), self.grid.price_step)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let c = &self.cost;
        for (field, value) in [
            ("cost.generation_cost", c.generation_cost),
            ("cost.upward_cost", c.upward_cost),
            ("cost.downward_cost", c.downward_cost),
            ("cost.max_power", c.max_power),
            ("cost.max_up_regulation", c.max_up_regulation),
            ("cost.max_down_regulation", c.max_down_regulation),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(ConfigError::new(field, "must be finite and > 0"));
            }
        }

        let s = &self.search;
        for (field, value) in [
            ("search.eta_base", s.eta_base),
            ("search.eta_min", s.eta_min),
            ("search.tolerance", s.tolerance),
            ("search.noise_factor", s.noise_factor),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }
        if s.eta_min > s.eta_base {
            errors.push(ConfigError::new("search.eta_min", "must be <= search.eta_base"));
        }
        if s.max_iter == 0 {
            errors.push(ConfigError::new("search.max_iter", "must be > 0"));
        }
        if s.patience == 0 {
            errors.push(ConfigError::new("search.patience", "must be > 0"));
        }
        if !(0.0..1.0).contains(&s.momentum) {
            errors.push(ConfigError::new("search.momentum", "must be in [0.0, 1.0)"));
        }

        let g = &self.grid;
        if !(g.price_min.is_finite() && g.price_max.is_finite()) {
            errors.push(ConfigError::new("grid.price_min", "bounds must be finite"));
        } else if g.price_min > g.price_max {
            errors.push(ConfigError::new("grid.price_min", "must be <= grid.price_max"));
        }
        if !(g.price_step.is_finite() && g.price_step > 0.0) {
            errors.push(ConfigError::new("grid.price_step", "must be finite and > 0"));
        } else if errors.iter().all(|e| e.field != "grid.price_min")
            && g.price_range().point_count(g.price_step).is_err()
        {
            errors.push(ConfigError::new(
                "grid.price_step",
                format!("grid must hold at most {MAX_GRID_POINTS} prices"),
            ));
        }
        if g.deadline_ms == Some(0) {
            errors.push(ConfigError::new("grid.deadline_ms", "must be > 0 when set"));
        }

        let e = &self.ensemble;
        if e.selection == SelectionMethod::TopK && e.top_k == 0 {
            errors.push(ConfigError::new("ensemble.top_k", "must be > 0 for top_k selection"));
        }
        if e.min_models == 0 {
            errors.push(ConfigError::new("ensemble.min_models", "must be > 0"));
        }
        for (field, bound) in [
            ("ensemble.max_mae", e.max_mae),
            ("ensemble.max_rmse", e.max_rmse),
        ] {
            if bound.is_some_and(|b| !(b.is_finite() && b >= 0.0)) {
                errors.push(ConfigError::new(field, "must be finite and >= 0"));
            }
        }
        if e.min_r2.is_some_and(|r| !r.is_finite()) {
            errors.push(ConfigError::new("ensemble.min_r2", "must be finite"));
        }

        errors
    }
}
