//! Forecast ensembling: score raw model forecasts, select a subset, blend.

pub mod metrics;
pub mod selection;
pub mod weighting;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BidError, Result};

pub use metrics::ModelPerformance;
pub use selection::SelectionMethod;
pub use weighting::{EnsembleMethod, EnsembleWeights};

/// Selection and weighting knobs for [`combine_forecasts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnsembleConfig {
    /// Policy that filters candidate models.
    pub selection: SelectionMethod,
    /// Models kept by [`SelectionMethod::TopK`].
    pub top_k: usize,
    /// MAE ceiling for [`SelectionMethod::Threshold`]; unset means no limit.
    pub max_mae: Option<f64>,
    /// RMSE ceiling for [`SelectionMethod::Threshold`]; unset means no limit.
    pub max_rmse: Option<f64>,
    /// R² floor for [`SelectionMethod::Threshold`]; unset means no limit.
    pub min_r2: Option<f64>,
    /// How blend weights are assigned to the selected models.
    pub method: EnsembleMethod,
    /// Models that are never selected, even by the fallback.
    pub exclude_models: Vec<String>,
    /// Smallest acceptable selection before falling back to the lowest-MAE models.
    pub min_models: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::All,
            top_k: 3,
            max_mae: None,
            max_rmse: None,
            min_r2: None,
            method: EnsembleMethod::WeightedAverage,
            exclude_models: Vec::new(),
            min_models: 1,
        }
    }
}

/// Result of one ensembling call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleOutcome {
    /// Selected model names, in name order.
    pub selected_models: Vec<String>,
    /// Blend weight per selected model, summing to 1.
    pub weights: EnsembleWeights,
    /// Scores for every supplied model, selected or not.
    pub performance: BTreeMap<String, ModelPerformance>,
    /// Weighted sum of the selected forecasts at each timestep.
    pub blended_forecast: Vec<f64>,
}

impl fmt::Display for EnsembleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Forecast Ensemble ===")?;
        for (name, perf) in &self.performance {
            match self.weights.get(name) {
                Some(w) => writeln!(f, "  {name:<16} w={w:.3}  {perf}")?,
                None => writeln!(f, "  {name:<16} (dropped)  {perf}")?,
            }
        }
        write!(f, "Blended horizon: {} steps", self.blended_forecast.len())
    }
}

/// Scores each model against `truth`, selects a subset, and blends it.
///
/// # Arguments
///
/// * `predictions` - Model name → predicted series, each as long as `truth`
/// * `truth` - Validation ground truth
/// * `config` - Selection and weighting policy
///
/// # Returns
///
/// The selected models, their weights (summing to 1), the performance of every
/// model, and the blended series.
///
/// # Errors
///
/// Returns [`BidError::InvalidInput`] if no models are supplied, a sequence is
/// empty or non-finite, lengths disagree, `top_k` is 0 under
/// [`SelectionMethod::TopK`], or every model is excluded.
pub fn combine_forecasts(
    predictions: &BTreeMap<String, Vec<f64>>,
    truth: &[f64],
    config: &EnsembleConfig,
) -> Result<EnsembleOutcome> {
    validate_inputs(predictions, truth, config)?;

    let mut performance = BTreeMap::new();
    for (name, series) in predictions {
        let perf = ModelPerformance::evaluate(series, truth)?;
        debug!(model = %name, mae = perf.mae, rmse = perf.rmse, r2 = perf.r2, "scored model");
        performance.insert(name.clone(), perf);
    }

    let selection = selection::select(&performance, config);
    if selection.models.is_empty() {
        return Err(BidError::invalid("every model is excluded"));
    }
    if selection.fell_back {
        warn!(
            policy = config.selection.as_str(),
            min_models = config.min_models,
            kept = selection.models.len(),
            "selection below minimum, falling back to lowest-MAE models"
        );
    }

    let weights = weighting::compute_weights(
        config.method,
        &selection.models,
        predictions,
        truth,
        &performance,
    );
    let blended_forecast = weighting::blend(&weights, predictions, truth.len());

    info!(
        selected = ?selection.models,
        method = config.method.as_str(),
        "ensemble combined"
    );

    Ok(EnsembleOutcome {
        selected_models: selection.models,
        weights,
        performance,
        blended_forecast,
    })
}

fn validate_inputs(
    predictions: &BTreeMap<String, Vec<f64>>,
    truth: &[f64],
    config: &EnsembleConfig,
) -> Result<()> {
    if predictions.is_empty() {
        return Err(BidError::invalid("at least one model is required"));
    }
    if truth.is_empty() {
        return Err(BidError::invalid("validation truth must not be empty"));
    }
    if truth.iter().any(|v| !v.is_finite()) {
        return Err(BidError::invalid("validation truth contains non-finite values"));
    }
    for (name, series) in predictions {
        if series.len() != truth.len() {
            return Err(BidError::invalid(format!(
                "model '{name}' has {} predictions, expected {}",
                series.len(),
                truth.len()
            )));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(BidError::invalid(format!(
                "model '{name}' contains non-finite predictions"
            )));
        }
    }
    if config.selection == SelectionMethod::TopK && config.top_k == 0 {
        return Err(BidError::invalid("top_k must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn truth() -> Vec<f64> {
        vec![400.0, 420.0, 410.0, 430.0, 450.0]
    }

    /// Series offset from truth by a constant, giving MAE == |offset|.
    fn offset(offset: f64) -> Vec<f64> {
        truth().iter().map(|t| t + offset).collect()
    }

    fn four_models() -> BTreeMap<String, Vec<f64>> {
        BTreeMap::from([
            ("a".to_string(), offset(5.0)),
            ("b".to_string(), offset(-8.0)),
            ("c".to_string(), offset(12.0)),
            ("d".to_string(), offset(-20.0)),
        ])
    }

    #[test]
    fn top_k_selects_three_lowest_mae() {
        let config = EnsembleConfig {
            selection: SelectionMethod::TopK,
            top_k: 3,
            ..EnsembleConfig::default()
        };
        let out = combine_forecasts(&four_models(), &truth(), &config).unwrap();
        assert_eq!(out.selected_models, ["a", "b", "c"]);
        assert_eq!(out.performance.len(), 4);
        assert_abs_diff_eq!(out.performance["d"].mae, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn weights_sum_to_one_for_every_policy() {
        let selections = [
            SelectionMethod::All,
            SelectionMethod::Threshold,
            SelectionMethod::TopK,
        ];
        let methods = [
            EnsembleMethod::SimpleAverage,
            EnsembleMethod::WeightedAverage,
            EnsembleMethod::Voting,
        ];
        for selection in selections {
            for method in methods {
                let config = EnsembleConfig {
                    selection,
                    method,
                    max_mae: Some(10.0),
                    top_k: 2,
                    ..EnsembleConfig::default()
                };
                let out = combine_forecasts(&four_models(), &truth(), &config).unwrap();
                let total: f64 = out.weights.values().sum();
                assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
                assert_eq!(out.weights.len(), out.selected_models.len());
                assert!(out.weights.values().all(|w| *w >= 0.0));
            }
        }
    }

    #[test]
    fn blend_follows_weights() {
        let predictions = BTreeMap::from([
            ("low".to_string(), offset(-10.0)),
            ("high".to_string(), offset(10.0)),
        ]);
        let config = EnsembleConfig {
            method: EnsembleMethod::SimpleAverage,
            ..EnsembleConfig::default()
        };
        let out = combine_forecasts(&predictions, &truth(), &config).unwrap();
        for (b, t) in out.blended_forecast.iter().zip(truth()) {
            assert_abs_diff_eq!(*b, t, epsilon = 1e-9);
        }
    }

    #[test]
    fn fallback_when_threshold_rejects_everything() {
        let config = EnsembleConfig {
            selection: SelectionMethod::Threshold,
            max_mae: Some(1.0),
            min_models: 2,
            ..EnsembleConfig::default()
        };
        let out = combine_forecasts(&four_models(), &truth(), &config).unwrap();
        assert_eq!(out.selected_models, ["a", "b"]);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let config = EnsembleConfig::default();
        assert!(matches!(
            combine_forecasts(&BTreeMap::new(), &truth(), &config),
            Err(BidError::InvalidInput(_))
        ));

        let short = BTreeMap::from([("a".to_string(), vec![1.0])]);
        assert!(matches!(
            combine_forecasts(&short, &truth(), &config),
            Err(BidError::InvalidInput(_))
        ));

        let nan = BTreeMap::from([("a".to_string(), vec![f64::NAN; 5])]);
        assert!(matches!(
            combine_forecasts(&nan, &truth(), &config),
            Err(BidError::InvalidInput(_))
        ));

        let empty = BTreeMap::from([("a".to_string(), Vec::new())]);
        assert!(matches!(
            combine_forecasts(&empty, &[], &config),
            Err(BidError::InvalidInput(_))
        ));

        let zero_k = EnsembleConfig {
            selection: SelectionMethod::TopK,
            top_k: 0,
            ..EnsembleConfig::default()
        };
        assert!(matches!(
            combine_forecasts(&four_models(), &truth(), &zero_k),
            Err(BidError::InvalidInput(_))
        ));

        let all_excluded = EnsembleConfig {
            exclude_models: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..EnsembleConfig::default()
        };
        assert!(matches!(
            combine_forecasts(&four_models(), &truth(), &all_excluded),
            Err(BidError::InvalidInput(_))
        ));
    }
}
