//! Weighting policies and the final blend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metrics::ModelPerformance;

/// Regularizer added to MAE before inverting it.
pub const INVERSE_MAE_EPSILON: f64 = 1e-8;

/// Model name → blend weight. Weights sum to 1 over the selected models.
pub type EnsembleWeights = BTreeMap<String, f64>;

/// How blend weights are assigned to the selected models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMethod {
    /// Uniform `1/n`.
    SimpleAverage,
    /// Proportional to `1/(MAE + ε)`.
    #[default]
    WeightedAverage,
    /// Share of timesteps on which the model had the smallest absolute error.
    Voting,
}

impl EnsembleMethod {
    /// Name as written in TOML and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            EnsembleMethod::SimpleAverage => "simple_average",
            EnsembleMethod::WeightedAverage => "weighted_average",
            EnsembleMethod::Voting => "voting",
        }
    }
}

/// Computes weights for `selected` (non-empty, in name order).
pub(crate) fn compute_weights(
    method: EnsembleMethod,
    selected: &[String],
    predictions: &BTreeMap<String, Vec<f64>>,
    truth: &[f64],
    performance: &BTreeMap<String, ModelPerformance>,
) -> EnsembleWeights {
    let raw: Vec<f64> = match method {
        EnsembleMethod::SimpleAverage => vec![1.0; selected.len()],
        EnsembleMethod::WeightedAverage => selected
            .iter()
            .map(|name| {
                let mae = performance.get(name).map_or(0.0, |p| p.mae);
                1.0 / (mae + INVERSE_MAE_EPSILON)
            })
            .collect(),
        EnsembleMethod::Voting => vote_counts(selected, predictions, truth),
    };

    normalize(selected, &raw)
}

/// Per-model count of timesteps won. Ties go to the earliest name.
fn vote_counts(
    selected: &[String],
    predictions: &BTreeMap<String, Vec<f64>>,
    truth: &[f64],
) -> Vec<f64> {
    let series: Vec<&[f64]> = selected
        .iter()
        .map(|name| predictions.get(name).map_or(&[][..], Vec::as_slice))
        .collect();

    let mut votes = vec![0.0; selected.len()];
    for (t, actual) in truth.iter().enumerate() {
        let mut winner = 0;
        let mut best = f64::INFINITY;
        for (i, s) in series.iter().enumerate() {
            let err = (s[t] - actual).abs();
            if err < best {
                best = err;
                winner = i;
            }
        }
        votes[winner] += 1.0;
    }
    votes
}

fn normalize(selected: &[String], raw: &[f64]) -> EnsembleWeights {
    let total: f64 = raw.iter().sum();
    let uniform = 1.0 / selected.len() as f64;
    selected
        .iter()
        .zip(raw)
        .map(|(name, &w)| {
            let weight = if total > 0.0 && total.is_finite() {
                w / total
            } else {
                uniform
            };
            (name.clone(), weight)
        })
        .collect()
}

/// Weighted sum of the selected series at each timestep.
pub(crate) fn blend(
    weights: &EnsembleWeights,
    predictions: &BTreeMap<String, Vec<f64>>,
    len: usize,
) -> Vec<f64> {
    let mut blended = vec![0.0; len];
    for (name, &weight) in weights {
        if let Some(series) = predictions.get(name) {
            for (out, &p) in blended.iter_mut().zip(series) {
                *out += weight * p;
            }
        }
    }
    blended
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn perf(mae: f64) -> ModelPerformance {
        ModelPerformance {
            mae,
            mse: 0.0,
            rmse: 0.0,
            r2: 0.0,
            mape: 0.0,
            direction_accuracy: 0.0,
        }
    }

    #[test]
    fn inverse_mae_weights() {
        let selected = names(&["a", "b"]);
        let performance = BTreeMap::from([
            ("a".to_string(), perf(10.0)),
            ("b".to_string(), perf(20.0)),
        ]);
        let w = compute_weights(
            EnsembleMethod::WeightedAverage,
            &selected,
            &BTreeMap::new(),
            &[],
            &performance,
        );
        assert_abs_diff_eq!(w["a"], 2.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(w["b"], 1.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn perfect_model_dominates_weighted_average() {
        let selected = names(&["exact", "rough"]);
        let performance = BTreeMap::from([
            ("exact".to_string(), perf(0.0)),
            ("rough".to_string(), perf(4.0)),
        ]);
        let w = compute_weights(
            EnsembleMethod::WeightedAverage,
            &selected,
            &BTreeMap::new(),
            &[],
            &performance,
        );
        assert!(w["exact"] > 0.999_999);
        assert_abs_diff_eq!(w.values().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn voting_ties_go_to_first_name() {
        let selected = names(&["a", "b"]);
        let predictions = BTreeMap::from([
            ("a".to_string(), vec![1.0, 5.0, 3.0, 0.0]),
            ("b".to_string(), vec![1.0, 4.0, 2.0, 0.0]),
        ]);
        let truth = [1.0, 4.0, 2.0, 0.0];
        let w = compute_weights(
            EnsembleMethod::Voting,
            &selected,
            &predictions,
            &truth,
            &BTreeMap::new(),
        );
        // a wins steps 0 and 3 on ties, b wins 1 and 2
        assert_abs_diff_eq!(w["a"], 0.5);
        assert_abs_diff_eq!(w["b"], 0.5);
    }

    #[test]
    fn blend_is_weighted_sum() {
        let weights = BTreeMap::from([("a".to_string(), 0.25), ("b".to_string(), 0.75)]);
        let predictions = BTreeMap::from([
            ("a".to_string(), vec![4.0, 8.0]),
            ("b".to_string(), vec![8.0, 0.0]),
            ("ignored".to_string(), vec![100.0, 100.0]),
        ]);
        assert_eq!(blend(&weights, &predictions, 2), vec![7.0, 2.0]);
    }
}
