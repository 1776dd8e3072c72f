//! Model selection policies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EnsembleConfig;
use super::metrics::ModelPerformance;

/// How candidate models are filtered before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    /// Every candidate that is not excluded.
    #[default]
    All,
    /// Candidates within the configured MAE/RMSE ceilings and R² floor.
    Threshold,
    /// The `top_k` candidates with the lowest MAE.
    TopK,
}

impl SelectionMethod {
    /// Name as written in TOML and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMethod::All => "all",
            SelectionMethod::Threshold => "threshold",
            SelectionMethod::TopK => "top_k",
        }
    }
}

/// Outcome of applying a selection policy.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selection {
    /// Chosen model names, in name order.
    pub models: Vec<String>,
    /// Whether the policy fell short of `min_models` and the MAE fallback was used.
    pub fell_back: bool,
}

/// Applies `config.selection` to the scored models.
///
/// Excluded models are never selected, including by the fallback. When the
/// policy keeps fewer than `min_models` (at least one), the lowest-MAE
/// candidates are taken instead.
pub(crate) fn select(
    performance: &BTreeMap<String, ModelPerformance>,
    config: &EnsembleConfig,
) -> Selection {
    let candidates: Vec<(&String, &ModelPerformance)> = performance
        .iter()
        .filter(|(name, _)| !config.exclude_models.contains(*name))
        .collect();

    let mut chosen: Vec<&String> = match config.selection {
        SelectionMethod::All => candidates.iter().map(|(name, _)| *name).collect(),
        SelectionMethod::Threshold => candidates
            .iter()
            .filter(|(_, perf)| within_thresholds(perf, config))
            .map(|(name, _)| *name)
            .collect(),
        SelectionMethod::TopK => lowest_mae(&candidates, config.top_k),
    };

    let floor = config.min_models.max(1);
    let fell_back = chosen.len() < floor;
    if fell_back {
        chosen = lowest_mae(&candidates, floor);
    }

    chosen.sort();
    Selection {
        models: chosen.into_iter().cloned().collect(),
        fell_back,
    }
}

fn within_thresholds(perf: &ModelPerformance, config: &EnsembleConfig) -> bool {
    config.max_mae.is_none_or(|max| perf.mae <= max)
        && config.max_rmse.is_none_or(|max| perf.rmse <= max)
        && config.min_r2.is_none_or(|min| perf.r2 >= min)
}

/// The `k` candidates with the smallest MAE; equal MAEs keep name order.
fn lowest_mae<'a>(candidates: &[(&'a String, &ModelPerformance)], k: usize) -> Vec<&'a String> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|a, b| a.1.mae.total_cmp(&b.1.mae));
    ranked.into_iter().take(k).map(|(name, _)| name).collect()
}
