//! Forecast error metrics computed against a validation ground truth.

use std::fmt;

use serde::Serialize;

use crate::error::{BidError, Result};

/// Floor on the denominator of percentage errors.
pub const MAPE_EPSILON: f64 = 1e-8;

/// Accuracy of one model's predictions over the validation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPerformance {
    /// Mean absolute error.
    pub mae: f64,
    /// Mean squared error.
    pub mse: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Coefficient of determination.
    pub r2: f64,
    /// Mean absolute percentage error, as a fraction.
    pub mape: f64,
    /// Fraction of steps whose predicted direction matches the actual one.
    pub direction_accuracy: f64,
}

impl ModelPerformance {
    /// Scores `predicted` against `truth`.
    ///
    /// R² is 1 when the truth is constant and matched exactly, 0 when the
    /// truth is constant and missed. Direction accuracy is 0 for series of
    /// length 1.
    ///
    /// # Errors
    ///
    /// Returns [`BidError::InvalidInput`] if the series are empty or differ
    /// in length.
    pub fn evaluate(predicted: &[f64], truth: &[f64]) -> Result<Self> {
        if truth.is_empty() {
            return Err(BidError::invalid("validation truth must not be empty"));
        }
        if predicted.len() != truth.len() {
            return Err(BidError::invalid(format!(
                "prediction length {} does not match truth length {}",
                predicted.len(),
                truth.len()
            )));
        }

        let n = truth.len() as f64;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut pct_sum = 0.0;
        for (&p, &t) in predicted.iter().zip(truth) {
            let err = p - t;
            abs_sum += err.abs();
            sq_sum += err * err;
            pct_sum += err.abs() / t.abs().max(MAPE_EPSILON);
        }

        let mean_truth = truth.iter().sum::<f64>() / n;
        let ss_tot: f64 = truth.iter().map(|t| (t - mean_truth).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - sq_sum / ss_tot
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };

        let mse = sq_sum / n;
        Ok(Self {
            mae: abs_sum / n,
            mse,
            rmse: mse.sqrt(),
            r2,
            mape: pct_sum / n,
            direction_accuracy: direction_accuracy(predicted, truth),
        })
    }
}

impl fmt::Display for ModelPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE={:.3} RMSE={:.3} R2={:.3} MAPE={:.2}% dir={:.1}%",
            self.mae,
            self.rmse,
            self.r2,
            self.mape * 100.0,
            self.direction_accuracy * 100.0
        )
    }
}

/// Share of consecutive steps where the predicted and actual deltas share a
/// sign (zero deltas have sign 0 and only match each other).
fn direction_accuracy(predicted: &[f64], truth: &[f64]) -> f64 {
    if truth.len() <= 1 {
        return 0.0;
    }
    let hits = predicted
        .windows(2)
        .zip(truth.windows(2))
        .filter(|(p, t)| sign(p[1] - p[0]) == sign(t[1] - t[0]))
        .count();
    hits as f64 / (truth.len() - 1) as f64
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn perfect_prediction() {
        let truth = [1.0, 3.0, 2.0, 5.0];
        let m = ModelPerformance::evaluate(&truth, &truth).unwrap();
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.mape, 0.0);
        assert_eq!(m.direction_accuracy, 1.0);
    }

    #[test]
    fn known_errors() {
        // errors: [1, -1, 2, -2]
        let truth = [10.0, 10.0, 10.0, 10.0];
        let predicted = [11.0, 9.0, 12.0, 8.0];
        let m = ModelPerformance::evaluate(&predicted, &truth).unwrap();
        assert_abs_diff_eq!(m.mae, 1.5);
        assert_abs_diff_eq!(m.mse, 2.5);
        assert_abs_diff_eq!(m.rmse, 2.5_f64.sqrt());
        assert_abs_diff_eq!(m.mape, 0.15);
        // constant truth, imperfect prediction
        assert_eq!(m.r2, 0.0);
        // truth deltas are all 0, predicted never flat
        assert_eq!(m.direction_accuracy, 0.0);
    }

    #[test]
    fn r2_against_mean() {
        let truth = [1.0, 2.0, 3.0];
        let predicted = [2.0, 2.0, 2.0];
        let m = ModelPerformance::evaluate(&predicted, &truth).unwrap();
        assert_abs_diff_eq!(m.r2, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn direction_accuracy_counts_sign_matches() {
        let truth = [1.0, 2.0, 1.0, 1.0, 3.0];
        // deltas truth: +, -, 0, +   predicted: +, +, 0, -
        let predicted = [0.0, 1.0, 2.0, 2.0, 1.0];
        let m = ModelPerformance::evaluate(&predicted, &truth).unwrap();
        assert_abs_diff_eq!(m.direction_accuracy, 0.5);
    }

    #[test]
    fn single_point_has_zero_direction_accuracy() {
        let m = ModelPerformance::evaluate(&[5.0], &[5.0]).unwrap();
        assert_eq!(m.direction_accuracy, 0.0);
    }

    #[test]
    fn zero_truth_uses_epsilon_denominator() {
        let m = ModelPerformance::evaluate(&[1e-8], &[0.0]).unwrap();
        assert_abs_diff_eq!(m.mape, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn mismatched_or_empty_series_are_rejected() {
        assert!(ModelPerformance::evaluate(&[1.0], &[1.0, 2.0]).is_err());
        assert!(ModelPerformance::evaluate(&[], &[]).is_err());
    }
}
