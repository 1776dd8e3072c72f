//! CSV import for price forecasts and raw model predictions.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{BidError, Result};
use crate::forecast::{ForecastPoint, ForecastSet};

/// Name of the ground-truth column in a model-predictions file.
pub const TRUTH_COLUMN: &str = "truth";

/// Validation truth and raw per-model predictions read from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPredictions {
    pub truth: Vec<f64>,
    /// Model name (column header) → predicted series.
    pub predictions: BTreeMap<String, Vec<f64>>,
}

/// Loads a forecast set from a CSV file.
///
/// # Errors
///
/// See [`read_forecast_csv`].
pub fn load_forecast_csv(path: &Path) -> Result<ForecastSet> {
    read_forecast_csv(io::BufReader::new(File::open(path)?))
}

/// Reads `timestamp,predicted_price[,confidence_upper,confidence_lower]` rows.
///
/// Timestamps are RFC 3339. The confidence columns may be absent or empty.
///
/// # Errors
///
/// Returns [`BidError::Csv`] for malformed rows and
/// [`BidError::InvalidInput`] if the file has no rows or a non-finite price.
pub fn read_forecast_csv(reader: impl Read) -> Result<ForecastSet> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let points = rdr
        .deserialize::<ForecastPoint>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    ForecastSet::new(points)
}

/// Loads model predictions from a CSV file.
///
/// # Errors
///
/// See [`read_model_predictions_csv`].
pub fn load_model_predictions_csv(path: &Path) -> Result<ModelPredictions> {
    read_model_predictions_csv(io::BufReader::new(File::open(path)?))
}

/// Reads a wide table with a `truth` column and one column per model.
///
/// # Errors
///
/// Returns [`BidError::InvalidInput`] if the `truth` column or every model
/// column is missing, a header repeats, or a cell is not a number.
pub fn read_model_predictions_csv(reader: impl Read) -> Result<ModelPredictions> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let truth_idx = headers
        .iter()
        .position(|h| h == TRUTH_COLUMN)
        .ok_or_else(|| BidError::invalid(format!("missing \"{TRUTH_COLUMN}\" column")))?;

    let mut seen = BTreeSet::new();
    if let Some(name) = headers.iter().find(|name| !seen.insert(*name)) {
        return Err(BidError::invalid(format!("duplicate column \"{name}\"")));
    }
    let mut predictions: BTreeMap<String, Vec<f64>> = headers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != truth_idx)
        .map(|(_, name)| (name.to_string(), Vec::new()))
        .collect();
    if predictions.is_empty() {
        return Err(BidError::invalid("no model columns besides truth"));
    }

    let mut truth = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        for (i, cell) in record.iter().enumerate() {
            let value: f64 = cell.parse().map_err(|_| {
                BidError::invalid(format!(
                    "row {}: column \"{}\" is not a number: \"{cell}\"",
                    row + 1,
                    &headers[i]
                ))
            })?;
            if i == truth_idx {
                truth.push(value);
            } else if let Some(series) = predictions.get_mut(&headers[i]) {
                series.push(value);
            }
        }
    }

    Ok(ModelPredictions { truth, predictions })
}
