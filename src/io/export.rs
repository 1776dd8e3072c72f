//! CSV export for grid-scan results and blended forecasts.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::bidding::OptimizationResult;
use crate::error::Result;

/// Column header for per-price search results.
const GRID_HEADER: &str = "price,power,objective,converged,iterations,status";

/// Column header for blended forecasts.
const BLEND_HEADER: &str = "step,blended";

/// Exports per-price search results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per grid price, in the
/// order given. Produces deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Search results, typically `BidOptimization::results`
/// * `path` - Output file path
///
/// # Errors
///
/// Returns [`BidError::Io`](crate::error::BidError::Io) or
/// [`BidError::Csv`](crate::error::BidError::Csv) if file creation or
/// writing fails.
pub fn export_grid_csv(results: &[OptimizationResult], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_grid_csv(results, io::BufWriter::new(file))
}

/// Writes per-price search results as CSV to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_grid_csv(results: &[OptimizationResult], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(GRID_HEADER.split(','))?;

    for r in results {
        wtr.write_record(&[
            format!("{:.2}", r.day_ahead_price),
            format!("{:.4}", r.power),
            format!("{:.4}", r.objective),
            r.converged.to_string(),
            r.iterations.to_string(),
            r.status.as_str().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a blended forecast to a CSV file at the given path.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_blend_csv(blended: &[f64], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_blend_csv(blended, io::BufWriter::new(file))
}

/// Writes a blended forecast as `step,blended` rows to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_blend_csv(blended: &[f64], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(BLEND_HEADER.split(','))?;
    for (step, value) in blended.iter().enumerate() {
        wtr.write_record(&[step.to_string(), format!("{value:.4}")])?;
    }
    wtr.flush()?;
    Ok(())
}
