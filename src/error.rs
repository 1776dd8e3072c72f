//! Error type shared by the bidding optimizer and the forecast ensembler.

use thiserror::Error;

/// Failures surfaced by the optimization and ensembling entry points.
///
/// Numerical trouble inside a single search (a non-finite gradient or
/// objective) is not an error: the search stops with
/// [`SearchStatus::Diverged`](crate::bidding::SearchStatus::Diverged) and
/// reports its best-found point.
#[derive(Debug, Error)]
pub enum BidError {
    /// Inputs that would make the computation meaningless (empty forecast
    /// set, mismatched sequence lengths, non-positive costs, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No grid price produced a converged search.
    #[error("no grid point converged ({total_points} evaluated)")]
    NoConvergence {
        /// Number of grid prices that were searched.
        total_points: usize,
    },

    /// The caller-supplied deadline expired before the grid was scanned.
    #[error("deadline exceeded after {evaluated} of {total} grid points")]
    DeadlineExceeded {
        /// Grid points searched before the deadline.
        evaluated: usize,
        /// Grid size.
        total: usize,
    },

    /// CSV encode/decode failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BidError>;

impl BidError {
    /// Shorthand for [`BidError::InvalidInput`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
