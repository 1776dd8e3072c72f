//! Day-ahead bidding optimizer with forecast ensembling.

#[cfg(feature = "api")]
pub mod api;
/// Revenue model, neurodynamic search, grid scan, and threshold detection.
pub mod bidding;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod forecast;
pub mod io;

pub use error::{BidError, Result};
