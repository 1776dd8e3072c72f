//! Day-ahead bid optimization: revenue model, neurodynamic search, and grid scan.

/// Revenue gradient and its corrective penalty terms.
pub mod gradient;
pub mod grid;
/// Expected revenue of a bid.
pub mod revenue;
pub mod search;
pub mod threshold;
pub mod types;

pub use gradient::{GradientPenalty, MarketHeuristics};
pub use grid::{BidOptimization, ConvergenceStats, GridScanner, optimize};
pub use revenue::revenue;
pub use search::{NeurodynamicSearch, PriceSeededRng, SearchState, SearchTrace};
pub use threshold::{ThresholdRegion, detect_threshold_regions};
pub use types::{
    CostParameters, MAX_GRID_POINTS, NeurodynamicParams, OptimizationResult, PriceRange,
    SearchStatus,
};
