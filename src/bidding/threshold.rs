//! Detection of price intervals where the optimal power bid jumps.

use serde::Serialize;

/// Power change between adjacent grid prices that marks a transition.
pub const JUMP_THRESHOLD: f64 = 5.0;

/// Grid indices on each side of a jump included in its window.
const WINDOW_RADIUS: usize = 2;

/// A price interval where the revenue-maximizing policy changes regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdRegion {
    /// Lowest price of the merged window.
    pub start: f64,
    /// Highest price of the merged window.
    pub end: f64,
    /// Grid price whose neighbourhood first triggered the region.
    pub center: f64,
}

/// Finds threshold regions in a price→power curve.
///
/// `curve` must be sorted by price. Each interior point whose power differs
/// from either neighbour by more than [`JUMP_THRESHOLD`] marks the window
/// `[price[i-2], price[i+2]]` (clamped to the curve); overlapping windows
/// are merged. The output is diagnostic and never fed back to the optimizer.
pub fn detect_threshold_regions(curve: &[(f64, f64)]) -> Vec<ThresholdRegion> {
    if curve.len() < 3 {
        return Vec::new();
    }
    let last = curve.len() - 1;

    let mut windows = Vec::new();
    for i in 1..last {
        let (price, power) = curve[i];
        let before = (power - curve[i - 1].1).abs();
        let after = (curve[i + 1].1 - power).abs();
        if before > JUMP_THRESHOLD || after > JUMP_THRESHOLD {
            windows.push(ThresholdRegion {
                start: curve[i.saturating_sub(WINDOW_RADIUS)].0,
                end: curve[(i + WINDOW_RADIUS).min(last)].0,
                center: price,
            });
        }
    }

    merge_overlapping(windows)
}

/// Interval union over windows already ordered by start price.
fn merge_overlapping(windows: Vec<ThresholdRegion>) -> Vec<ThresholdRegion> {
    let mut merged: Vec<ThresholdRegion> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(open) if window.start <= open.end => {
                open.end = open.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(powers: &[f64]) -> Vec<(f64, f64)> {
        powers
            .iter()
            .enumerate()
            .map(|(i, &p)| (350.0 + 2.0 * i as f64, p))
            .collect()
    }

    #[test]
    fn smooth_monotone_curve_has_no_regions() {
        let powers: Vec<f64> = (0..76).map(|i| 20.0 + i as f64).collect();
        assert!(detect_threshold_regions(&curve(&powers)).is_empty());
    }

    #[test]
    fn single_jump_yields_one_merged_region() {
        let mut powers = vec![10.0; 10];
        powers[5..].fill(60.0);
        let regions = detect_threshold_regions(&curve(&powers));
        // indices 4 and 5 both flag; windows [2,6] and [3,7] merge
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start, 354.0);
        assert_eq!(regions[0].end, 364.0);
        assert_eq!(regions[0].center, 358.0);
    }

    #[test]
    fn distant_jumps_stay_separate() {
        let mut powers = vec![10.0; 30];
        powers[5..].fill(60.0);
        powers[20..].fill(90.0);
        let regions = detect_threshold_regions(&curve(&powers));
        assert_eq!(regions.len(), 2);
        assert!(regions[0].end < regions[1].start);
    }

    #[test]
    fn windows_are_clamped_to_curve_bounds() {
        let powers = vec![0.0, 50.0, 50.0];
        let regions = detect_threshold_regions(&curve(&powers));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start, 350.0);
        assert_eq!(regions[0].end, 354.0);
    }

    #[test]
    fn jump_of_exactly_threshold_is_ignored() {
        let powers = vec![10.0, 15.0, 20.0, 25.0];
        assert!(detect_threshold_regions(&curve(&powers)).is_empty());
    }

    #[test]
    fn short_curves_have_no_interior() {
        assert!(detect_threshold_regions(&curve(&[0.0, 100.0])).is_empty());
        assert!(detect_threshold_regions(&[]).is_empty());
    }
}
