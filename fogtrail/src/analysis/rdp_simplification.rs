//! Ramer-Douglas-Peucker Polyline Simplification
//!
//! Reduces the point count of a projected trajectory chain while keeping
//! its shape within a tolerance. The tolerance is in the same units as the
//! input points, typically screen pixels.
//!
//! Guarantees:
//! - first and last input points are always kept
//! - output is never longer than the input
//! - every dropped point lies within `tolerance` of the chord that replaced it

use super::geometry::Point2D;

/// Default tolerance for trajectory simplification (pixels)
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Simplify `points` with the given tolerance.
///
/// Inputs of two points or fewer are returned unchanged. Negative or NaN
/// tolerances behave like zero.
pub fn simplify(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    PathSimplifier::with_tolerance(tolerance).simplify(points)
}

/// RDP polyline simplifier
#[derive(Debug, Clone, Copy)]
pub struct PathSimplifier {
    /// Maximum allowed deviation
    pub tolerance: f64,
}

impl PathSimplifier {
    /// Create a simplifier with the default tolerance
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Create a simplifier with a custom tolerance.
    ///
    /// Negative and NaN values are raised to zero.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    /// Simplify a polyline
    pub fn simplify(&self, points: &[Point2D]) -> Vec<Point2D> {
        if points.len() <= 2 {
            return points.to_vec();
        }

        let last = points.len() - 1;
        let mut keep = vec![false; points.len()];
        keep[0] = true;
        keep[last] = true;

        // Work stack of (first, last) index ranges still to examine
        let mut ranges = vec![(0usize, last)];
        while let Some((start, end)) = ranges.pop() {
            if end - start < 2 {
                continue;
            }

            let (max_dist, max_index) = Self::find_max_distance(&points[start..=end]);
            if max_dist > self.tolerance {
                let split = start + max_index;
                keep[split] = true;
                ranges.push((split, end));
                ranges.push((start, split));
            }
        }

        points
            .iter()
            .zip(keep)
            .filter_map(|(p, kept)| kept.then_some(*p))
            .collect()
    }

    /// Simplify each chain independently
    pub fn simplify_all(&self, chains: &[Vec<Point2D>]) -> Vec<Vec<Point2D>> {
        chains.iter().map(|chain| self.simplify(chain)).collect()
    }

    /// Point with maximum perpendicular distance from the first-last chord.
    ///
    /// Returns `(distance, index)` relative to `points`; ties keep the
    /// earliest index. Expects at least three points.
    fn find_max_distance(points: &[Point2D]) -> (f64, usize) {
        let (start, end) = match (points.first(), points.last()) {
            (Some(s), Some(e)) => (s, e),
            _ => return (0.0, 0),
        };

        let mut max_dist = 0.0;
        let mut max_index = 0;

        for (i, point) in points.iter().enumerate().skip(1).take(points.len().saturating_sub(2)) {
            let dist = point.perpendicular_distance(start, end);
            if dist > max_dist {
                max_dist = dist;
                max_index = i;
            }
        }

        (max_dist, max_index)
    }

    /// Fraction of points removed (0 = none, 1 = all)
    pub fn compression_ratio(&self, original: &[Point2D], simplified: &[Point2D]) -> f64 {
        if original.is_empty() {
            return 1.0;
        }
        1.0 - (simplified.len() as f64 / original.len() as f64)
    }
}

impl Default for PathSimplifier {
    fn default() -> Self {
        Self::new()
    }
}
