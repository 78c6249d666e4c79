//! Screen-space geometry primitives
//!
//! Points and segments here are in the caller's projected unit space
//! (typically pixels). Nothing in this module knows about latitude or
//! longitude.

use serde::{Deserialize, Serialize};

/// Projected point in screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Perpendicular distance to the infinite line through `line_start` and `line_end`.
    ///
    /// Falls back to point distance only when the two line points coincide
    /// exactly, so very short chords in small units are still lines.
    pub fn perpendicular_distance(&self, line_start: &Point2D, line_end: &Point2D) -> f64 {
        let dx = line_end.x - line_start.x;
        let dy = line_end.y - line_start.y;

        let line_length = dx.hypot(dy);

        if line_length == 0.0 {
            return self.distance_to(line_start);
        }

        let numerator = ((self.x - line_start.x) * dy - (self.y - line_start.y) * dx).abs();
        numerator / line_length
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Line segment emitted between two consecutive projected points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2D,
    pub end: Point2D,
}

impl Segment {
    pub const fn new(start: Point2D, end: Point2D) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// One connected polyline
pub type Chain = Vec<Point2D>;

/// Total length of a polyline
pub fn path_length(points: &[Point2D]) -> f64 {
    points.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}
