//! Buffered Events to Renderable Chains
//!
//! Runs the render-side half of the pipeline: admitted events are sorted
//! chronologically, projected to screen space by a caller-supplied
//! [`Projection`], joined into segments between consecutive points,
//! stitched into chains and simplified.

use super::chain_builder::build_chains;
use super::geometry::{Chain, Point2D, Segment};
use super::rdp_simplification::{PathSimplifier, DEFAULT_TOLERANCE};
use crate::capture::types::GeoEvent;
use serde::{Deserialize, Serialize};

/// Geographic-to-screen projection owned by the rendering layer
pub trait Projection {
    fn project(&self, event: &GeoEvent) -> Point2D;
}

impl<F> Projection for F
where
    F: Fn(&GeoEvent) -> Point2D,
{
    fn project(&self, event: &GeoEvent) -> Point2D {
        self(event)
    }
}

/// Build segments between chronologically consecutive events.
///
/// `events` are sorted by timestamp first (stable). When `max_gap_ms` is
/// set, consecutive events further apart in time than that are not joined.
pub fn segments_from_events<P>(events: &[GeoEvent], projection: &P, max_gap_ms: Option<u64>) -> Vec<Segment>
where
    P: Projection + ?Sized,
{
    let mut ordered = events.to_vec();
    ordered.sort_by_key(|e| e.timestamp_ms());

    let projected: Vec<Point2D> = ordered.iter().map(|e| projection.project(e)).collect();

    ordered
        .windows(2)
        .zip(projected.windows(2))
        .filter(|(pair, _)| match max_gap_ms {
            Some(gap) => pair[0].elapsed_ms(&pair[1]) <= gap,
            None => true,
        })
        .map(|(_, pts)| Segment::new(pts[0], pts[1]))
        .collect()
}

/// Chains ready for the rendering layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTrajectory {
    /// Simplified chains in opening order
    pub chains: Vec<Chain>,
    /// Points across all chains before simplification
    pub original_point_count: usize,
    /// Points across all chains after simplification
    pub simplified_point_count: usize,
}

impl RenderedTrajectory {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Fraction of chain points removed by simplification
    pub fn compression_ratio(&self) -> f64 {
        if self.original_point_count == 0 {
            return 1.0;
        }
        1.0 - (self.simplified_point_count as f64 / self.original_point_count as f64)
    }
}

/// Events → segments → chains → simplified chains
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryRenderer {
    /// Simplification tolerance in projected units
    pub tolerance: f64,
    /// Maximum time gap bridged by a segment
    pub max_gap_ms: Option<u64>,
}

impl TrajectoryRenderer {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            max_gap_ms: None,
        }
    }

    pub fn with_max_gap(mut self, max_gap_ms: u64) -> Self {
        self.max_gap_ms = Some(max_gap_ms);
        self
    }

    /// Renderer built from the `[render]` config section
    pub fn from_config(config: &crate::app::config::RenderConfig) -> Self {
        Self {
            tolerance: config.simplify_tolerance_px,
            max_gap_ms: config.max_segment_gap_ms,
        }
    }

    /// Render buffered events through `projection`
    pub fn render<P>(&self, events: &[GeoEvent], projection: &P) -> RenderedTrajectory
    where
        P: Projection + ?Sized,
    {
        let segments = segments_from_events(events, projection, self.max_gap_ms);
        self.render_segments(&segments)
    }

    /// Stitch and simplify already-projected segments
    pub fn render_segments(&self, segments: &[Segment]) -> RenderedTrajectory {
        let raw_chains = build_chains(segments);
        let simplifier = PathSimplifier::with_tolerance(self.tolerance);

        let original_point_count = raw_chains.iter().map(Vec::len).sum();
        let chains = simplifier.simplify_all(&raw_chains);
        let simplified_point_count = chains.iter().map(Vec::len).sum();

        RenderedTrajectory {
            chains,
            original_point_count,
            simplified_point_count,
        }
    }
}

impl Default for TrajectoryRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}
