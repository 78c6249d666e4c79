//! Trajectory analysis
//!
//! Turns projected point streams into clean, renderable polylines:
//! - Screen-space geometry primitives
//! - Ramer-Douglas-Peucker polyline simplification
//! - Forward-only chain stitching of emitted segments
//! - The events → chains render pass tying them together

pub mod geometry;
pub mod rdp_simplification;
pub mod chain_builder;
pub mod trajectory;

pub use geometry::{Chain, Point2D, Segment};
pub use rdp_simplification::{simplify, PathSimplifier};
pub use chain_builder::{build_chains, ChainBuilder};
pub use trajectory::{Projection, RenderedTrajectory, TrajectoryRenderer};
