//! # fogtrail
//!
//! Trajectory processing core for an "explored area" map reveal. Turns a
//! live, noisy stream of location samples into clean polylines that a
//! rendering layer can draw.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fogtrail::{DeduplicationGate, LocationSample, GeoEvent, Point2D, TrajectoryRenderer};
//!
//! // One gate per tracking session
//! let gate = DeduplicationGate::new();
//!
//! let decision = gate.ingest(LocationSample::new(40.7128, -74.0060, 1_000))?;
//! assert!(decision.should_process);
//!
//! // The rendering layer supplies the projection
//! let project = |e: &GeoEvent| Point2D::new(e.longitude() * 1e5, -e.latitude() * 1e5);
//! let rendered = TrajectoryRenderer::new(1.0).render(&gate.buffered_events(), &project);
//! println!("{} chains", rendered.chains.len());
//! # Ok::<(), fogtrail::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`capture`]: geographic event types, the bounded [`EventWindow`] and
//!   the [`DeduplicationGate`] in front of it
//! - [`analysis`]: screen-space geometry, RDP simplification, chain
//!   stitching and the render pass
//! - [`time`]: epoch-millisecond clock
//! - [`app`]: CLI, configuration and sample replay
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Sample    │───▶│ Dedup Gate  │───▶│ EventWindow │
//! │   Source    │    │ (admission) │    │  (bounded)  │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!                                              │
//!                                              ▼
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Simplified  │◀───│    RDP      │◀───│   Chains    │◀── projection
//! │   Chains    │    │ Simplifier  │    │  (forward)  │    (caller)
//! └─────────────┘    └─────────────┘    └─────────────┘
//! ```

pub mod time;
pub mod capture;
pub mod analysis;
pub mod app;

// Re-export commonly used types
pub use capture::types::{Coordinate, GeoEvent, LocationSample};
pub use capture::event_window::EventWindow;
pub use capture::dedup_gate::{Decision, DecisionReason, DeduplicationGate, GateStats};
pub use analysis::geometry::{Chain, Point2D, Segment};
pub use analysis::rdp_simplification::{simplify, PathSimplifier};
pub use analysis::chain_builder::build_chains;
pub use analysis::trajectory::{Projection, TrajectoryRenderer};

/// Result type alias for fogtrail
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fogtrail
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Internal error during admission check: {0}")]
    TransientInternal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
