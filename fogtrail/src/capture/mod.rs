//! Location capture module
//!
//! Turns raw location samples into admitted [`GeoEvent`]s. The
//! [`DeduplicationGate`] is the entry point; it owns a bounded
//! [`EventWindow`] that rejects samples repeating recent nearby positions.

pub mod types;
pub mod event_window;
pub mod dedup_gate;

pub use types::{Coordinate, GeoEvent, LocationSample};
pub use event_window::{Admission, EventWindow, ProximityMatch};
pub use dedup_gate::{Decision, DecisionReason, DeduplicationGate, GateStats, IngestCounters};
