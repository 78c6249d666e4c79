//! Deduplication Gate
//!
//! Stateful front door of the ingestion pipeline. The gate owns the
//! session's [`EventWindow`] behind a single mutex and turns each incoming
//! sample into a [`Decision`].
//!
//! Error policy:
//! - Out-of-range coordinates are rejected with `Error::InvalidCoordinate`.
//! - Any failure while evaluating admission (an error or a panic) fails
//!   open: the host is told to keep processing the sample, but the sample
//!   is not recorded in the window.

use super::event_window::{Admission, EventWindow, ProximityMatch};
use super::types::{haversine_distance_m, Coordinate, GeoEvent, LocationSample};
use crate::time::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Opt-in process-wide gate, created on first use
static SHARED_GATE: OnceLock<DeduplicationGate> = OnceLock::new();

/// Why a sample was or was not admitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Stored in the window
    Admitted,
    /// A buffered event is within the dedup radius and time window
    RejectedProximity { distance_m: f64, elapsed_ms: u64 },
    /// Admission could not be evaluated; processing continues unrecorded
    ErrorFallback { cause: String },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Admitted => write!(f, "admitted as new location"),
            DecisionReason::RejectedProximity {
                distance_m,
                elapsed_ms,
            } => write!(
                f,
                "duplicate: {:.1} m from a point buffered {:.1} s apart",
                distance_m,
                *elapsed_ms as f64 / 1000.0
            ),
            DecisionReason::ErrorFallback { cause } => {
                write!(f, "admission check failed, processing anyway: {}", cause)
            }
        }
    }
}

/// Result of ingesting one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the host should treat the sample as new information
    pub should_process: bool,
    /// Whether the sample was stored in the window
    pub was_added: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn admitted() -> Self {
        Self {
            should_process: true,
            was_added: true,
            reason: DecisionReason::Admitted,
        }
    }

    pub fn rejected(conflict: &ProximityMatch) -> Self {
        Self {
            should_process: false,
            was_added: false,
            reason: DecisionReason::RejectedProximity {
                distance_m: conflict.distance_m,
                elapsed_ms: conflict.elapsed_ms,
            },
        }
    }

    pub fn error_fallback(cause: impl Into<String>) -> Self {
        Self {
            should_process: true,
            was_added: false,
            reason: DecisionReason::ErrorFallback {
                cause: cause.into(),
            },
        }
    }
}

/// Snapshot of the window contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub total_events_in_queue: usize,
    pub latest_event: Option<GeoEvent>,
    /// `latest - first` by insertion order, 0 with fewer than two events
    pub queue_time_span_ms: i64,
}

impl GateStats {
    pub fn latest_timestamp_ms(&self) -> Option<i64> {
        self.latest_event.map(|e| e.timestamp_ms())
    }
}

/// Lifetime ingestion counters
#[derive(Debug, Default)]
pub struct IngestCounters {
    /// Samples stored in the window
    pub admitted: AtomicU64,
    /// Samples rejected as duplicates
    pub rejected: AtomicU64,
    /// Samples passed through after an internal failure
    pub fallbacks: AtomicU64,
    /// Samples refused for out-of-range coordinates
    pub invalid: AtomicU64,
}

impl IngestCounters {
    /// Total samples seen, including invalid ones
    pub fn total(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
            + self.rejected.load(Ordering::Relaxed)
            + self.fallbacks.load(Ordering::Relaxed)
            + self.invalid.load(Ordering::Relaxed)
    }
}

/// Stateful deduplication façade over one [`EventWindow`].
///
/// All mutation happens under one mutex, so a gate can be shared across
/// threads by reference or `Arc`.
pub struct DeduplicationGate {
    window: Mutex<EventWindow>,
    clock: Arc<dyn Clock>,
    counters: Arc<IngestCounters>,
    session_id: Uuid,
}

impl DeduplicationGate {
    /// Gate with a default window (1000 events, 10 m, 30 s)
    pub fn new() -> Self {
        Self::with_window(EventWindow::default())
    }

    /// Gate over a caller-configured window
    pub fn with_window(window: EventWindow) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    /// Gate with an explicit clock for stamping unstamped samples
    pub fn with_clock(window: EventWindow, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Mutex::new(window),
            clock,
            counters: Arc::new(IngestCounters::default()),
            session_id: Uuid::new_v4(),
        }
    }

    /// Gate built from the `[window]` config section
    pub fn from_config(config: &crate::app::config::WindowConfig) -> Self {
        Self::with_window(EventWindow::with_params(
            config.max_size,
            config.dedup_radius_m,
            config.dedup_time_window_ms,
        ))
    }

    /// The opt-in process-wide gate with default settings.
    ///
    /// Prefer an explicitly owned gate per tracking session.
    pub fn shared() -> &'static DeduplicationGate {
        SHARED_GATE.get_or_init(DeduplicationGate::new)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn counters(&self) -> Arc<IngestCounters> {
        Arc::clone(&self.counters)
    }

    /// Decide whether a sample is new information and record it if so
    pub fn ingest(&self, sample: LocationSample) -> crate::Result<Decision> {
        if let Err(e) = sample.validate() {
            self.counters.invalid.fetch_add(1, Ordering::Relaxed);
            debug!(session = %self.session_id, "Refusing sample: {}", e);
            return Err(e);
        }

        let timestamp_ms = sample
            .timestamp_ms
            .unwrap_or_else(|| self.clock.now_millis());
        let event = GeoEvent::new(sample.latitude, sample.longitude, timestamp_ms);

        // try_append scans before it stores, so a fault leaves the window untouched
        let evaluated = {
            let mut window = self.window.lock();
            panic::catch_unwind(AssertUnwindSafe(|| window.try_append(event)))
        };

        let decision = match evaluated {
            Ok(Ok(admission)) => {
                let counter = if admission.is_admitted() {
                    &self.counters.admitted
                } else {
                    &self.counters.rejected
                };
                counter.fetch_add(1, Ordering::Relaxed);
                Decision::from(&admission)
            }
            Ok(Err(e)) => self.fail_open(e.to_string()),
            Err(payload) => self.fail_open(panic_message(payload.as_ref())),
        };

        if matches!(decision.reason, DecisionReason::ErrorFallback { .. }) {
            warn!(session = %self.session_id, lat = event.latitude(), lon = event.longitude(), "{}", decision.reason);
        } else {
            debug!(session = %self.session_id, ts = timestamp_ms, "{}", decision.reason);
        }

        Ok(decision)
    }

    /// Ingest a plain coordinate stamped with the gate's clock
    pub fn ingest_coordinate(&self, coordinate: Coordinate) -> crate::Result<Decision> {
        self.ingest(LocationSample::unstamped(
            coordinate.latitude,
            coordinate.longitude,
        ))
    }

    fn fail_open(&self, cause: String) -> Decision {
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        Decision::error_fallback(cause)
    }

    /// Haversine range check between two coordinates, independent of the window
    pub fn is_within_range(a: &Coordinate, b: &Coordinate, meters: f64) -> bool {
        haversine_distance_m(a.latitude, a.longitude, b.latitude, b.longitude) <= meters
    }

    pub fn stats(&self) -> GateStats {
        let window = self.window.lock();
        let latest = window.latest().copied();
        let queue_time_span_ms = match (window.first(), latest) {
            (Some(first), Some(latest)) if window.len() >= 2 => {
                latest.timestamp_ms().saturating_sub(first.timestamp_ms())
            }
            _ => 0,
        };

        GateStats {
            total_events_in_queue: window.len(),
            latest_event: latest,
            queue_time_span_ms,
        }
    }

    /// Snapshot of the currently admitted events in insertion order
    pub fn buffered_events(&self) -> Vec<GeoEvent> {
        self.window.lock().to_vec()
    }

    /// Snapshot of the admitted events sorted by timestamp
    pub fn chronological_events(&self) -> Vec<GeoEvent> {
        self.window.lock().chronological()
    }

    /// Clear the window between tracking sessions
    pub fn reset(&self) {
        self.window.lock().clear();
        debug!(session = %self.session_id, "Event window cleared");
    }

    /// Run a read-only closure against the window under the lock
    pub fn with_window_snapshot<R>(&self, f: impl FnOnce(&EventWindow) -> R) -> R {
        f(&self.window.lock())
    }
}

impl Default for DeduplicationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeduplicationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeduplicationGate")
            .field("session_id", &self.session_id)
            .field("window", &*self.window.lock())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during admission check".to_string()
    }
}

impl From<&Admission> for Decision {
    fn from(admission: &Admission) -> Self {
        match admission {
            Admission::Admitted => Decision::admitted(),
            Admission::Rejected(conflict) => Decision::rejected(conflict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::clock::ManualClock;

    fn sample(lat: f64, lon: f64, ts: i64) -> LocationSample {
        LocationSample::new(lat, lon, ts)
    }

    #[test]
    fn test_first_sample_admitted() {
        let gate = DeduplicationGate::new();
        let decision = gate.ingest(sample(40.7128, -74.0060, 1_000)).unwrap();
        assert_eq!(decision, Decision::admitted());
        assert_eq!(gate.buffered_events().len(), 1);
    }

    #[test]
    fn test_rejection_carries_diagnostics() {
        let gate = DeduplicationGate::new();
        gate.ingest(sample(40.7128, -74.0060, 1_000)).unwrap();
        let decision = gate.ingest(sample(40.71285, -74.00605, 15_000)).unwrap();

        assert!(!decision.should_process);
        assert!(!decision.was_added);
        match decision.reason {
            DecisionReason::RejectedProximity {
                distance_m,
                elapsed_ms,
            } => {
                assert!(distance_m < 10.0);
                assert_eq!(elapsed_ms, 14_000);
            }
            other => panic!("Expected proximity rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_coordinate_is_error_and_not_recorded() {
        let gate = DeduplicationGate::new();
        let result = gate.ingest(sample(91.0, 0.0, 0));
        assert!(matches!(
            result,
            Err(crate::Error::InvalidCoordinate { latitude, .. }) if latitude == 91.0
        ));
        assert!(gate.ingest(sample(0.0, 181.0, 0)).is_err());
        assert!(gate.buffered_events().is_empty());
        assert_eq!(gate.counters().invalid.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_fail_open_on_corrupt_window() {
        let window = EventWindow::from_events([GeoEvent::new(f64::NAN, 0.0, 0)], None, None, None);
        assert_eq!(window.len(), 1);
        let gate = DeduplicationGate::with_window(window);

        let decision = gate.ingest(sample(1.0, 1.0, 1_000)).unwrap();
        assert!(decision.should_process);
        assert!(!decision.was_added);
        assert!(matches!(decision.reason, DecisionReason::ErrorFallback { .. }));
        // Not recorded
        assert_eq!(gate.buffered_events().len(), 1);
        assert_eq!(gate.counters().fallbacks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_fail_open_on_panicking_check() {
        let gate = DeduplicationGate::new();
        gate.ingest(sample(1.0, 1.0, 0)).unwrap();
        gate.window.lock().panic_on_check = true;

        let decision = gate.ingest(sample(2.0, 2.0, 1_000)).unwrap();
        assert!(decision.should_process);
        assert!(!decision.was_added);
        match &decision.reason {
            DecisionReason::ErrorFallback { cause } => {
                assert_eq!(cause, "conflict scan failed on purpose")
            }
            other => panic!("Expected error fallback, got {:?}", other),
        }
        assert_eq!(gate.buffered_events(), vec![GeoEvent::new(1.0, 1.0, 0)]);
        assert_eq!(gate.counters().fallbacks.load(Ordering::Relaxed), 1);

        // The lock is released and the gate keeps working once the fault clears
        gate.window.lock().panic_on_check = false;
        assert!(gate.ingest(sample(2.0, 2.0, 2_000)).unwrap().was_added);
        assert!(!gate.ingest(sample(2.0, 2.0, 3_000)).unwrap().was_added);
        assert_eq!(gate.buffered_events().len(), 2);
    }

    #[test]
    fn test_panic_message_payloads() {
        let literal = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "static message");

        let formatted = panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "code 7");

        let opaque = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(opaque.as_ref()), "panic during admission check");
    }

    #[test]
    fn test_unstamped_sample_uses_gate_clock() {
        let clock = Arc::new(ManualClock::new(50_000));
        let gate = DeduplicationGate::with_clock(EventWindow::default(), clock.clone());

        gate.ingest(LocationSample::unstamped(10.0, 10.0)).unwrap();
        assert_eq!(gate.stats().latest_timestamp_ms(), Some(50_000));

        clock.advance(10_000);
        let decision = gate.ingest_coordinate(Coordinate::new(10.0, 10.0)).unwrap();
        assert!(!decision.was_added);

        clock.advance(25_000);
        let decision = gate.ingest_coordinate(Coordinate::new(10.0, 10.0)).unwrap();
        assert!(decision.was_added);
    }

    #[test]
    fn test_stats_empty_and_single() {
        let gate = DeduplicationGate::new();
        let stats = gate.stats();
        assert_eq!(stats.total_events_in_queue, 0);
        assert!(stats.latest_event.is_none());
        assert_eq!(stats.queue_time_span_ms, 0);

        gate.ingest(sample(1.0, 1.0, 5_000)).unwrap();
        let stats = gate.stats();
        assert_eq!(stats.total_events_in_queue, 1);
        assert_eq!(stats.latest_timestamp_ms(), Some(5_000));
        assert_eq!(stats.queue_time_span_ms, 0);
    }

    #[test]
    fn test_stats_span_uses_insertion_order() {
        let gate = DeduplicationGate::new();
        gate.ingest(sample(1.0, 1.0, 5_000)).unwrap();
        gate.ingest(sample(2.0, 2.0, 12_000)).unwrap();
        assert_eq!(gate.stats().queue_time_span_ms, 7_000);

        // Out-of-order arrival makes the span negative rather than reordering
        gate.ingest(sample(3.0, 3.0, 1_000)).unwrap();
        assert_eq!(gate.stats().queue_time_span_ms, -4_000);
    }

    #[test]
    fn test_reset_clears_window() {
        let gate = DeduplicationGate::new();
        gate.ingest(sample(1.0, 1.0, 0)).unwrap();
        gate.reset();
        assert!(gate.buffered_events().is_empty());
        assert!(gate.ingest(sample(1.0, 1.0, 1)).unwrap().was_added);
    }

    #[test]
    fn test_is_within_range() {
        let a = Coordinate::new(40.7128, -74.0060);
        let b = Coordinate::new(40.71285, -74.00605);
        let c = Coordinate::new(40.7140, -74.0070);
        assert!(DeduplicationGate::is_within_range(&a, &b, 10.0));
        assert!(!DeduplicationGate::is_within_range(&a, &c, 10.0));
        assert!(DeduplicationGate::is_within_range(&a, &c, 500.0));
    }

    #[test]
    fn test_counters_track_outcomes() {
        let gate = DeduplicationGate::new();
        gate.ingest(sample(1.0, 1.0, 0)).unwrap();
        gate.ingest(sample(1.0, 1.0, 1_000)).unwrap();
        gate.ingest(sample(2.0, 2.0, 2_000)).unwrap();
        let _ = gate.ingest(sample(100.0, 2.0, 3_000));

        let counters = gate.counters();
        assert_eq!(counters.admitted.load(Ordering::Relaxed), 2);
        assert_eq!(counters.rejected.load(Ordering::Relaxed), 1);
        assert_eq!(counters.total(), 4);
    }

    #[test]
    fn test_shared_gate_is_singleton() {
        let a = DeduplicationGate::shared() as *const DeduplicationGate;
        let b = DeduplicationGate::shared() as *const DeduplicationGate;
        assert_eq!(a, b);
    }

    #[test]
    fn test_reason_display_messages() {
        assert_eq!(DecisionReason::Admitted.to_string(), "admitted as new location");
        let msg = DecisionReason::RejectedProximity {
            distance_m: 6.25,
            elapsed_ms: 14_000,
        }
        .to_string();
        assert!(msg.contains("6.2") || msg.contains("6.3"));
        assert!(msg.contains("14.0 s"));
    }

    #[test]
    fn test_decision_serializes_tagged_reason() {
        let json = serde_json::to_string(&Decision::error_fallback("boom")).unwrap();
        assert!(json.contains("\"kind\":\"error_fallback\""));
        assert!(json.contains("\"cause\":\"boom\""));
    }

    #[test]
    fn test_decision_matches_window_admission() {
        let gate = DeduplicationGate::new();
        let first = sample(40.7128, -74.0060, 1_000);
        let repeat = sample(40.71285, -74.00605, 15_000);
        gate.ingest(first).unwrap();
        let decision = gate.ingest(repeat).unwrap();

        let mut window = EventWindow::default();
        window.append(first.into());
        let admission = window.try_append(repeat.into()).unwrap();
        assert_eq!(decision, Decision::from(&admission));
        assert_eq!(Decision::from(&Admission::Admitted), Decision::admitted());
    }

    #[test]
    fn test_concurrent_ingest_never_double_admits() {
        use std::thread;

        let gate = Arc::new(DeduplicationGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.ingest(sample(5.0, 5.0, 1_000)).unwrap().was_added)
            })
            .collect();

        let added = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|added| *added)
            .count();
        assert_eq!(added, 1);
        assert_eq!(gate.buffered_events().len(), 1);
    }
}
