//! Bounded Event Window with Proximity Admission
//!
//! Holds the accepted location events of a tracking session in insertion
//! order. A new event is admitted only if no buffered event is both close
//! in space (within the dedup radius) and close in time (inside the dedup
//! window). Every buffered event is checked, not just the latest, so a
//! walker who leaves a spot and comes straight back is still rejected until
//! the time window has passed.
//!
//! Capacity is fixed. When it is exceeded the oldest-by-insertion entry is
//! evicted, regardless of its timestamp.

use super::types::GeoEvent;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default buffer capacity
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default dedup radius (meters)
pub const DEFAULT_DEDUP_RADIUS_M: f64 = 10.0;

/// Default dedup time window (milliseconds)
pub const DEFAULT_DEDUP_TIME_WINDOW_MS: u64 = 30_000;

/// A buffered event that blocks admission of a new one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityMatch {
    /// The buffered event that conflicts
    pub conflicting: GeoEvent,
    /// Distance between the new event and the conflicting one (meters)
    pub distance_m: f64,
    /// Absolute time between them (milliseconds)
    pub elapsed_ms: u64,
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Stored at the tail of the window
    Admitted,
    /// Rejected as a spatial + temporal duplicate
    Rejected(ProximityMatch),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Bounded, insertion-ordered buffer of [`GeoEvent`]s
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: VecDeque<GeoEvent>,
    max_size: usize,
    dedup_radius_m: f64,
    dedup_time_window_ms: u64,
    /// Makes every conflict scan panic while set
    #[cfg(test)]
    pub(crate) panic_on_check: bool,
}

impl EventWindow {
    /// Create a window with the given capacity and default dedup thresholds.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(max_size: usize) -> Self {
        Self::with_params(max_size, DEFAULT_DEDUP_RADIUS_M, DEFAULT_DEDUP_TIME_WINDOW_MS)
    }

    /// Create a window with explicit capacity and dedup thresholds
    pub fn with_params(max_size: usize, dedup_radius_m: f64, dedup_time_window_ms: u64) -> Self {
        let max_size = max_size.max(1);
        Self {
            events: VecDeque::with_capacity(max_size.min(DEFAULT_MAX_SIZE)),
            max_size,
            dedup_radius_m,
            dedup_time_window_ms,
            #[cfg(test)]
            panic_on_check: false,
        }
    }

    /// Build a window by replaying `events` through the admission rule in order.
    ///
    /// `None` parameters fall back to the defaults.
    pub fn from_events<I>(
        events: I,
        max_size: Option<usize>,
        dedup_radius_m: Option<f64>,
        dedup_time_window_ms: Option<u64>,
    ) -> Self
    where
        I: IntoIterator<Item = GeoEvent>,
    {
        let mut window = Self::with_params(
            max_size.unwrap_or(DEFAULT_MAX_SIZE),
            dedup_radius_m.unwrap_or(DEFAULT_DEDUP_RADIUS_M),
            dedup_time_window_ms.unwrap_or(DEFAULT_DEDUP_TIME_WINDOW_MS),
        );
        for event in events {
            window.append(event);
        }
        window
    }

    /// Find the first buffered event (in insertion order) that blocks `event`.
    ///
    /// Read-only. Fails with `TransientInternal` if a distance cannot be
    /// computed, which only happens when the buffer holds a corrupt event.
    pub fn find_conflict(&self, event: &GeoEvent) -> crate::Result<Option<ProximityMatch>> {
        self.injected_fault();

        for existing in &self.events {
            let elapsed_ms = event.elapsed_ms(existing);
            if elapsed_ms >= self.dedup_time_window_ms {
                continue;
            }

            let distance_m = event.distance_to(existing);
            if !distance_m.is_finite() {
                return Err(crate::Error::TransientInternal(format!(
                    "non-finite distance between ({}, {}) and ({}, {})",
                    event.latitude(),
                    event.longitude(),
                    existing.latitude(),
                    existing.longitude(),
                )));
            }

            if distance_m <= self.dedup_radius_m {
                return Ok(Some(ProximityMatch {
                    conflicting: *existing,
                    distance_m,
                    elapsed_ms,
                }));
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    fn injected_fault(&self) {
        if self.panic_on_check {
            panic!("conflict scan failed on purpose");
        }
    }

    #[cfg(not(test))]
    #[inline(always)]
    fn injected_fault(&self) {}

    /// Try to admit an event, reporting why it was rejected.
    ///
    /// The window is only modified after the scan succeeds; on error the
    /// event is not stored.
    pub fn try_append(&mut self, event: GeoEvent) -> crate::Result<Admission> {
        if let Some(conflict) = self.find_conflict(&event)? {
            return Ok(Admission::Rejected(conflict));
        }
        self.push_evicting(event);
        Ok(Admission::Admitted)
    }

    /// Admit an event if it is not a duplicate.
    ///
    /// Returns true if the event was stored, false if it was rejected or
    /// could not be evaluated.
    pub fn append(&mut self, event: GeoEvent) -> bool {
        matches!(self.try_append(event), Ok(Admission::Admitted))
    }

    /// Store without an admission check, evicting the head on overflow
    pub(crate) fn push_evicting(&mut self, event: GeoEvent) {
        self.events.push_back(event);
        while self.events.len() > self.max_size {
            self.events.pop_front();
        }
    }

    /// Most recently inserted event
    pub fn latest(&self) -> Option<&GeoEvent> {
        self.events.back()
    }

    /// Second most recently inserted event
    pub fn previous(&self) -> Option<&GeoEvent> {
        self.events.len().checked_sub(2).and_then(|i| self.events.get(i))
    }

    /// Oldest inserted event still buffered
    pub fn first(&self) -> Option<&GeoEvent> {
        self.events.front()
    }

    /// Copy of the buffer in insertion order
    pub fn to_vec(&self) -> Vec<GeoEvent> {
        self.events.iter().copied().collect()
    }

    /// Copy of the buffer sorted by timestamp, ties kept in insertion order
    pub fn chronological(&self) -> Vec<GeoEvent> {
        let mut events = self.to_vec();
        events.sort_by_key(|e| e.timestamp_ms());
        events
    }

    /// The last `n` events by insertion order (not by timestamp).
    ///
    /// Clamped to the buffer size.
    pub fn last_n(&self, n: usize) -> Vec<GeoEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).copied().collect()
    }

    /// Events with `start_ms <= timestamp <= end_ms`, in chronological order
    pub fn events_in_time_range(&self, start_ms: i64, end_ms: i64) -> Vec<GeoEvent> {
        let mut events: Vec<GeoEvent> = self
            .events
            .iter()
            .filter(|e| (start_ms..=end_ms).contains(&e.timestamp_ms()))
            .copied()
            .collect();
        events.sort_by_key(|e| e.timestamp_ms());
        events
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeoEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn dedup_radius_m(&self) -> f64 {
        self.dedup_radius_m
    }

    pub fn dedup_time_window_ms(&self) -> u64 {
        self.dedup_time_window_ms
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(lat: f64, lon: f64, ts: i64) -> GeoEvent {
        GeoEvent::new(lat, lon, ts)
    }

    /// ~111 m per 0.001 degree of latitude
    fn far_north(base: &GeoEvent, steps: u32, ts: i64) -> GeoEvent {
        ev(base.latitude() + 0.001 * steps as f64, base.longitude(), ts)
    }

    #[test]
    fn test_window_defaults() {
        let window = EventWindow::default();
        assert_eq!(window.max_size(), DEFAULT_MAX_SIZE);
        assert_eq!(window.dedup_radius_m(), 10.0);
        assert_eq!(window.dedup_time_window_ms(), 30_000);
        assert!(window.is_empty());
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let mut window = EventWindow::new(0);
        assert_eq!(window.max_size(), 1);
        assert!(window.append(ev(0.0, 0.0, 0)));
        assert!(window.append(ev(1.0, 0.0, 1)));
        assert_eq!(window.len(), 1);
        assert_eq!(window.latest().map(|e| e.latitude()), Some(1.0));
    }

    #[test]
    fn test_first_event_admitted() {
        let mut window = EventWindow::default();
        assert!(window.append(ev(40.7128, -74.0060, 1_000)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_near_and_recent_rejected() {
        let mut window = EventWindow::default();
        assert!(window.append(ev(40.7128, -74.0060, 1_000)));
        assert!(!window.append(ev(40.71285, -74.00605, 15_000)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_time_window_boundary_is_exclusive() {
        let mut window = EventWindow::default();
        assert!(window.append(ev(10.0, 10.0, 0)));
        // Exactly 30 s later at the same spot: outside the window
        assert!(window.append(ev(10.0, 10.0, 30_000)));
    }

    #[test]
    fn test_just_inside_time_window_rejected() {
        let mut window = EventWindow::default();
        assert!(window.append(ev(10.0, 10.0, 0)));
        assert!(!window.append(ev(10.0, 10.0, 29_999)));
    }

    #[test]
    fn test_far_event_admitted_regardless_of_time() {
        let mut window = EventWindow::default();
        let a = ev(10.0, 10.0, 0);
        assert!(window.append(a));
        assert!(window.append(far_north(&a, 1, 0)));
    }

    #[test]
    fn test_out_of_order_timestamp_still_deduplicated() {
        let mut window = EventWindow::default();
        assert!(window.append(ev(10.0, 10.0, 50_000)));
        // Earlier fix time, same place, 20 s apart in absolute terms
        assert!(!window.append(ev(10.0, 10.0, 30_000)));
    }

    #[test]
    fn test_whole_buffer_is_scanned() {
        let mut window = EventWindow::default();
        let a = ev(40.7128, -74.0060, 1_000);
        assert!(window.append(a));
        assert!(window.append(far_north(&a, 2, 5_000)));
        // Back near A, latest buffered point is far away but A still blocks it
        assert!(!window.append(ev(40.71281, -74.00601, 10_000)));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_walking_in_circles_readmitted_after_window() {
        let mut window = EventWindow::default();
        let a = ev(40.7128, -74.0060, 0);
        assert!(window.append(a));
        assert!(window.append(far_north(&a, 1, 10_000)));
        assert!(window.append(far_north(&a, 2, 20_000)));
        assert!(window.append(ev(40.7128, -74.0060, 31_000)));
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_try_append_reports_conflict_details() {
        let mut window = EventWindow::default();
        let a = ev(40.7128, -74.0060, 1_000);
        window.append(a);

        match window.try_append(ev(40.71285, -74.00605, 15_000)).unwrap() {
            Admission::Rejected(m) => {
                assert_eq!(m.conflicting, a);
                assert_eq!(m.elapsed_ms, 14_000);
                assert!(m.distance_m > 0.0 && m.distance_m <= 10.0);
            }
            Admission::Admitted => panic!("Expected rejection"),
        }
    }

    #[test]
    fn test_corrupt_buffered_event_surfaces_error() {
        let mut window = EventWindow::default();
        window.push_evicting(ev(f64::NAN, 0.0, 0));

        let result = window.try_append(ev(1.0, 1.0, 1_000));
        assert!(matches!(result, Err(crate::Error::TransientInternal(_))));
        assert_eq!(window.len(), 1);
        assert!(!window.append(ev(1.0, 1.0, 1_000)));
    }

    #[test]
    fn test_capacity_evicts_oldest_by_insertion() {
        let mut window = EventWindow::new(3);
        let base = ev(0.0, 0.0, 0);
        for i in 0..5u32 {
            assert!(window.append(far_north(&base, i, i as i64 * 1_000)));
        }
        assert_eq!(window.len(), 3);
        let lats: Vec<f64> = window.iter().map(|e| e.latitude()).collect();
        assert!((lats[0] - 0.002).abs() < 1e-12);
        assert!((lats[2] - 0.004).abs() < 1e-12);
    }

    #[test]
    fn test_eviction_ignores_timestamps() {
        let mut window = EventWindow::new(2);
        let base = ev(0.0, 0.0, 0);
        // Inserted first but with the newest timestamp
        window.append(far_north(&base, 0, 90_000));
        window.append(far_north(&base, 1, 10_000));
        window.append(far_north(&base, 2, 20_000));

        let ts: Vec<i64> = window.iter().map(|e| e.timestamp_ms()).collect();
        assert_eq!(ts, vec![10_000, 20_000]);
    }

    #[test]
    fn test_evicted_event_no_longer_blocks() {
        let mut window = EventWindow::new(1);
        let a = ev(0.0, 0.0, 0);
        window.append(a);
        window.append(far_north(&a, 1, 1_000));
        assert!(window.append(ev(0.0, 0.0, 2_000)));
    }

    #[test]
    fn test_latest_previous_first() {
        let mut window = EventWindow::default();
        assert!(window.latest().is_none());
        assert!(window.previous().is_none());
        assert!(window.first().is_none());

        let base = ev(0.0, 0.0, 0);
        window.append(base);
        assert_eq!(window.latest(), Some(&base));
        assert!(window.previous().is_none());

        let b = far_north(&base, 1, 1_000);
        let c = far_north(&base, 2, 2_000);
        window.append(b);
        window.append(c);
        assert_eq!(window.latest(), Some(&c));
        assert_eq!(window.previous(), Some(&b));
        assert_eq!(window.first(), Some(&base));
    }

    #[test]
    fn test_chronological_sorts_stably() {
        let mut window = EventWindow::default();
        let base = ev(0.0, 0.0, 0);
        let a = far_north(&base, 1, 3_000);
        let b = far_north(&base, 2, 1_000);
        let c = far_north(&base, 3, 3_000);
        let d = far_north(&base, 4, 2_000);
        for e in [a, b, c, d] {
            window.append(e);
        }

        assert_eq!(window.chronological(), vec![b, d, a, c]);
        // Insertion order untouched
        assert_eq!(window.to_vec(), vec![a, b, c, d]);
    }

    #[test]
    fn test_last_n_uses_insertion_order() {
        let mut window = EventWindow::default();
        let base = ev(0.0, 0.0, 0);
        let a = far_north(&base, 1, 5_000);
        let b = far_north(&base, 2, 9_000);
        let c = far_north(&base, 3, 1_000);
        for e in [a, b, c] {
            window.append(e);
        }

        // c is the last inserted even though b is the most recent by time
        assert_eq!(window.last_n(2), vec![b, c]);
        assert_eq!(window.last_n(10), vec![a, b, c]);
        assert!(window.last_n(0).is_empty());
    }

    #[test]
    fn test_events_in_time_range_inclusive_and_chronological() {
        let mut window = EventWindow::default();
        let base = ev(0.0, 0.0, 0);
        let a = far_north(&base, 1, 4_000);
        let b = far_north(&base, 2, 2_000);
        let c = far_north(&base, 3, 6_000);
        let d = far_north(&base, 4, 8_000);
        for e in [a, b, c, d] {
            window.append(e);
        }

        assert_eq!(window.events_in_time_range(2_000, 6_000), vec![b, a, c]);
        assert!(window.events_in_time_range(9_000, 10_000).is_empty());
        assert!(window.events_in_time_range(6_000, 2_000).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut window = EventWindow::default();
        window.append(ev(0.0, 0.0, 0));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        // Same spot admitted again after clear
        assert!(window.append(ev(0.0, 0.0, 1)));
    }

    #[test]
    fn test_from_events_replays_admission() {
        let events = vec![
            ev(40.7128, -74.0060, 1_000),
            ev(40.71285, -74.00605, 15_000),
            ev(40.7140, -74.0070, 16_000),
            ev(40.71285, -74.00605, 36_000),
        ];
        let window = EventWindow::from_events(events.clone(), None, None, None);
        assert_eq!(window.to_vec(), vec![events[0], events[2], events[3]]);
    }

    #[test]
    fn test_from_events_custom_params() {
        let base = ev(0.0, 0.0, 0);
        let events: Vec<GeoEvent> = (0..5).map(|i| far_north(&base, i, i as i64)).collect();
        // 200 m radius swallows the 111 m steps
        let window = EventWindow::from_events(events, Some(2), Some(200.0), Some(60_000));
        assert_eq!(window.max_size(), 2);
        assert_eq!(window.dedup_radius_m(), 200.0);
        assert_eq!(window.len(), 2);
    }
}
