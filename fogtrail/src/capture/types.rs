//! Core types for location capture
//!
//! Defines the geographic value types that flow through the ingestion
//! pipeline: plain coordinates, location samples as delivered by a sensor
//! or replay source, and the immutable [`GeoEvent`] stored in the buffer.

use crate::time::clock::SystemClock;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Valid latitude range (degrees)
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range (degrees)
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Check a latitude/longitude pair against the valid ranges.
///
/// Non-finite values fail the range check as well. Out-of-range input is
/// reported, never clamped.
pub fn validate_lat_lon(latitude: f64, longitude: f64) -> crate::Result<()> {
    if LATITUDE_RANGE.contains(&latitude) && LONGITUDE_RANGE.contains(&longitude) {
        Ok(())
    } else {
        Err(crate::Error::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance in meters between two lat/lon pairs (degrees)
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` slightly past 1; clamp keeps NaN intact
    let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

    EARTH_RADIUS_M * c
}

/// Plain latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject latitudes outside [-90, 90] and longitudes outside [-180, 180]
    pub fn validate(&self) -> crate::Result<()> {
        validate_lat_lon(self.latitude, self.longitude)
    }
}

/// A location sample as delivered by a sensor, file replay or injection.
///
/// `timestamp_ms` is the fix time in Unix epoch milliseconds. Samples
/// without one are stamped with the current time when converted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl LocationSample {
    /// Sample with an explicit fix time
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms: Some(timestamp_ms),
        }
    }

    /// Sample that will be stamped on ingestion
    pub fn unstamped(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms: None,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        validate_lat_lon(self.latitude, self.longitude)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Immutable timestamped geographic position.
///
/// Fields are private; all operations derive new values. Construction does
/// not validate ranges, that happens at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoEvent {
    latitude: f64,
    longitude: f64,
    timestamp_ms: i64,
}

impl GeoEvent {
    /// Create an event with an explicit timestamp (epoch milliseconds)
    pub const fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// Create an event stamped with the current wall-clock time
    pub fn now(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, SystemClock::now())
    }

    pub fn from_coordinate(coordinate: Coordinate) -> Self {
        Self::now(coordinate.latitude, coordinate.longitude)
    }

    /// Build from a sample, using the current time if it carries none
    pub fn from_location_sample(sample: LocationSample) -> Self {
        match sample.timestamp_ms {
            Some(ts) => Self::new(sample.latitude, sample.longitude, ts),
            None => Self::now(sample.latitude, sample.longitude),
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Haversine distance to another event in meters
    pub fn distance_to(&self, other: &GeoEvent) -> f64 {
        haversine_distance_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// True if `other` lies within `meters` (inclusive)
    pub fn is_within_distance(&self, other: &GeoEvent, meters: f64) -> bool {
        self.distance_to(other) <= meters
    }

    /// Absolute time between two events in milliseconds
    #[inline]
    pub fn elapsed_ms(&self, other: &GeoEvent) -> u64 {
        crate::time::clock::abs_diff_millis(self.timestamp_ms, other.timestamp_ms)
    }

    pub fn to_coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn to_location_sample(&self) -> LocationSample {
        LocationSample::new(self.latitude, self.longitude, self.timestamp_ms)
    }

    /// Range check for this event's position
    pub fn validate(&self) -> crate::Result<()> {
        validate_lat_lon(self.latitude, self.longitude)
    }
}

impl From<LocationSample> for GeoEvent {
    fn from(sample: LocationSample) -> Self {
        Self::from_location_sample(sample)
    }
}

impl From<GeoEvent> for LocationSample {
    fn from(event: GeoEvent) -> Self {
        event.to_location_sample()
    }
}

impl From<GeoEvent> for Coordinate {
    fn from(event: GeoEvent) -> Self {
        event.to_coordinate()
    }
}
