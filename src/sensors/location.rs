//! Location sources and the speed-deriving position sampler.

use crate::sensors::types::{LocationError, PositionFix};
use futures::future::{BoxFuture, FutureExt};
use std::time::{Duration, Instant};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Conversion factor from m/s to km/h.
pub const MPS_TO_KMH: f64 = 3.6;

/// Lowest speed accepted as a real reading (km/h).
pub const MIN_VALID_SPEED_KMH: f64 = 5.0;

/// Highest speed accepted as a real reading (km/h).
pub const MAX_VALID_SPEED_KMH: f64 = 250.0;

/// Asynchronous position provider.
pub trait LocationSource: Send + Sync {
    /// Check whether fixes can be requested at all.
    fn is_available(&self) -> bool;

    /// Request a single fix. Failures are reported, never fatal.
    fn request_fix(&self) -> BoxFuture<'static, Result<PositionFix, LocationError>>;
}

/// Calculate the great-circle distance between two points (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Outcome of reading one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedReading {
    /// Speed inside the validity range (km/h)
    Valid(f64),
    /// Speed outside the validity range (km/h); treated as a glitch
    OutOfRange(f64),
    /// No speed could be derived from this fix
    Unavailable,
}

/// Derives km/h from position fixes and applies the validity gate.
#[derive(Debug, Clone, Copy)]
pub struct PositionSampler {
    min_speed_kmh: f64,
    max_speed_kmh: f64,
}

impl PositionSampler {
    /// Create a sampler accepting speeds in `[min_speed_kmh, max_speed_kmh]`.
    pub fn new(min_speed_kmh: f64, max_speed_kmh: f64) -> Self {
        Self {
            min_speed_kmh,
            max_speed_kmh,
        }
    }

    /// Speed of `fix` in km/h.
    ///
    /// A reported, non-negative speed wins. Otherwise the speed is derived from
    /// the haversine distance to `previous` over the time between both fixes.
    pub fn derive_speed_kmh(fix: &PositionFix, previous: Option<&PositionFix>) -> Option<f64> {
        if let Some(mps) = fix.speed_mps.filter(|s| s.is_finite() && *s >= 0.0) {
            return Some(mps * MPS_TO_KMH);
        }

        let previous = previous?;
        if fix.timestamp <= previous.timestamp {
            return None;
        }
        let seconds = fix.timestamp.duration_since(previous.timestamp).as_secs_f64();
        let meters = haversine_distance(
            previous.latitude,
            previous.longitude,
            fix.latitude,
            fix.longitude,
        );
        let kmh = meters / seconds * MPS_TO_KMH;
        kmh.is_finite().then_some(kmh)
    }

    /// Validity predicate.
    pub fn is_valid(&self, speed_kmh: f64) -> bool {
        (self.min_speed_kmh..=self.max_speed_kmh).contains(&speed_kmh)
    }

    /// Derive and validate the speed carried by `fix`.
    pub fn read(&self, fix: &PositionFix, previous: Option<&PositionFix>) -> SpeedReading {
        match Self::derive_speed_kmh(fix, previous) {
            Some(kmh) if self.is_valid(kmh) => SpeedReading::Valid(kmh),
            Some(kmh) => SpeedReading::OutOfRange(kmh),
            None => SpeedReading::Unavailable,
        }
    }
}

impl Default for PositionSampler {
    fn default() -> Self {
        Self::new(MIN_VALID_SPEED_KMH, MAX_VALID_SPEED_KMH)
    }
}

/// Simulated receiver travelling due north at a constant speed.
#[derive(Debug, Clone)]
pub struct SimulatedLocation {
    origin: Instant,
    /// Starting latitude in degrees
    pub start_latitude: f64,
    /// Starting longitude in degrees
    pub start_longitude: f64,
    /// Travel speed (km/h)
    pub cruise_speed_kmh: f64,
    /// Whether fixes carry a reported speed or only a position
    pub report_speed: bool,
    /// Delay before each fix resolves
    pub latency: Duration,
}

impl SimulatedLocation {
    /// Create a receiver starting now at the given position.
    pub fn new(start_latitude: f64, start_longitude: f64, cruise_speed_kmh: f64) -> Self {
        Self {
            origin: Instant::now(),
            start_latitude,
            start_longitude,
            cruise_speed_kmh,
            report_speed: true,
            latency: Duration::ZERO,
        }
    }

    /// Only report positions, forcing speed derivation from consecutive fixes.
    pub fn position_only(mut self) -> Self {
        self.report_speed = false;
        self
    }

    /// Delay every fix by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fix the simulated receiver would report at `now`.
    pub fn fix_at(&self, now: Instant) -> PositionFix {
        let speed_mps = self.cruise_speed_kmh / MPS_TO_KMH;
        let travelled = speed_mps * now.saturating_duration_since(self.origin).as_secs_f64();
        let latitude = self.start_latitude + (travelled / EARTH_RADIUS_M).to_degrees();

        PositionFix {
            speed_mps: self.report_speed.then_some(speed_mps),
            latitude,
            longitude: self.start_longitude,
            timestamp: now,
        }
    }
}

impl LocationSource for SimulatedLocation {
    fn is_available(&self) -> bool {
        true
    }

    fn request_fix(&self) -> BoxFuture<'static, Result<PositionFix, LocationError>> {
        let receiver = self.clone();
        async move {
            if !receiver.latency.is_zero() {
                tokio::time::sleep(receiver.latency).await;
            }
            Ok(receiver.fix_at(Instant::now()))
        }
        .boxed()
    }
}
