//! Sensor types shared by the motion and location samplers.
//!
//! Raw readings are transient: adapters produce them, the samplers consume
//! them and nothing keeps them after the session state has been updated.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// 3D vector for accelerometer readings (m/s²).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// X-axis component (left-right)
    pub x: f64,
    /// Y-axis component (forward-backward)
    pub y: f64,
    /// Z-axis component (up-down)
    pub z: f64,
}

impl Vector3 {
    /// Create a new vector with specified components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Calculate the magnitude (length) of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One raw 3-axis acceleration reading, gravity included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Accelerometer reading (m/s²)
    pub acceleration: Vector3,
    /// When the adapter received the reading
    pub timestamp: Instant,
}

impl TelemetrySample {
    /// Create a sample from raw axis values.
    pub fn new(x: f64, y: f64, z: f64, timestamp: Instant) -> Self {
        Self {
            acceleration: Vector3::new(x, y, z),
            timestamp,
        }
    }
}

/// One raw location reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Instantaneous speed reported by the receiver (m/s), if any
    pub speed_mps: Option<f64>,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// When the fix was acquired
    pub timestamp: Instant,
}

impl PositionFix {
    /// A fix carrying a receiver-reported speed.
    pub fn with_speed(speed_mps: f64, latitude: f64, longitude: f64, timestamp: Instant) -> Self {
        Self {
            speed_mps: Some(speed_mps),
            latitude,
            longitude,
            timestamp,
        }
    }

    /// A position-only fix; speed has to be derived from consecutive fixes.
    pub fn at_position(latitude: f64, longitude: f64, timestamp: Instant) -> Self {
        Self {
            speed_mps: None,
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Answer from a motion permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
}

/// Errors raised by motion sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// No motion sensor is present on this device
    #[error("Motion sensor not available")]
    NotAvailable,

    /// Failed to subscribe to motion events
    #[error("Failed to subscribe to motion events: {0}")]
    SubscriptionFailed(String),
}

/// Errors raised while acquiring a position fix. Never fatal to a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    /// Location services are off or missing
    #[error("Location not available")]
    Unavailable,

    /// The receiver did not produce a fix in time
    #[error("Position fix timed out")]
    Timeout,

    /// Any other acquisition failure
    #[error("Position fix failed: {0}")]
    Failed(String),
}

/// Errors raised by a permission gate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PermissionError {
    #[error("Permission request failed: {0}")]
    RequestFailed(String),
}
