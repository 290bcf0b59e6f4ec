//! Sensor module for accelerometer and location input.

pub mod location;
pub mod motion;
pub mod permission;
pub mod types;

pub use location::{
    haversine_distance, LocationSource, PositionSampler, SimulatedLocation, SpeedReading,
};
pub use motion::{
    MotionDevice, MotionReading, MotionSampler, MotionSink, SensorSource, SimulatedMotion,
    SubscriptionHandle, MAX_SIMULATED_RATE_HZ, STANDARD_GRAVITY,
};
pub use permission::{PermissionGate, StaticPermission};
pub use types::{
    LocationError, Permission, PermissionError, PositionFix, SensorError, TelemetrySample,
    Vector3,
};
