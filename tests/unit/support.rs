//! Test doubles shared by the unit suites.

use drivescore::sensors::{
    LocationError, LocationSource, MotionDevice, MotionSink, Permission, PermissionError,
    PermissionGate, PositionFix, SensorError, SensorSource, SimulatedLocation,
    SubscriptionHandle, TelemetrySample,
};
use drivescore::session::{SessionController, SessionSources, TelemetrySnapshot};
use drivescore::storage::EngineConfig;
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Motion device that records the sink it was handed and never produces
/// samples by itself.
pub struct StubMotion {
    pub available: bool,
    pub fail_subscribe: bool,
    pub sink: Arc<Mutex<Option<MotionSink>>>,
}

impl StubMotion {
    pub fn new() -> Self {
        Self {
            available: true,
            fail_subscribe: false,
            sink: Arc::new(Mutex::new(None)),
        }
    }
}

impl MotionDevice for StubMotion {
    fn name(&self) -> &str {
        "stub motion"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn subscribe(&mut self, sink: MotionSink) -> Result<SubscriptionHandle, SensorError> {
        if self.fail_subscribe {
            return Err(SensorError::SubscriptionFailed("device busy".to_string()));
        }
        let handle = SubscriptionHandle::for_sink(&sink);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(handle)
    }
}

/// Location source that is switched off.
pub struct NoLocation;

impl LocationSource for NoLocation {
    fn is_available(&self) -> bool {
        false
    }

    fn request_fix(&self) -> BoxFuture<'static, Result<PositionFix, LocationError>> {
        future::ready(Err(LocationError::Unavailable)).boxed()
    }
}

/// Permission gate whose prompt fails.
pub struct BrokenGate;

impl PermissionGate for BrokenGate {
    fn request_motion_permission(&self) -> BoxFuture<'static, Result<Permission, PermissionError>> {
        future::ready(Err(PermissionError::RequestFailed("prompt dismissed".to_string()))).boxed()
    }
}

/// Controller over a stub motion device and a simulated location source.
pub fn controller(config: EngineConfig) -> SessionController {
    controller_with(config, sources(StubMotion::new()))
}

/// Sources over the given motion device and a simulated location source.
pub fn sources(motion: StubMotion) -> SessionSources {
    SessionSources::new(
        SensorSource::Real(Box::new(motion)),
        Arc::new(SimulatedLocation::new(0.0, 0.0, 50.0)),
    )
}

pub fn controller_with(config: EngineConfig, sources: SessionSources) -> SessionController {
    let (tx, _rx) = mpsc::unbounded_channel();
    SessionController::new(&config, sources, tx)
}

/// Instant `secs` seconds after `t0`.
pub fn at(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

/// Feed `count` samples of `(0, 0, z)` at `rate_hz`, the first one period
/// after `t0`. Returns the last snapshot produced.
pub fn feed_constant(
    ctrl: &mut SessionController,
    t0: Instant,
    z: f64,
    rate_hz: f64,
    count: usize,
) -> Option<TelemetrySnapshot> {
    let mut last = None;
    for i in 1..=count {
        let sample = TelemetrySample::new(0.0, 0.0, z, at(t0, i as f64 / rate_hz));
        if let Some(snapshot) = ctrl.on_motion_sample(&sample) {
            last = Some(snapshot);
        }
    }
    last
}

/// Request a fix at `secs` and apply a reported speed of `kmh` to it.
pub fn apply_speed(
    ctrl: &mut SessionController,
    t0: Instant,
    secs: f64,
    kmh: f64,
) -> Option<TelemetrySnapshot> {
    let now = at(t0, secs);
    let request = ctrl.due_fix_request(now)?;
    let fix = PositionFix::with_speed(kmh / 3.6, 0.0, 0.0, now);
    ctrl.on_position_fix(request.ticket, Ok(fix)).ok().flatten()
}
