//! Motion sampling: accelerometer sources and the magnitude sampler.
//!
//! A [`SensorSource`] is picked once when the session is built, either a
//! platform adapter ([`MotionDevice`]) or the built-in [`SimulatedMotion`].
//! Sources push samples into a [`MotionSink`]; the [`SubscriptionHandle`]
//! returned from `subscribe()` closes that sink when cancelled or dropped.

use crate::sensors::types::{SensorError, TelemetrySample, Vector3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;

/// Stationary gravity baseline (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.8;

/// Highest sample rate the simulator produces (Hz).
pub const MAX_SIMULATED_RATE_HZ: f64 = 10_000.0;

/// A sample reduced to what the accumulator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    /// Raw reading, kept for the snapshot
    pub acceleration: Vector3,
    /// Total acceleration magnitude, gravity included
    pub magnitude: f64,
    /// Magnitude minus the gravity baseline
    pub net_acceleration: f64,
}

/// Computes magnitude and net acceleration from raw samples.
#[derive(Debug, Clone, Copy)]
pub struct MotionSampler {
    gravity: f64,
}

impl MotionSampler {
    /// Create a sampler with the given gravity baseline.
    pub fn new(gravity: f64) -> Self {
        Self { gravity }
    }

    /// Gravity baseline in use.
    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Reduce a raw sample. Returns `None` for malformed (non-finite) readings.
    pub fn read(&self, sample: &TelemetrySample) -> Option<MotionReading> {
        if !sample.acceleration.is_finite() {
            return None;
        }

        let magnitude = sample.acceleration.magnitude();
        Some(MotionReading {
            acceleration: sample.acceleration,
            magnitude,
            net_acceleration: magnitude - self.gravity,
        })
    }
}

impl Default for MotionSampler {
    fn default() -> Self {
        Self::new(STANDARD_GRAVITY)
    }
}

/// Delivery end handed to a motion source on subscribe.
#[derive(Debug, Clone)]
pub struct MotionSink {
    tx: UnboundedSender<TelemetrySample>,
    active: Arc<AtomicBool>,
}

impl MotionSink {
    /// Wrap a sender in a fresh, active sink.
    pub fn new(tx: UnboundedSender<TelemetrySample>) -> Self {
        Self {
            tx,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the subscription behind this sink is still live.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Push a sample. Returns `false` once the subscription has been cancelled.
    pub fn deliver(&self, sample: TelemetrySample) -> bool {
        if !self.is_active() {
            return false;
        }
        self.tx.send(sample).is_ok()
    }
}

/// Cancellation handle for a motion subscription.
///
/// Cancelling (or dropping) deactivates the sink and aborts the producer task,
/// if the source spawned one.
#[derive(Debug)]
pub struct SubscriptionHandle {
    active: Arc<AtomicBool>,
    task: Option<AbortHandle>,
}

impl SubscriptionHandle {
    /// Handle controlling the given sink.
    pub fn for_sink(sink: &MotionSink) -> Self {
        Self {
            active: Arc::clone(&sink.active),
            task: None,
        }
    }

    /// Attach the producer task so cancellation also aborts it.
    pub fn with_task(mut self, task: AbortHandle) -> Self {
        self.task = Some(task);
        self
    }

    /// Whether the subscription has not been cancelled yet.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Unsubscribe. After this returns the sink refuses every sample.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Platform accelerometer adapter.
pub trait MotionDevice: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Check whether the device can deliver motion events.
    fn is_available(&self) -> bool;

    /// Start delivering samples into `sink`.
    fn subscribe(&mut self, sink: MotionSink) -> Result<SubscriptionHandle, SensorError>;
}

/// Motion source, selected once at construction.
pub enum SensorSource {
    /// A platform accelerometer
    Real(Box<dyn MotionDevice>),
    /// Generated samples for demos and tests
    Simulated(SimulatedMotion),
}

impl SensorSource {
    /// Check whether motion events can be delivered.
    pub fn is_available(&self) -> bool {
        match self {
            SensorSource::Real(device) => device.is_available(),
            SensorSource::Simulated(_) => true,
        }
    }

    /// Subscribe `sink` to the source.
    pub fn subscribe(&mut self, sink: MotionSink) -> Result<SubscriptionHandle, SensorError> {
        match self {
            SensorSource::Real(device) => {
                if !device.is_available() {
                    return Err(SensorError::NotAvailable);
                }
                tracing::debug!(device = device.name(), "Subscribing to motion device");
                device.subscribe(sink)
            }
            SensorSource::Simulated(simulated) => simulated.subscribe(sink),
        }
    }

    /// Short label for logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SensorSource::Real(_) => "real",
            SensorSource::Simulated(_) => "simulated",
        }
    }
}

impl std::fmt::Debug for SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorSource::Real(device) => f.debug_tuple("Real").field(&device.name()).finish(),
            SensorSource::Simulated(sim) => f.debug_tuple("Simulated").field(sim).finish(),
        }
    }
}

/// Simulated accelerometer: gravity on Z plus a sinusoidal longitudinal wobble.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMotion {
    /// Sample rate (Hz)
    pub rate_hz: f64,
    /// Peak longitudinal acceleration (m/s²)
    pub wobble_amplitude: f64,
    /// Wobble frequency (Hz)
    pub wobble_frequency_hz: f64,
    /// Gravity component on Z (m/s²)
    pub gravity: f64,
}

impl Default for SimulatedMotion {
    fn default() -> Self {
        Self {
            rate_hz: 60.0,
            wobble_amplitude: 1.5,
            wobble_frequency_hz: 0.2,
            gravity: STANDARD_GRAVITY,
        }
    }
}

impl SimulatedMotion {
    /// Create a simulator sampling at `rate_hz`.
    pub fn new(rate_hz: f64) -> Self {
        Self {
            rate_hz,
            ..Default::default()
        }
    }

    /// Set the wobble profile.
    pub fn with_wobble(mut self, amplitude: f64, frequency_hz: f64) -> Self {
        self.wobble_amplitude = amplitude;
        self.wobble_frequency_hz = frequency_hz;
        self
    }

    /// Reading produced `t_secs` after the subscription started.
    pub fn sample_at(&self, t_secs: f64, timestamp: Instant) -> TelemetrySample {
        let phase = 2.0 * std::f64::consts::PI * self.wobble_frequency_hz * t_secs;
        TelemetrySample::new(0.0, self.wobble_amplitude * phase.sin(), self.gravity, timestamp)
    }

    /// Interval between samples. Rates are held to `[1, MAX_SIMULATED_RATE_HZ]`;
    /// a NaN rate samples at 1 Hz.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz.max(1.0).min(MAX_SIMULATED_RATE_HZ))
    }

    /// Spawn the producer task on the current tokio runtime.
    pub fn subscribe(&mut self, sink: MotionSink) -> Result<SubscriptionHandle, SensorError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;

        let profile = self.clone();
        let handle = SubscriptionHandle::for_sink(&sink);

        let task = runtime.spawn(async move {
            let origin = Instant::now();
            let mut ticker = tokio::time::interval(profile.period());
            loop {
                ticker.tick().await;
                let now = Instant::now();
                let t = now.duration_since(origin).as_secs_f64();
                if !sink.deliver(profile.sample_at(t, now)) {
                    break;
                }
            }
            tracing::debug!("Simulated motion stream ended");
        });

        Ok(handle.with_task(task.abort_handle()))
    }
}
