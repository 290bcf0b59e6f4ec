//! Session controller.
//!
//! Owns the session state and is its only writer. Every method runs to
//! completion without suspending, except [`SessionController::authorize`].
//! The controller performs no I/O of its own: motion samples and fix results
//! are handed to it by whoever drives the event loop, and fix requests are
//! handed back out as futures stamped with a [`FixTicket`].

use crate::metrics::{average_acceleration, AccumulatorEngine, ScoreCalculator, SpeedStats};
use crate::recording::ScoreRecord;
use crate::sensors::{
    LocationError, LocationSource, MotionSampler, MotionSink, Permission, PermissionError,
    PermissionGate, PositionFix, PositionSampler, SensorError, SensorSource, SimulatedLocation,
    SimulatedMotion, SpeedReading, StaticPermission, SubscriptionHandle, TelemetrySample,
};
use crate::session::state::{SessionDiagnostics, SessionState, TelemetrySnapshot};
use crate::storage::config::{EngineConfig, SimulationSettings};
use chrono::Utc;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Errors that keep a session from starting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Motion or location capability is missing
    #[error("Motion or location sensor not available")]
    SensorUnavailable,

    /// The user refused motion access
    #[error("Motion permission denied")]
    PermissionDenied,

    /// The permission prompt itself failed
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Subscribing to the motion source failed
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// External collaborators of a session, chosen once at construction.
pub struct SessionSources {
    /// Accelerometer
    pub motion: SensorSource,
    /// Position provider
    pub location: Arc<dyn LocationSource>,
    /// Optional platform permission prompt
    pub permission: Option<Arc<dyn PermissionGate>>,
}

impl SessionSources {
    /// Sources without a permission prompt.
    pub fn new(motion: SensorSource, location: Arc<dyn LocationSource>) -> Self {
        Self {
            motion,
            location,
            permission: None,
        }
    }

    /// Attach a permission prompt.
    pub fn with_permission(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission = Some(gate);
        self
    }

    /// Fully simulated sources built from `settings`.
    pub fn simulated(settings: &SimulationSettings) -> Self {
        let motion = SimulatedMotion::new(settings.motion_rate_hz)
            .with_wobble(settings.wobble_amplitude, settings.wobble_frequency_hz);

        let mut location = SimulatedLocation::new(
            settings.start_latitude,
            settings.start_longitude,
            settings.cruise_speed_kmh,
        )
        .with_latency(Duration::from_millis(settings.fix_latency_ms));
        if !settings.report_speed {
            location = location.position_only();
        }

        Self::new(SensorSource::Simulated(motion), Arc::new(location))
            .with_permission(Arc::new(StaticPermission(Permission::Granted)))
    }
}

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
}

/// Ties a fix request to the run that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixTicket {
    generation: u64,
    /// When the request was issued
    pub issued_at: Instant,
}

/// A fix request to be awaited outside the controller.
pub struct FixRequest {
    /// Hand this back with the result
    pub ticket: FixTicket,
    /// The location source's pending fix
    pub fix: BoxFuture<'static, Result<PositionFix, LocationError>>,
}

impl std::fmt::Debug for FixRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixRequest")
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
struct PollTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PollTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    fn arm(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    fn disarm(&mut self) {
        self.next_due = None;
    }

    /// True once per elapsed interval. Missed intervals are skipped, not replayed.
    fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let mut next = due + self.interval;
                if next <= now {
                    next = now + self.interval;
                }
                self.next_due = Some(next);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionState {
    NotRequested,
    Granted,
    Denied,
}

/// Drives one session at a time through `Idle` and `Running`.
pub struct SessionController {
    config: EngineConfig,
    motion_sampler: MotionSampler,
    position_sampler: PositionSampler,
    accumulator: AccumulatorEngine,
    speed_stats: SpeedStats,
    calculator: ScoreCalculator,
    sources: SessionSources,
    motion_tx: UnboundedSender<TelemetrySample>,
    subscription: Option<SubscriptionHandle>,
    state: SessionState,
    diagnostics: SessionDiagnostics,
    generation: u64,
    poll: PollTimer,
    permission: PermissionState,
}

impl SessionController {
    /// Create an idle controller. Motion samples are delivered into `motion_tx`.
    pub fn new(
        config: &EngineConfig,
        sources: SessionSources,
        motion_tx: UnboundedSender<TelemetrySample>,
    ) -> Self {
        let diagnostics = SessionDiagnostics {
            motion_source: sources.motion.kind(),
            accumulation_policy: config.accumulation.name(),
            scoring_policy: config.scoring.name(),
            speed_averaging: config.speed.averaging.name(),
            ..Default::default()
        };

        tracing::debug!(
            accumulation = diagnostics.accumulation_policy,
            scoring = diagnostics.scoring_policy,
            averaging = diagnostics.speed_averaging,
            "Session controller created"
        );

        Self {
            config: *config,
            motion_sampler: MotionSampler::new(config.gravity),
            position_sampler: PositionSampler::new(
                config.speed.min_valid_kmh,
                config.speed.max_valid_kmh,
            ),
            accumulator: AccumulatorEngine::new(config.accumulation),
            speed_stats: SpeedStats::new(config.speed.averaging),
            calculator: ScoreCalculator::new(config.scoring),
            sources,
            motion_tx,
            subscription: None,
            state: SessionState::default(),
            diagnostics,
            generation: 0,
            poll: PollTimer::new(Duration::from_millis(config.speed.poll_interval_ms)),
            permission: PermissionState::NotRequested,
        }
    }

    /// Ask for motion permission once and remember the answer.
    ///
    /// Without a permission gate access is granted.
    pub async fn authorize(&mut self) -> Result<(), SessionError> {
        match self.permission {
            PermissionState::Granted => return Ok(()),
            PermissionState::Denied => return Err(SessionError::PermissionDenied),
            PermissionState::NotRequested => {}
        }

        let Some(gate) = self.sources.permission.clone() else {
            self.permission = PermissionState::Granted;
            return Ok(());
        };

        match gate.request_motion_permission().await {
            Ok(Permission::Granted) => {
                self.permission = PermissionState::Granted;
                tracing::info!("Motion permission granted");
                Ok(())
            }
            Ok(Permission::Denied) => {
                self.permission = PermissionState::Denied;
                tracing::warn!("Motion permission denied");
                Err(SessionError::PermissionDenied)
            }
            Err(e) => {
                self.permission = PermissionState::Denied;
                tracing::warn!("Motion permission request failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Start a new run at `now`. A running session is restarted.
    pub fn start(&mut self, now: Instant) -> Result<(), SessionError> {
        if !self.sources.motion.is_available() || !self.sources.location.is_available() {
            tracing::warn!("Cannot start session: sensors unavailable");
            return Err(SessionError::SensorUnavailable);
        }
        if self.permission == PermissionState::Denied {
            return Err(SessionError::PermissionDenied);
        }

        if self.state.is_running {
            self.stop();
        }

        let subscription = self
            .sources
            .motion
            .subscribe(MotionSink::new(self.motion_tx.clone()))?;

        self.generation += 1;
        self.reset(now);
        self.state.clock.start(now);
        self.state.is_running = true;
        self.subscription = Some(subscription);
        self.poll.arm(now);

        let session_id = Uuid::new_v4();
        self.diagnostics.session_id = Some(session_id);
        self.diagnostics.started_at = Some(Utc::now());
        self.diagnostics.stopped_at = None;

        tracing::info!(
            "Session {} started ({} motion source)",
            session_id,
            self.sources.motion.kind()
        );
        Ok(())
    }

    /// End the run. Statistics freeze until the next reset or start.
    pub fn stop(&mut self) {
        if !self.state.is_running {
            return;
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.poll.disarm();
        self.generation += 1;
        self.state.is_running = false;
        self.diagnostics.stopped_at = Some(Utc::now());

        tracing::info!(
            "Session stopped after {:.1}s, score {:.1}",
            self.state.elapsed_time,
            self.snapshot().score
        );
    }

    /// Zero every statistic. The running flag is left alone; a running
    /// session restarts its clock at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.state.clear_statistics();
        self.diagnostics.clear_counters();
        if self.state.is_running {
            self.state.clock.start(now);
        }
    }

    /// Stop when running, start otherwise.
    pub fn toggle(&mut self, now: Instant) -> Result<(), SessionError> {
        if self.state.is_running {
            self.stop();
            Ok(())
        } else {
            self.start(now)
        }
    }

    /// Apply one accelerometer sample.
    ///
    /// Returns the updated snapshot, or `None` when the sample was dropped.
    /// Dropped samples leave the session state untouched.
    pub fn on_motion_sample(&mut self, sample: &TelemetrySample) -> Option<TelemetrySnapshot> {
        if !self.state.is_running {
            return None;
        }

        let Some(reading) = self.motion_sampler.read(sample) else {
            tracing::trace!("Dropped non-finite motion sample");
            self.diagnostics.dropped_samples += 1;
            return None;
        };

        let tick = self.state.clock.tick(sample.timestamp);
        if !(tick.delta > 0.0) {
            tracing::trace!("Dropped motion sample with delta {:.4}s", tick.delta);
            self.diagnostics.dropped_samples += 1;
            return None;
        }

        let elapsed = self.state.elapsed_time.max(tick.elapsed);
        self.accumulator.integrate(
            &mut self.state.acceleration,
            reading.net_acceleration,
            tick.delta,
            elapsed,
            self.state.speed.current,
        );
        self.state.reading = reading.acceleration;
        self.state.elapsed_time = elapsed;

        self.diagnostics.total_acceleration = reading.magnitude;
        self.diagnostics.net_acceleration = reading.net_acceleration;
        self.diagnostics.accumulated_acceleration = self.state.acceleration.accumulated;
        self.diagnostics.applied_samples += 1;

        Some(self.snapshot())
    }

    /// Issue a fix request if the poll interval has elapsed.
    pub fn due_fix_request(&mut self, now: Instant) -> Option<FixRequest> {
        if !self.state.is_running || !self.poll.poll(now) {
            return None;
        }

        Some(FixRequest {
            ticket: FixTicket {
                generation: self.generation,
                issued_at: now,
            },
            fix: self.sources.location.request_fix(),
        })
    }

    /// Apply the result of a fix request.
    ///
    /// Results for a run that has since ended are dropped with `Ok(None)`.
    /// Acquisition failures are returned as warnings and change nothing.
    pub fn on_position_fix(
        &mut self,
        ticket: FixTicket,
        result: Result<PositionFix, LocationError>,
    ) -> Result<Option<TelemetrySnapshot>, LocationError> {
        if !self.state.is_running || ticket.generation != self.generation {
            tracing::debug!(
                "Dropped stale position fix issued {:.1}s ago",
                ticket.issued_at.elapsed().as_secs_f64()
            );
            self.diagnostics.stale_fixes += 1;
            return Ok(None);
        }

        let fix = match result {
            Ok(fix) => fix,
            Err(e) => {
                tracing::warn!("Position fix failed: {}", e);
                self.diagnostics.failed_fixes += 1;
                return Err(e);
            }
        };

        let reading = self
            .position_sampler
            .read(&fix, self.state.previous_fix.as_ref());
        self.state.previous_fix = Some(fix);

        let elapsed = self.state.clock.elapsed_at(fix.timestamp);
        if elapsed > self.state.elapsed_time {
            self.state.elapsed_time = elapsed;
            self.state.acceleration.average =
                average_acceleration(self.state.acceleration.accumulated, elapsed);
        }

        match reading {
            SpeedReading::Valid(kmh) => {
                self.speed_stats.record(
                    &mut self.state.speed,
                    kmh,
                    fix.timestamp,
                    self.state.clock.start_time(),
                );
                self.diagnostics.accepted_speed_readings += 1;
            }
            SpeedReading::OutOfRange(kmh) => {
                tracing::trace!("Rejected speed reading of {:.1} km/h", kmh);
                self.diagnostics.rejected_speed_readings += 1;
            }
            SpeedReading::Unavailable => {
                tracing::trace!("Position fix carried no usable speed");
                self.diagnostics.rejected_speed_readings += 1;
            }
        }

        Ok(Some(self.snapshot()))
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot::from_state(&self.state, &self.calculator)
    }

    /// Current score record.
    pub fn record(&self) -> ScoreRecord {
        ScoreRecord::from(&self.snapshot())
    }

    /// Read-only view of the session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Counters and derived values.
    pub fn diagnostics(&self) -> &SessionDiagnostics {
        &self.diagnostics
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lifecycle state.
    pub fn status(&self) -> SessionStatus {
        if self.state.is_running {
            SessionStatus::Running
        } else {
            SessionStatus::Idle
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.state.is_running
    }
}
