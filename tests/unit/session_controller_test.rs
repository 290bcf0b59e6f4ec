//! Unit tests for the session controller lifecycle and motion integration.

use crate::support::{
    apply_speed, at, controller, controller_with, feed_constant, sources, BrokenGate, NoLocation,
    StubMotion,
};
use drivescore::sensors::{
    LocationError, Permission, PositionFix, SensorError, SensorSource, StaticPermission,
    TelemetrySample,
};
use drivescore::session::{
    SessionController, SessionError, SessionSources, SessionState, SessionStatus,
    TelemetrySnapshot,
};
use drivescore::storage::EngineConfig;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// A stationary device scores perfectly.
#[test]
fn test_stationary_device_scores_perfectly() {
    let mut ctrl = controller(EngineConfig::additive());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    let snapshot = feed_constant(&mut ctrl, t0, 9.8, 60.0, 600).unwrap();

    assert!((snapshot.elapsed_time - 10.0).abs() < 1e-6);
    assert!(snapshot.average_acceleration.abs() < 1e-9);
    assert!(snapshot.score > 99.99);
}

/// Sustained 4.7 m/s² of net acceleration drives the score to zero.
#[test]
fn test_sustained_acceleration_scores_zero() {
    let mut ctrl = controller(EngineConfig::additive());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    let snapshot = feed_constant(&mut ctrl, t0, 14.5, 60.0, 300).unwrap();

    assert!((snapshot.elapsed_time - 5.0).abs() < 1e-6);
    assert!((snapshot.average_acceleration - 4.7).abs() < 1e-6);
    assert!(snapshot.score < 0.01);
    assert_eq!(ctrl.diagnostics().applied_samples, 300);
}

/// Duplicate and out-of-order samples leave the state untouched.
#[test]
fn test_non_positive_delta_is_noop() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    ctrl.on_motion_sample(&TelemetrySample::new(0.3, -0.2, 10.4, at(t0, 1.0)))
        .unwrap();
    let before: SessionState = ctrl.state().clone();

    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(5.0, 5.0, 5.0, at(t0, 1.0)))
        .is_none());
    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(5.0, 5.0, 5.0, at(t0, 0.5)))
        .is_none());

    assert_eq!(ctrl.state(), &before);
    assert_eq!(ctrl.diagnostics().dropped_samples, 2);
}

/// Non-finite readings are dropped without touching the clock.
#[test]
fn test_non_finite_sample_is_dropped() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    let before = ctrl.state().clone();

    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(f64::NAN, 0.0, 9.8, at(t0, 0.5)))
        .is_none());
    assert_eq!(ctrl.state(), &before);

    // The next good sample still integrates from the start.
    let snapshot = ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 9.8, at(t0, 1.0)))
        .unwrap();
    assert!((snapshot.elapsed_time - 1.0).abs() < 1e-9);
}

/// Samples are ignored while idle.
#[test]
fn test_samples_ignored_while_idle() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();

    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 20.0, at(t0, 1.0)))
        .is_none());
    assert_eq!(ctrl.state(), &SessionState::default());
    assert_eq!(ctrl.status(), SessionStatus::Idle);
}

/// The smoothed policy divides by the current speed once one is known.
#[test]
fn test_smoothed_policy_uses_current_speed() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    apply_speed(&mut ctrl, t0, 2.0, 50.0).unwrap();
    let snapshot = ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 10.8, at(t0, 2.1)))
        .unwrap();

    let expected_acc = 1.0 * 2.1 / 50.0;
    assert!((ctrl.state().acceleration.accumulated - expected_acc).abs() < 1e-9);
    assert!((snapshot.average_acceleration - expected_acc / 2.1).abs() < 1e-9);
}

/// A fix that advances elapsed time also re-derives the average acceleration.
#[test]
fn test_fix_keeps_average_consistent_with_elapsed_time() {
    let mut ctrl = controller(EngineConfig::additive());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    let before = feed_constant(&mut ctrl, t0, 14.5, 60.0, 60).unwrap();
    assert!((before.average_acceleration - 4.7).abs() < 1e-6);

    let snapshot = apply_speed(&mut ctrl, t0, 2.0, 50.0).unwrap();
    let accumulated = ctrl.state().acceleration.accumulated;

    assert!((snapshot.elapsed_time - 2.0).abs() < 1e-9);
    assert!((snapshot.average_acceleration - accumulated / 2.0).abs() < 1e-9);
    assert!((snapshot.score - 50.0).abs() < 1e-6);
}

/// Reset zeroes every statistic and the snapshot scores 100.
#[test]
fn test_reset_returns_zero_snapshot() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    feed_constant(&mut ctrl, t0, 12.0, 60.0, 120);
    apply_speed(&mut ctrl, t0, 2.0, 80.0).unwrap();

    ctrl.reset(at(t0, 2.5));

    let expected = TelemetrySnapshot {
        score: 100.0,
        ..Default::default()
    };
    assert_eq!(ctrl.snapshot(), expected);
    assert!(ctrl.is_running());
    assert_eq!(ctrl.diagnostics().applied_samples, 0);
}

/// Reset while idle restores the initial state.
#[test]
fn test_reset_while_idle() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    feed_constant(&mut ctrl, t0, 12.0, 60.0, 60);
    ctrl.stop();

    ctrl.reset(at(t0, 2.0));

    assert_eq!(ctrl.state(), &SessionState::default());
}

/// A reset mid-run restarts the clock at the reset instant.
#[test]
fn test_reset_while_running_reanchors_clock() {
    let mut ctrl = controller(EngineConfig::additive());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    feed_constant(&mut ctrl, t0, 12.0, 60.0, 120);

    ctrl.reset(at(t0, 3.0));
    let anchored = ctrl.state().clone();
    assert_eq!(anchored.clock.start_time(), Some(at(t0, 3.0)));

    // A sample at the reset instant is dropped and changes nothing.
    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 9.8, at(t0, 3.0)))
        .is_none());
    assert_eq!(ctrl.state(), &anchored);

    let snapshot = ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 9.8, at(t0, 3.5)))
        .unwrap();
    assert!((snapshot.elapsed_time - 0.5).abs() < 1e-9);
}

/// Stop freezes statistics and cancels the motion subscription.
#[test]
fn test_stop_freezes_and_unsubscribes() {
    let motion = StubMotion::new();
    let sink = Arc::clone(&motion.sink);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut ctrl = SessionController::new(&EngineConfig::default(), sources(motion), tx);
    let t0 = Instant::now();

    ctrl.start(t0).unwrap();
    let delivered = sink
        .lock()
        .unwrap()
        .as_ref()
        .unwrap()
        .deliver(TelemetrySample::new(0.0, 0.0, 9.8, at(t0, 0.1)));
    assert!(delivered);
    assert!(rx.try_recv().is_ok());
    feed_constant(&mut ctrl, t0, 11.0, 60.0, 60);

    ctrl.stop();
    let frozen = ctrl.snapshot();

    let delivered = sink
        .lock()
        .unwrap()
        .as_ref()
        .unwrap()
        .deliver(TelemetrySample::new(0.0, 0.0, 9.8, at(t0, 2.0)));
    assert!(!delivered);
    assert!(ctrl
        .on_motion_sample(&TelemetrySample::new(0.0, 0.0, 30.0, at(t0, 2.0)))
        .is_none());
    assert_eq!(ctrl.snapshot(), frozen);
    assert_eq!(ctrl.status(), SessionStatus::Idle);

    // Stopping again is a no-op.
    ctrl.stop();
    assert_eq!(ctrl.snapshot(), frozen);
}

/// A fix resolving after stop does not touch the speed statistics.
#[test]
fn test_fix_after_stop_is_dropped() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();

    let request = ctrl.due_fix_request(at(t0, 2.0)).unwrap();
    ctrl.stop();

    let fix = PositionFix::with_speed(25.0, 0.0, 0.0, at(t0, 2.5));
    assert_eq!(ctrl.on_position_fix(request.ticket, Ok(fix)), Ok(None));

    let snapshot = ctrl.snapshot();
    assert_eq!(snapshot.current_speed, 0.0);
    assert_eq!(snapshot.top_speed, 0.0);
    assert_eq!(snapshot.average_speed, 0.0);
    assert_eq!(ctrl.diagnostics().stale_fixes, 1);
}

/// Restarting discards the previous run's statistics.
#[test]
fn test_start_while_running_restarts() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    feed_constant(&mut ctrl, t0, 13.0, 60.0, 60);
    let first_id = ctrl.diagnostics().session_id;

    ctrl.start(at(t0, 5.0)).unwrap();

    assert!(ctrl.is_running());
    assert_eq!(ctrl.snapshot().elapsed_time, 0.0);
    assert_ne!(ctrl.diagnostics().session_id, first_id);
}

/// Toggle alternates between running and idle.
#[test]
fn test_toggle() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();

    ctrl.toggle(t0).unwrap();
    assert_eq!(ctrl.status(), SessionStatus::Running);
    ctrl.toggle(at(t0, 1.0)).unwrap();
    assert_eq!(ctrl.status(), SessionStatus::Idle);
    assert!(ctrl.diagnostics().stopped_at.is_some());
}

/// Missing capabilities keep the session idle.
#[test]
fn test_start_requires_sensors() {
    let mut motion = StubMotion::new();
    motion.available = false;
    let mut ctrl = controller_with(EngineConfig::default(), sources(motion));
    assert_eq!(ctrl.start(Instant::now()), Err(SessionError::SensorUnavailable));
    assert!(!ctrl.is_running());

    let no_location = SessionSources::new(
        SensorSource::Real(Box::new(StubMotion::new())),
        Arc::new(NoLocation),
    );
    let mut ctrl = controller_with(EngineConfig::default(), no_location);
    assert_eq!(ctrl.start(Instant::now()), Err(SessionError::SensorUnavailable));
}

/// A failed motion subscription surfaces as a sensor error.
#[test]
fn test_subscription_failure() {
    let mut motion = StubMotion::new();
    motion.fail_subscribe = true;
    let mut ctrl = controller_with(EngineConfig::default(), sources(motion));

    let result = ctrl.start(Instant::now());
    assert!(matches!(
        result,
        Err(SessionError::Sensor(SensorError::SubscriptionFailed(_)))
    ));
    assert!(!ctrl.is_running());
}

/// A denied permission blocks start without mutating state.
#[tokio::test]
async fn test_permission_denied_blocks_start() {
    let denied = sources(StubMotion::new())
        .with_permission(Arc::new(StaticPermission(Permission::Denied)));
    let mut ctrl = controller_with(EngineConfig::default(), denied);

    assert_eq!(ctrl.authorize().await, Err(SessionError::PermissionDenied));
    assert_eq!(ctrl.start(Instant::now()), Err(SessionError::PermissionDenied));
    assert_eq!(ctrl.state(), &SessionState::default());

    // The answer is cached.
    assert_eq!(ctrl.authorize().await, Err(SessionError::PermissionDenied));
}

/// A failing prompt counts as a denial.
#[tokio::test]
async fn test_permission_prompt_failure() {
    let broken = sources(StubMotion::new()).with_permission(Arc::new(BrokenGate));
    let mut ctrl = controller_with(EngineConfig::default(), broken);

    assert!(matches!(
        ctrl.authorize().await,
        Err(SessionError::Permission(_))
    ));
    assert_eq!(ctrl.start(Instant::now()), Err(SessionError::PermissionDenied));
}

/// Granted permission, or no gate at all, allows start.
#[tokio::test]
async fn test_permission_granted() {
    let granted = sources(StubMotion::new())
        .with_permission(Arc::new(StaticPermission(Permission::Granted)));
    let mut ctrl = controller_with(EngineConfig::default(), granted);
    assert_eq!(ctrl.authorize().await, Ok(()));
    assert!(ctrl.start(Instant::now()).is_ok());

    let mut ctrl = controller(EngineConfig::default());
    assert_eq!(ctrl.authorize().await, Ok(()));
}

/// Fix failures are reported but never stop the session.
#[test]
fn test_fix_failure_is_a_warning() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    apply_speed(&mut ctrl, t0, 2.0, 40.0).unwrap();

    let request = ctrl.due_fix_request(at(t0, 4.0)).unwrap();
    let result = ctrl.on_position_fix(request.ticket, Err(LocationError::Timeout));

    assert_eq!(result, Err(LocationError::Timeout));
    assert!(ctrl.is_running());
    assert!((ctrl.snapshot().current_speed - 40.0).abs() < 1e-9);
    assert_eq!(ctrl.diagnostics().failed_fixes, 1);
}

/// The record mirrors the snapshot.
#[test]
fn test_record_matches_snapshot() {
    let mut ctrl = controller(EngineConfig::default());
    let t0 = Instant::now();
    ctrl.start(t0).unwrap();
    feed_constant(&mut ctrl, t0, 10.5, 60.0, 180);
    apply_speed(&mut ctrl, t0, 2.0, 60.0).unwrap();
    ctrl.stop();

    let snapshot = ctrl.snapshot();
    let record = ctrl.record();
    assert_eq!(record.score, snapshot.score);
    assert_eq!(record.time_seconds, snapshot.elapsed_time);
    assert_eq!(record.top_speed, snapshot.top_speed);
    assert_eq!(record.average_speed, snapshot.average_speed);
}
