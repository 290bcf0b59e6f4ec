//! Session state, the snapshot projected from it, and diagnostics.

use crate::metrics::{AccumulatorState, ScoreCalculator, SpeedState};
use crate::sensors::{PositionFix, Vector3};
use crate::session::clock::SessionClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutable state of one session. Owned exclusively by the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Whether samples are being applied
    pub is_running: bool,
    /// Start and previous-sample anchors
    pub clock: SessionClock,
    /// Last applied raw acceleration (m/s²)
    pub reading: Vector3,
    /// Seconds since the session started
    pub elapsed_time: f64,
    /// Accumulated and average acceleration
    pub acceleration: AccumulatorState,
    /// Current, top and average speed (km/h)
    pub speed: SpeedState,
    /// Last successful fix, kept for speed derivation
    pub previous_fix: Option<PositionFix>,
}

impl SessionState {
    /// Zero every statistic and anchor. `is_running` is left alone.
    pub fn clear_statistics(&mut self) {
        *self = Self {
            is_running: self.is_running,
            ..Default::default()
        };
    }
}

/// Read-only projection of the session state after an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Seconds since the session started
    pub elapsed_time: f64,
    /// Net acceleration per second of session (m/s²)
    pub average_acceleration: f64,
    /// km/h
    pub current_speed: f64,
    /// km/h
    pub top_speed: f64,
    /// km/h
    pub average_speed: f64,
    /// Driver score in `[0, 100]`
    pub score: f64,
}

impl TelemetrySnapshot {
    /// Derive a snapshot from `state`, scoring it with `calculator`.
    pub fn from_state(state: &SessionState, calculator: &ScoreCalculator) -> Self {
        Self {
            x: state.reading.x,
            y: state.reading.y,
            z: state.reading.z,
            elapsed_time: state.elapsed_time,
            average_acceleration: state.acceleration.average,
            current_speed: state.speed.current,
            top_speed: state.speed.top,
            average_speed: state.speed.average,
            score: calculator.score(state.acceleration.average),
        }
    }
}

/// Counters and derived values kept beside the session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionDiagnostics {
    /// Identifier of the current or last run
    pub session_id: Option<Uuid>,
    /// Wall-clock start of the current or last run
    pub started_at: Option<DateTime<Utc>>,
    /// Wall-clock end of the last run
    pub stopped_at: Option<DateTime<Utc>>,
    /// Magnitude of the last applied sample (m/s²)
    pub total_acceleration: f64,
    /// Net acceleration of the last applied sample (m/s²)
    pub net_acceleration: f64,
    /// Accumulator value after the last applied sample
    pub accumulated_acceleration: f64,
    /// Motion samples folded into the accumulator
    pub applied_samples: u64,
    /// Motion samples rejected (non-finite or non-positive delta)
    pub dropped_samples: u64,
    /// Speed readings inside the validity range
    pub accepted_speed_readings: u64,
    /// Fixes that produced no valid speed
    pub rejected_speed_readings: u64,
    /// Fix requests that failed
    pub failed_fixes: u64,
    /// Fix completions dropped because the run had ended
    pub stale_fixes: u64,
    /// Motion source kind ("real" or "simulated")
    pub motion_source: &'static str,
    /// Active accumulation policy name
    pub accumulation_policy: &'static str,
    /// Active scoring policy name
    pub scoring_policy: &'static str,
    /// Active speed averaging name
    pub speed_averaging: &'static str,
}

impl SessionDiagnostics {
    /// Zero the per-run counters, keeping identity and policy names.
    pub fn clear_counters(&mut self) {
        self.total_acceleration = 0.0;
        self.net_acceleration = 0.0;
        self.accumulated_acceleration = 0.0;
        self.applied_samples = 0;
        self.dropped_samples = 0;
        self.accepted_speed_readings = 0;
        self.rejected_speed_readings = 0;
        self.failed_fixes = 0;
        self.stale_fixes = 0;
    }
}
