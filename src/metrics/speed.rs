//! Current, top and average speed from valid readings.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How the average speed weighs individual readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedAveraging {
    /// Each reading weighted by the interval since the previous valid reading
    #[default]
    TimeWeighted,
    /// Plain arithmetic mean
    Arithmetic,
}

impl SpeedAveraging {
    /// Name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            SpeedAveraging::TimeWeighted => "time_weighted",
            SpeedAveraging::Arithmetic => "arithmetic",
        }
    }
}

/// Speed fields of the session state. All speeds in km/h.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedState {
    /// Last valid reading
    pub current: f64,
    /// Highest valid reading this session
    pub top: f64,
    /// Weighted mean of valid readings
    pub average: f64,
    /// Sum of `speed * weight`
    pub accumulated: f64,
    /// Sum of weights (reading count under arithmetic averaging)
    pub weight: f64,
    /// When the last valid reading was taken
    pub last_valid_at: Option<Instant>,
}

/// Folds validated speed readings into a [`SpeedState`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedStats {
    averaging: SpeedAveraging,
}

impl SpeedStats {
    /// Create stats with the given averaging mode.
    pub fn new(averaging: SpeedAveraging) -> Self {
        Self { averaging }
    }

    /// Averaging mode in use.
    pub fn averaging(&self) -> SpeedAveraging {
        self.averaging
    }

    /// Record a reading that already passed the validity gate.
    ///
    /// `session_start` weights the first reading of a session.
    pub fn record(
        &self,
        state: &mut SpeedState,
        speed_kmh: f64,
        at: Instant,
        session_start: Option<Instant>,
    ) {
        let weight = match self.averaging {
            SpeedAveraging::Arithmetic => 1.0,
            SpeedAveraging::TimeWeighted => state
                .last_valid_at
                .or(session_start)
                .map(|since| at.saturating_duration_since(since).as_secs_f64())
                .unwrap_or(0.0),
        };

        state.current = speed_kmh;
        state.top = state.top.max(speed_kmh);
        state.accumulated += speed_kmh * weight;
        state.weight += weight;
        state.average = if state.weight > 0.0 {
            state.accumulated / state.weight
        } else {
            speed_kmh
        };
        state.last_valid_at = Some(match state.last_valid_at {
            Some(last) if last > at => last,
            _ => at,
        });
    }
}
