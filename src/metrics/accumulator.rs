//! Net-acceleration accumulator.
//!
//! Integrates net acceleration over time into a running statistic and derives
//! the session's average acceleration from it. The policy is fixed for the
//! lifetime of a controller so the two variants never mix inside one session.

use serde::{Deserialize, Serialize};

/// Default exponential decay applied to the accumulator on every sample.
pub const DEFAULT_SMOOTHING_FACTOR: f64 = 0.7;

/// Default minimum divisor for speed normalization (km/h).
pub const DEFAULT_SPEED_FLOOR: f64 = 0.5;

/// How net acceleration is folded into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccumulationPolicy {
    /// `acc = acc * smoothing_factor + net * dt / max(speed_floor, speed)`
    Smoothed {
        smoothing_factor: f64,
        speed_floor: f64,
    },
    /// `acc = acc + net * dt`
    Additive,
}

impl Default for AccumulationPolicy {
    fn default() -> Self {
        AccumulationPolicy::Smoothed {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            speed_floor: DEFAULT_SPEED_FLOOR,
        }
    }
}

impl AccumulationPolicy {
    /// Name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            AccumulationPolicy::Smoothed { .. } => "smoothed",
            AccumulationPolicy::Additive => "additive",
        }
    }

    /// Check parameter ranges. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            AccumulationPolicy::Smoothed {
                smoothing_factor,
                speed_floor,
            } => {
                if !(smoothing_factor > 0.0 && smoothing_factor < 1.0) {
                    return Err(format!(
                        "smoothing_factor must be in (0, 1), got {}",
                        smoothing_factor
                    ));
                }
                if !(speed_floor > 0.0) || !speed_floor.is_finite() {
                    return Err(format!("speed_floor must be positive, got {}", speed_floor));
                }
                Ok(())
            }
            AccumulationPolicy::Additive => Ok(()),
        }
    }
}

/// Accumulator fields of the session state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatorState {
    /// Running accumulated acceleration
    pub accumulated: f64,
    /// Accumulated acceleration divided by elapsed time
    pub average: f64,
}

/// Applies an [`AccumulationPolicy`] to an [`AccumulatorState`].
#[derive(Debug, Clone, Copy)]
pub struct AccumulatorEngine {
    policy: AccumulationPolicy,
}

impl AccumulatorEngine {
    /// Create an engine with the given policy.
    pub fn new(policy: AccumulationPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    pub fn policy(&self) -> AccumulationPolicy {
        self.policy
    }

    /// Integrate one sample.
    ///
    /// Returns `false` without touching `state` when `delta` is not positive or
    /// `net_acceleration` is not finite.
    pub fn integrate(
        &self,
        state: &mut AccumulatorState,
        net_acceleration: f64,
        delta: f64,
        elapsed: f64,
        current_speed: f64,
    ) -> bool {
        if !(delta > 0.0) || !net_acceleration.is_finite() {
            return false;
        }

        state.accumulated = match self.policy {
            AccumulationPolicy::Smoothed {
                smoothing_factor,
                speed_floor,
            } => {
                state.accumulated * smoothing_factor
                    + net_acceleration * delta / speed_floor.max(current_speed)
            }
            AccumulationPolicy::Additive => state.accumulated + net_acceleration * delta,
        };
        state.average = average_acceleration(state.accumulated, elapsed);
        true
    }
}

impl Default for AccumulatorEngine {
    fn default() -> Self {
        Self::new(AccumulationPolicy::default())
    }
}

/// Average acceleration over `elapsed` seconds; zero before any time has passed.
pub fn average_acceleration(accumulated: f64, elapsed: f64) -> f64 {
    if elapsed > 0.0 {
        accumulated / elapsed
    } else {
        0.0
    }
}
