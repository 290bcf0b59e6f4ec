//! Driver score policies.
//!
//! Several non-equivalent formulas have been used for the driver score; each
//! one is kept as a named policy so it can be selected and tested on its own.
//! Every policy maps into `[0, 100]`.

use serde::{Deserialize, Serialize};

/// Largest net acceleration deviation expected from a smoothly driven vehicle (m/s²).
pub const DEFAULT_MAX_DEVIATION: f64 = 4.7;

/// Upper score bound.
pub const MAX_SCORE: f64 = 100.0;

/// Lower score bound.
pub const MIN_SCORE: f64 = 0.0;

/// Formula mapping average acceleration to a score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// `100 - |avg| / max_deviation * 100`
    GravityDeviation { max_deviation: f64 },
    /// `100 - 10 * avg`
    Linear,
    /// `100 - 100 * avg`
    Percent,
    /// `|100 - 100 * avg|`
    AbsolutePercent,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        ScoringPolicy::GravityDeviation {
            max_deviation: DEFAULT_MAX_DEVIATION,
        }
    }
}

impl ScoringPolicy {
    /// Name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ScoringPolicy::GravityDeviation { .. } => "gravity_deviation",
            ScoringPolicy::Linear => "linear",
            ScoringPolicy::Percent => "percent",
            ScoringPolicy::AbsolutePercent => "absolute_percent",
        }
    }

    /// Score for the given average acceleration, clamped to `[0, 100]`.
    ///
    /// Non-finite input scores zero.
    pub fn score(&self, average_acceleration: f64) -> f64 {
        if !average_acceleration.is_finite() {
            return MIN_SCORE;
        }

        let raw = match *self {
            ScoringPolicy::GravityDeviation { max_deviation } => {
                if max_deviation > 0.0 {
                    MAX_SCORE - average_acceleration.abs() / max_deviation * MAX_SCORE
                } else if average_acceleration == 0.0 {
                    MAX_SCORE
                } else {
                    MIN_SCORE
                }
            }
            ScoringPolicy::Linear => MAX_SCORE - 10.0 * average_acceleration,
            ScoringPolicy::Percent => MAX_SCORE - MAX_SCORE * average_acceleration,
            ScoringPolicy::AbsolutePercent => (MAX_SCORE - MAX_SCORE * average_acceleration).abs(),
        };

        if raw.is_nan() {
            MIN_SCORE
        } else {
            raw.clamp(MIN_SCORE, MAX_SCORE)
        }
    }

    /// Check parameter ranges. Returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ScoringPolicy::GravityDeviation { max_deviation }
                if !(max_deviation > 0.0) || !max_deviation.is_finite() =>
            {
                Err(format!(
                    "max_deviation must be positive, got {}",
                    max_deviation
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Maps snapshots to a driver score with a fixed policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalculator {
    policy: ScoringPolicy,
}

impl ScoreCalculator {
    /// Create a calculator for `policy`.
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Score for the given average acceleration.
    pub fn score(&self, average_acceleration: f64) -> f64 {
        self.policy.score(average_acceleration)
    }
}
