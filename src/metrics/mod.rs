//! Metrics module: acceleration accumulation, speed statistics and scoring.

pub mod accumulator;
pub mod score;
pub mod speed;

pub use accumulator::{average_acceleration, AccumulationPolicy, AccumulatorEngine, AccumulatorState};
pub use score::{ScoreCalculator, ScoringPolicy, DEFAULT_MAX_DEVIATION, MAX_SCORE, MIN_SCORE};
pub use speed::{SpeedAveraging, SpeedState, SpeedStats};
