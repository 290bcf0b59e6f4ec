//! DriveScore - Driving Smoothness Scoring Engine
//!
//! Fuses a high-rate accelerometer stream with low-rate position fixes during
//! a timed driving session. Produces live motion statistics (elapsed time,
//! average acceleration, current/top/average speed) and a bounded driver
//! score, plus a final record for score persistence.

pub mod metrics;
pub mod recording;
pub mod sensors;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use metrics::score::ScoringPolicy;
pub use recording::types::ScoreRecord;
pub use sensors::motion::SensorSource;
pub use session::controller::SessionController;
pub use session::driver::SessionDriver;
pub use session::state::TelemetrySnapshot;
pub use storage::config::AppConfig;
