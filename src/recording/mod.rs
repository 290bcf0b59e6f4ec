//! Recording module: score records handed to persistence consumers.

pub mod types;

pub use types::{ScoreRecord, SessionSummary};
