//! Recording types handed to score persistence.

use crate::session::state::{SessionDiagnostics, TelemetrySnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final result of one session, in the shape the score store expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Driver score in `[0, 100]`
    pub score: f64,
    /// Session length in seconds
    pub time_seconds: f64,
    /// km/h
    pub top_speed: f64,
    /// km/h
    pub average_speed: f64,
}

impl From<&TelemetrySnapshot> for ScoreRecord {
    fn from(snapshot: &TelemetrySnapshot) -> Self {
        Self {
            score: snapshot.score,
            time_seconds: snapshot.elapsed_time,
            top_speed: snapshot.top_speed,
            average_speed: snapshot.average_speed,
        }
    }
}

impl ScoreRecord {
    /// Format the duration as MM:SS.
    pub fn formatted_time(&self) -> String {
        let total = self.time_seconds.max(0.0) as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

/// A score record together with the identity of the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Run identifier
    pub session_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended, if it has
    pub stopped_at: Option<DateTime<Utc>>,
    /// Motion samples applied during the run
    pub applied_samples: u64,
    /// Valid speed readings during the run
    pub speed_readings: u64,
    /// Final result
    pub record: ScoreRecord,
}

impl SessionSummary {
    /// Build a summary from the controller's diagnostics. Returns `None` if no
    /// run has been started yet.
    pub fn from_diagnostics(diagnostics: &SessionDiagnostics, record: ScoreRecord) -> Option<Self> {
        Some(Self {
            session_id: diagnostics.session_id?,
            started_at: diagnostics.started_at?,
            stopped_at: diagnostics.stopped_at,
            applied_samples: diagnostics.applied_samples,
            speed_readings: diagnostics.accepted_speed_readings,
            record,
        })
    }
}
