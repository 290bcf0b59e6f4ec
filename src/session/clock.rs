//! Session clock: elapsed time and per-sample deltas.

use std::time::Instant;

/// Timing of one motion sample relative to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// Seconds since the session started
    pub elapsed: f64,
    /// Seconds since the previous applied sample; not positive for
    /// duplicated or out-of-order samples
    pub delta: f64,
}

/// Tracks the session start and the last applied sample time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionClock {
    start_time: Option<Instant>,
    previous_sample_time: Option<Instant>,
}

impl SessionClock {
    /// Anchor the clock at `now`. The first sample integrates from here.
    pub fn start(&mut self, now: Instant) {
        self.start_time = Some(now);
        self.previous_sample_time = Some(now);
    }

    /// Forget both anchors.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whether the clock has been anchored.
    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }

    /// Instant the session started, if any.
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// Seconds between the start and `now`. Zero when not started or when
    /// `now` precedes the start.
    pub fn elapsed_at(&self, now: Instant) -> f64 {
        self.start_time
            .map(|start| now.saturating_duration_since(start).as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Time a sample taken at `at`.
    ///
    /// The previous-sample anchor only advances when the delta is positive, so
    /// a rejected sample leaves the clock untouched. A clock that was never
    /// started reports zeros.
    pub fn tick(&mut self, at: Instant) -> ClockTick {
        let delta = match self.previous_sample_time {
            Some(previous) if at >= previous => at.duration_since(previous).as_secs_f64(),
            Some(previous) => -previous.duration_since(at).as_secs_f64(),
            None => 0.0,
        };

        if delta > 0.0 {
            self.previous_sample_time = Some(at);
        }

        ClockTick {
            elapsed: self.elapsed_at(at),
            delta,
        }
    }
}
