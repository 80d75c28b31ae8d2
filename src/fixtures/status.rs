use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// How long before kick-off a fixture counts as started.
pub const LOCK_WINDOW_MINUTES: i64 = 2;

/// Lifecycle of a fixture, derived from the clock. No cancellation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FixtureStatus {
    NotStarted,
    InProgress,
    Finished,
}

impl FixtureStatus {
    /// Status of a fixture kicking off at `kickoff`, as seen at `now`.
    ///
    /// Monotonic in `now`: not started until two minutes before kick-off,
    /// in progress until kick-off, finished from then on.
    pub fn at(kickoff: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < kickoff - Duration::minutes(LOCK_WINDOW_MINUTES) {
            FixtureStatus::NotStarted
        } else if now < kickoff {
            FixtureStatus::InProgress
        } else {
            FixtureStatus::Finished
        }
    }

    /// Predictions are only taken before the lock window opens.
    pub fn accepts_predictions(self) -> bool {
        self == FixtureStatus::NotStarted
    }

    pub fn label(self) -> &'static str {
        match self {
            FixtureStatus::NotStarted => "not started",
            FixtureStatus::InProgress => "in progress",
            FixtureStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
