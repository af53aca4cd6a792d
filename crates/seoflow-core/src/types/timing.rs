//! Timing information for stages and capability calls.

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// Start and end timestamps of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// When the operation started.
    pub started_at: Timestamp,
    /// When the operation ended.
    pub ended_at: Timestamp,
}

impl Timing {
    /// Create a new timing with the given start and end timestamps.
    pub fn new(started_at: Timestamp, ended_at: Timestamp) -> Self {
        Self {
            started_at,
            ended_at,
        }
    }

    /// Create a timing that started at `started_at` and ends now.
    pub fn since(started_at: Timestamp) -> Self {
        Self::new(started_at, Timestamp::now())
    }

    /// Get the duration of the operation.
    pub fn duration(&self) -> SignedDuration {
        self.ended_at.duration_since(self.started_at)
    }

    /// Duration in whole milliseconds, clamped at zero.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.duration().as_millis()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_duration() {
        let start = Timestamp::now();
        let end = start + SignedDuration::from_millis(250);

        let timing = Timing::new(start, end);
        assert_eq!(timing.duration().as_millis(), 250);
        assert_eq!(timing.elapsed_ms(), 250);
    }

    #[test]
    fn test_negative_duration_clamps() {
        let end = Timestamp::now();
        let start = end + SignedDuration::from_secs(1);
        assert_eq!(Timing::new(start, end).elapsed_ms(), 0);
    }
}
