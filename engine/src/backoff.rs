//! Reconnect backoff schedule.
//!
//! A fixed escalating table indexed by consecutive-failure count, clamped
//! to a ceiling. The count resets to zero on a successful open; a manual
//! refresh uses delay zero without touching the count.

use std::time::Duration;

/// Escalating delay table with a ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    steps: Vec<Duration>,
    ceiling: Duration,
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            steps: vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
            ceiling: Duration::from_secs(15),
        }
    }
}

impl BackoffSchedule {
    /// Create a schedule from explicit steps and a ceiling.
    pub fn new(steps: Vec<Duration>, ceiling: Duration) -> Self {
        Self { steps, ceiling }
    }

    /// Delay before the next attempt after `failures` consecutive
    /// failures. Zero failures means reconnect immediately.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        self.steps
            .get(failures as usize - 1)
            .copied()
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}
