//! Wall-Clock Timing
//!
//! Durations of external processes are measured from spawn to exit with a
//! monotonic clock, independent of any resource sampling cadence.

use std::time::{Duration, Instant};

/// Timer for measuring one process execution
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time since start
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Instant the timer was started at
    pub fn started_at(&self) -> Instant {
        self.start
    }
}

/// A fixed point in time after which supervision gives up
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` after `timer` started
    pub fn after(timer: &Timer, budget: Duration) -> Self {
        Self {
            at: timer.started_at() + budget,
            budget,
        }
    }

    /// Total time allowed
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Whether the deadline has passed
    pub fn expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.elapsed();

        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_deadline_expiry() {
        let timer = Timer::start();
        let deadline = Deadline::after(&timer, Duration::from_millis(20));
        assert!(!deadline.expired());
        assert_eq!(deadline.budget(), Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(30));
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }
}
