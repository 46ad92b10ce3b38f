//! Driver step bookkeeping

use crate::reactor::ReactorError;
use eventsock_core::TransportKind;
use std::time::{Duration, Instant};

/// Result of one call to `update`
#[derive(Debug)]
pub struct StepSummary {
    /// Completions handled by the non-blocking drain
    pub handled: usize,
    /// Completions handled by the blocking wait (0 or 1)
    pub waited: usize,
    pub transport: TransportKind,
    pub error: Option<ReactorError>,
    /// Time since the previous step of the same server
    pub elapsed: Duration,
}

impl StepSummary {
    pub fn total(&self) -> usize {
        self.waited + self.handled
    }

    /// Nothing completed during this step
    pub fn is_idle(&self) -> bool {
        self.total() == 0 && self.error.is_none()
    }
}

/// Per-server step clock
#[derive(Debug)]
pub struct StepClock {
    previous: Instant,
}

impl StepClock {
    pub fn new() -> Self {
        Self {
            previous: Instant::now(),
        }
    }

    /// Time since construction or the previous tick
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.previous);
        self.previous = now;
        elapsed
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_measures_forward() {
        let mut clock = StepClock::new();
        std::thread::sleep(Duration::from_millis(10));
        let first = clock.tick();
        assert!(first >= Duration::from_millis(10));

        // Each tick measures from the previous one, not from construction.
        let second = clock.tick();
        assert!(second < first);
    }

    #[test]
    fn test_clocks_are_independent() {
        let mut a = StepClock::new();
        std::thread::sleep(Duration::from_millis(10));
        let mut b = StepClock::new();

        assert!(a.tick() >= Duration::from_millis(10));
        assert!(b.tick() < Duration::from_millis(10));
    }

    #[test]
    fn test_summary_totals() {
        let summary = StepSummary {
            handled: 2,
            waited: 1,
            transport: TransportKind::Stream,
            error: None,
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_idle());

        let idle = StepSummary {
            handled: 0,
            waited: 0,
            ..summary
        };
        assert!(idle.is_idle());
    }
}
