//! # Fibonacci Backoff
//!
//! Polling intervals for waiting on CVP tasks. The interval grows along the
//! Fibonacci sequence (1s, 1s, 2s, 3s, 5s, 8s, ...) up to a cap, which keeps
//! early polls quick without hammering CVP during long image upgrades.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each interval is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// First interval, restored by `reset`
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next interval and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Restart the sequence, e.g. after progress was observed
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

impl Default for FibonacciBackoff {
    /// 1s up to 30s, the task polling default
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        let sequence: Vec<u64> = (0..8).map(|_| secs(&mut backoff)).collect();
        assert_eq!(sequence, vec![1, 1, 2, 3, 5, 8, 10, 10]);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::default();

        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
        assert_eq!(secs(&mut backoff), 3);

        backoff.reset();

        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
    }

    #[test]
    fn test_sub_second_intervals() {
        let mut backoff = FibonacciBackoff::new(Duration::from_millis(10), Duration::from_millis(25));
        let sequence: Vec<u128> = (0..5).map(|_| backoff.next_backoff().as_millis()).collect();
        assert_eq!(sequence, vec![10, 10, 20, 25, 25]);
    }
}
