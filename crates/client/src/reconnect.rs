//! Retry pacing for the push channel.
//!
//! A dropped connection is retried after a delay that doubles on every
//! failed or short-lived session, up to a ceiling. A session that stayed
//! up for [`STABLE_SESSION`] counts as healthy, so the next drop starts
//! again from the floor instead of inheriting a long delay from an outage
//! hours earlier.

use std::time::Duration;

/// Sessions at least this long reset the backoff.
pub const STABLE_SESSION: Duration = Duration::from_secs(10);

const FLOOR: Duration = Duration::from_secs(1);
const CEILING: Duration = Duration::from_secs(30);

/// Delay schedule between push reconnect attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(FLOOR, CEILING)
    }
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    /// Delay to wait before the next attempt. Each call doubles the one
    /// after it, clamped to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Record how long an established session lasted before it dropped.
    pub fn session_ended(&mut self, lasted: Duration) {
        if lasted >= STABLE_SESSION {
            self.current = self.floor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays(backoff: &mut Backoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_secs()).collect()
    }

    #[test]
    fn failed_attempts_double_up_to_ceiling() {
        let mut backoff = Backoff::default();
        assert_eq!(delays(&mut backoff, 7), vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn stable_session_restarts_from_floor() {
        let mut backoff = Backoff::default();
        delays(&mut backoff, 6);

        backoff.session_ended(Duration::from_secs(3600));
        assert_eq!(delays(&mut backoff, 3), vec![1, 2, 4]);
    }

    #[test]
    fn flapping_session_keeps_backing_off() {
        let mut backoff = Backoff::default();
        delays(&mut backoff, 3);

        backoff.session_ended(STABLE_SESSION - Duration::from_millis(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
    }

    #[test]
    fn session_exactly_at_threshold_counts_as_stable() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(2));
        delays(&mut backoff, 4);

        backoff.session_ended(STABLE_SESSION);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
