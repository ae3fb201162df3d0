//! Reconnect options and exponential backoff schedule.

use std::time::Duration;

/// Options accepted by [`crate::Client::connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Consecutive failures tolerated before the client gives up. Zero means
    /// the first failure is terminal.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect after a failure.
    pub reconnect_delay: Duration,
    /// Ceiling for the doubled delay.
    pub max_reconnect_delay: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
            max_reconnect_delay: Duration::from_millis(30_000),
        }
    }
}

/// Exponential backoff schedule.
///
/// The delay after the k-th consecutive failure is
/// `min(reconnect_delay * 2^(k-1), max_reconnect_delay)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
}

impl Backoff {
    pub fn new(options: &StreamOptions) -> Self {
        Self {
            base_delay: options.reconnect_delay,
            max_delay: options.max_reconnect_delay,
        }
    }

    /// Delay to wait after `failures` consecutive failures (`failures >= 1`).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        let factor = 2_u32.saturating_pow(exponent);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff(initial_ms: u64, max_ms: u64) -> Backoff {
        Backoff::new(&StreamOptions {
            max_reconnect_attempts: 10,
            reconnect_delay: Duration::from_millis(initial_ms),
            max_reconnect_delay: Duration::from_millis(max_ms),
        })
    }

    #[test]
    fn test_delay_doubles_per_failure() {
        let policy = backoff(1000, 60_000);

        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = backoff(1000, 8000);

        assert_eq!(policy.delay_for(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(8000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(8000));
    }

    #[test]
    fn test_initial_delay_above_ceiling_is_clamped() {
        let policy = backoff(10_000, 2000);
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
    }

    #[test]
    fn test_default_options() {
        let options = StreamOptions::default();
        assert_eq!(options.max_reconnect_attempts, 5);
        assert_eq!(options.reconnect_delay, Duration::from_secs(1));
        assert_eq!(options.max_reconnect_delay, Duration::from_secs(30));
    }
}
