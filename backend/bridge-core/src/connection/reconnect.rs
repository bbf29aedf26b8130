//! Exponential reconnect delays.

use crate::config::BridgeConfig;

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;

pub const RECONNECT_INITIAL_DELAY: Duration = Duration::from_millis(1_000);
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_millis(30_000);
const RECONNECT_MULTIPLIER: f64 = 2.0;

/// `delay(n) = min(2^n * 1s, 30s)` with an optional attempt ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: RECONNECT_INITIAL_DELAY,
            max_delay: RECONNECT_MAX_DELAY,
            multiplier: RECONNECT_MULTIPLIER,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::default().with_max_attempts(config.reconnect_limit())
    }

    /// `None` retries forever.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay.max(initial_delay);
        self
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay before the attempt that follows `attempt` earlier ones (0-indexed).
    ///
    /// Jitter is disabled so the schedule is exactly reproducible.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let mut backoff = ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut delay = self.initial_delay;
        for _ in 0..=attempt {
            match backoff.next_backoff() {
                Some(next) => delay = next,
                None => break,
            }
            if delay >= self.max_delay {
                break;
            }
        }

        // Whole milliseconds, matching the configured granularity.
        Duration::from_millis(delay.min(self.max_delay).as_millis() as u64)
    }

    /// True once `attempts` scheduled reconnects have used up the ceiling.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}
