//! Reconnection backoff policy.

use std::time::Duration;

use crate::config::ReconnectConfig;

/// Capped exponential backoff with an attempt limit.
///
/// The delay for attempt `n` (0-based) is `initial * 2^n`, capped at
/// `max_delay`. Once `max_attempts` consecutive failures have occurred the
/// policy reports exhaustion; `max_attempts == 0` means retry forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    /// Create a policy with explicit parameters.
    #[must_use]
    pub fn new(initial: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max_delay,
            max_attempts,
        }
    }

    /// Whether `failures` consecutive failures exhaust the policy.
    #[must_use]
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures >= self.max_attempts
    }

    /// Delay before retry attempt `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // 2^attempt saturates well past any sane max_delay; clamp the shift
        // so the multiplication cannot overflow.
        let shift = attempt.min(16);
        let factor = 1u32 << shift;
        self.initial
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// The configured attempt limit (0 = unlimited).
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl From<ReconnectConfig> for ReconnectPolicy {
    fn from(config: ReconnectConfig) -> Self {
        Self::new(
            Duration::from_secs(config.initial_delay_secs),
            Duration::from_secs(config.max_delay_secs),
            config.max_attempts,
        )
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectConfig::default().into()
    }
}
