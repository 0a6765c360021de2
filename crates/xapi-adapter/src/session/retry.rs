/*
[INPUT]:  Retry counters
[OUTPUT]: Backoff delays for reconnect attempts
[POS]:    Session layer - reconnect policy used by the driver loop
[UPDATE]: When changing backoff shape or limits
*/

use std::time::Duration;

/// Exponential reconnect backoff: `base * 2^(n-1)`, clamped to `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries until cancelled
    pub max_retries: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `retry_count` (1-based).
    pub fn backoff_duration(&self, retry_count: u32) -> Duration {
        let exp = retry_count.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn allows_retry(&self, retry_count: u32) -> bool {
        self.max_retries.is_none_or(|max| retry_count <= max)
    }
}
