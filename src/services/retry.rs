use std::time::Duration;

use super::config::{env_u64, env_usize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(4_000),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let max_attempts = env_usize("CHATWIDGET_HTTP_MAX_ATTEMPTS", 3).clamp(1, 10);
        let base_delay =
            Duration::from_millis(env_u64("CHATWIDGET_RETRY_BASE_DELAY_MS", 250).clamp(0, 60_000));
        let max_delay =
            Duration::from_millis(env_u64("CHATWIDGET_RETRY_MAX_DELAY_MS", 4_000).clamp(0, 300_000));

        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// A single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff(&self, attempt: usize) -> Duration {
        // attempt is 1-based (attempt=1 => base_delay)
        if attempt <= 1 {
            return self.base_delay.min(self.max_delay);
        }

        let exp_shift = (attempt - 1).min(30) as u32;
        let base_ms = self.base_delay.as_millis() as u64;
        let raw_ms = base_ms.saturating_mul(1u64 << exp_shift);
        Duration::from_millis(raw_ms).min(self.max_delay)
    }
}

/// Whether a failed request may be sent again.
///
/// A connect failure never reached the server, so it is always safe. A timeout
/// may have been processed already, so it is only retried for idempotent calls
/// (summarize, not send-email).
pub(crate) fn should_retry(err: &reqwest::Error, idempotent: bool) -> bool {
    if err.is_connect() {
        return true;
    }
    idempotent && err.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(250));
        assert_eq!(retry.backoff(2), Duration::from_millis(500));
        assert_eq!(retry.backoff(3), Duration::from_millis(1_000));
        assert_eq!(retry.backoff(10), Duration::from_millis(4_000));
    }

    #[test]
    fn test_none_is_single_attempt() {
        let retry = RetryConfig::none();
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.backoff(4), Duration::ZERO);
    }
}
