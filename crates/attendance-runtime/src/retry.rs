//! Retry strategies for account creation.

use std::time::Duration;

use crate::accounts::AccountError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);

/// Decides whether a failed attempt is retried and after how long.
pub trait RetryPolicy {
    /// `attempt` is the 1-based number of the attempt that just failed.
    /// `None` gives up and reports `error` for the row.
    fn delay_for(&self, attempt: u32, error: &AccountError) -> Option<Duration>;
}

/// Retries rate-limited calls with a doubling delay: `base`, `2·base`,
/// `4·base`, ... until `max_attempts` calls have been made. Every other error
/// fails the row immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32, error: &AccountError) -> Option<Duration> {
        if !error.is_rate_limited() || attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = 2u32.checked_pow(attempt - 1)?;
        self.base.checked_mul(factor)
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn delay_for(&self, _attempt: u32, _error: &AccountError) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_exhausted() {
        let policy = ExponentialBackoff::default();
        let err = AccountError::RateLimited;

        let delays: Vec<Option<Duration>> = (1..=5).map(|a| policy.delay_for(a, &err)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(3)),
                Some(Duration::from_secs(6)),
                Some(Duration::from_secs(12)),
                Some(Duration::from_secs(24)),
                None,
            ]
        );
    }

    #[test]
    fn test_backoff_ignores_other_errors() {
        let policy = ExponentialBackoff::default();
        assert_eq!(
            policy.delay_for(1, &AccountError::AlreadyExists("a@b.c".into())),
            None
        );
        assert_eq!(policy.delay_for(1, &AccountError::Rejected("x".into())), None);
    }

    #[test]
    fn test_no_retry() {
        assert_eq!(NoRetry.delay_for(1, &AccountError::RateLimited), None);
    }
}
