//! Bounded retry for collector operations.

use std::future::Future;
use std::time::Duration;

use lawharvest_store::RetrySettings;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Wait before the final attempt, long enough to outlast a rate limit.
    pub long_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            delay: Duration::from_secs(settings.delay_secs),
            long_delay: Duration::from_secs(settings.long_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
            long_delay: Duration::ZERO,
        }
    }

    /// Wait after failed attempt `attempt` (1-based), or `None` when it was the last.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            None
        } else if attempt + 1 == self.max_attempts {
            Some(self.long_delay)
        } else {
            Some(self.delay)
        }
    }
}

/// Run `op` until it yields a value or the policy is exhausted.
///
/// Both an error and an empty result count as a failed attempt.
pub async fn attempt_with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<T>>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(Some(value)) => {
                if attempt > 1 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Some(value);
            }
            Ok(None) => warn!(label, attempt, max = policy.max_attempts, "empty result"),
            Err(e) => warn!(label, attempt, max = policy.max_attempts, error = %e, "attempt failed"),
        }

        let Some(wait) = policy.delay_after(attempt) else {
            warn!(label, attempts = attempt, "giving up");
            return None;
        };
        if !wait.is_zero() {
            debug!(label, wait_secs = wait.as_secs(), "waiting before retry");
            tokio::time::sleep(wait).await;
        }
        attempt += 1;
    }
}
