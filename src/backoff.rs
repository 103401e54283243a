//! Retry delay policies shared by the relay bridge, the datastore connector
//! and the dashboard transport.

use std::time::Duration;

/// Exponential backoff with a cap and a bounded number of attempts.
///
/// Attempt `n` (1-based) waits `base * 2^(n-1)`, never more than `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Number of retries before giving up.
    pub max_attempts: u32,
}

impl ExponentialBackoff {
    /// Creates a policy.
    #[must_use]
    pub const fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts,
        }
    }

    /// Delay to wait before retry `attempt` (1-based), or `None` once the
    /// attempts are exhausted.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor).min(self.max))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}

/// Runs `op` up to `attempts` times, sleeping `pause` between failures.
///
/// Returns `None` once every attempt failed; each failure is logged with
/// `label`.
pub async fn retry_fixed<T, E, F, Fut>(
    label: &str,
    attempts: u32,
    pause: Duration,
    mut op: F,
) -> Option<T>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => {
                tracing::warn!(target_name = label, attempt, attempts, error = %e, "attempt failed");
                if attempt < attempts {
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn delays_double_until_capped() {
        let policy = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5), 5);
        let delays: Vec<_> = (1..=6).map(|n| policy.delay(n)).collect();
        assert_eq!(
            delays,
            vec![
                Some(Duration::from_secs(1)),
                Some(Duration::from_secs(2)),
                Some(Duration::from_secs(4)),
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(5)),
                None,
            ]
        );
        assert_eq!(policy.delay(0), None);
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let policy = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30), 100);
        assert_eq!(policy.delay(64), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_fixed_stops_after_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result = retry_fixed("test", 5, Duration::from_secs(1), || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 3 { Err("not yet") } else { Ok(n) } }
        })
        .await;
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_fixed_gives_up_after_bound() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let start = tokio::time::Instant::now();
        let result: Option<()> = retry_fixed("test", 3, Duration::from_millis(500), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("down") }
        })
        .await;
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
