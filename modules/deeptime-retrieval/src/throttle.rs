// Request spacing, daily quotas and retry with backoff. Applied at the
// provider boundary so the planner never reasons about time.

use std::future::Future;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::{rng, Rng};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::warn;

use deeptime_common::RateLimit;

use crate::error::ProviderFailure;

struct ThrottleState {
    next_slot: Option<Instant>,
    day: NaiveDate,
    used_today: u32,
}

/// Enforces one provider's declared [`RateLimit`].
pub struct Throttle {
    min_interval: Option<Duration>,
    per_day: Option<u32>,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    pub fn new(limit: &RateLimit) -> Self {
        Self {
            min_interval: limit.min_interval(),
            per_day: limit.per_day,
            state: Mutex::new(ThrottleState {
                next_slot: None,
                day: Utc::now().date_naive(),
                used_today: 0,
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(&RateLimit::unbounded())
    }

    /// Wait for the next request slot. Fails without waiting once the daily
    /// quota is spent.
    pub async fn acquire(&self) -> Result<(), ProviderFailure> {
        let wait_until = {
            let mut state = self.state.lock().await;

            let today = Utc::now().date_naive();
            if state.day != today {
                state.day = today;
                state.used_today = 0;
            }
            if let Some(quota) = self.per_day {
                if state.used_today >= quota {
                    return Err(ProviderFailure::QuotaExhausted(quota));
                }
            }
            state.used_today += 1;

            let now = Instant::now();
            let slot = state.next_slot.map_or(now, |next| next.max(now));
            if let Some(interval) = self.min_interval {
                state.next_slot = Some(slot + interval);
            }
            slot
        };

        sleep_until(wait_until).await;
        Ok(())
    }
}

/// Exponential backoff with jitter for transient provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` through the throttle, retrying transient failures.
    pub async fn run<T, F, Fut>(
        &self,
        throttle: &Throttle,
        provider: &str,
        mut op: F,
    ) -> Result<T, ProviderFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderFailure>>,
    {
        let mut attempt = 0u32;
        loop {
            throttle.acquire().await?;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        provider,
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "Provider request failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_requests() {
        let throttle = Throttle::new(&RateLimit::per_second(2.0));
        let start = Instant::now();
        throttle.acquire().await.unwrap();
        throttle.acquire().await.unwrap();
        throttle.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn daily_quota_is_enforced() {
        let throttle = Throttle::new(&RateLimit::unbounded().with_daily(2));
        throttle.acquire().await.unwrap();
        throttle.acquire().await.unwrap();
        assert_eq!(
            throttle.acquire().await.unwrap_err(),
            ProviderFailure::QuotaExhausted(2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run(&Throttle::unbounded(), "test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderFailure::Http {
                        status: 503,
                        message: "busy".into(),
                    })
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_survives_retries() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run(&Throttle::unbounded(), "test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderFailure::RateLimited)
            })
            .await;
        assert_eq!(result, Err(ProviderFailure::RateLimited));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run(&Throttle::unbounded(), "test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderFailure::Http {
                    status: 401,
                    message: "bad key".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
