//! Token-bucket admission control, one controller per backend.
//!
//! Burst capacity is one: a token is available immediately only if the
//! previous one was granted at least `1 / rate` seconds ago.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::errors::{Result, TranslationError};

/// Longest spacing between two tokens, i.e. the slowest accepted rate
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// The caller's cancellation fired before a token was granted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("admission canceled")]
pub struct AdmissionCanceled;

/// Rate limiter with steady rate R and burst 1
#[derive(Debug)]
pub struct AdmissionController {
    interval: Duration,
    next_free: Mutex<Instant>,
}

impl AdmissionController {
    /// Create a limiter granting `rate_per_sec` tokens per second
    pub fn new(rate_per_sec: f64) -> Result<Self> {
        if !rate_per_sec.is_finite() || rate_per_sec <= 0.0 {
            return Err(TranslationError::ConfigError {
                message: format!("rate limit must be a positive number, got {}", rate_per_sec),
            });
        }

        let interval = Duration::try_from_secs_f64(1.0 / rate_per_sec)
            .ok()
            .filter(|interval| *interval <= MAX_INTERVAL)
            .ok_or_else(|| TranslationError::ConfigError {
                message: format!(
                    "rate limit {} is too low, at least one request per {}s is required",
                    rate_per_sec,
                    MAX_INTERVAL.as_secs()
                ),
            })?;

        Ok(Self {
            interval,
            next_free: Mutex::new(Instant::now()),
        })
    }

    /// Minimum spacing between two granted tokens
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for a token, returning how long the caller waited.
    ///
    /// Waiters are served in FIFO order. Without a cancellation the wait is
    /// unbounded; a canceled waiter never consumes a token.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Duration, AdmissionCanceled> {
        if cancel.is_cancelled() {
            return Err(AdmissionCanceled);
        }
        let started = Instant::now();

        let mut next_free = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AdmissionCanceled),
            guard = self.next_free.lock() => guard,
        };

        let granted_at = (*next_free).max(Instant::now());
        if granted_at > Instant::now() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AdmissionCanceled),
                _ = tokio::time::sleep_until(granted_at) => {}
            }
        }

        *next_free = granted_at + self.interval;
        Ok(started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_rejects_non_positive_rate() {
        assert!(AdmissionController::new(0.0).is_err());
        assert!(AdmissionController::new(-1.0).is_err());
        assert!(AdmissionController::new(f64::NAN).is_err());
        assert!(AdmissionController::new(2.0).is_ok());
    }

    #[test]
    fn test_rejects_rates_slower_than_max_interval() {
        assert!(AdmissionController::new(1e-20).is_err());
        assert!(AdmissionController::new(1e-19).is_err());
        assert!(AdmissionController::new(1.0 / (2.0 * MAX_INTERVAL.as_secs_f64())).is_err());

        let slowest = AdmissionController::new(1.0 / (MAX_INTERVAL.as_secs_f64() - 1.0)).unwrap();
        assert!(slowest.interval() <= MAX_INTERVAL);
        assert_eq!(AdmissionController::new(4.0).unwrap().interval(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slowest_rate_grants_without_overflow() {
        let limiter = AdmissionController::new(1.0 / (MAX_INTERVAL.as_secs_f64() - 1.0)).unwrap();
        let cancel = CancellationToken::new();
        assert_eq!(limiter.acquire(&cancel).await.unwrap(), Duration::ZERO);

        let waited = limiter.acquire(&cancel).await.unwrap();
        assert!(waited >= limiter.interval() - Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_are_served_in_order() {
        let limiter = Arc::new(AdmissionController::new(2.0).unwrap());
        let start = Instant::now();

        let mut tasks = Vec::new();
        for _ in 0..3 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.acquire(&CancellationToken::new()).await.unwrap();
                start.elapsed()
            }));
            // Let each task queue on the lock before the next one is spawned
            tokio::task::yield_now().await;
        }

        let mut granted = Vec::new();
        for task in tasks {
            granted.push(task.await.unwrap());
        }

        let expected = [0, 500, 1000].map(Duration::from_millis);
        for (got, want) in granted.iter().zip(expected) {
            assert!(*got >= want, "granted at {:?}, expected {:?}", got, want);
            assert!(*got < want + Duration::from_millis(50), "granted at {:?}, expected {:?}", got, want);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_middle_waiter_does_not_delay_the_next() {
        let limiter = Arc::new(AdmissionController::new(2.0).unwrap());
        let start = Instant::now();
        limiter.acquire(&CancellationToken::new()).await.unwrap();

        let middle = CancellationToken::new();
        let middle_task = {
            let limiter = limiter.clone();
            let middle = middle.clone();
            tokio::spawn(async move { limiter.acquire(&middle).await })
        };
        tokio::task::yield_now().await;

        let last_task = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire(&CancellationToken::new()).await.unwrap();
                start.elapsed()
            })
        };
        tokio::task::yield_now().await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        middle.cancel();

        assert_eq!(middle_task.await.unwrap(), Err(AdmissionCanceled));
        let granted = last_task.await.unwrap();
        assert!(granted >= Duration::from_millis(500), "granted at {:?}", granted);
        assert!(granted < Duration::from_millis(550), "granted at {:?}", granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_calls_at_two_per_second_take_two_seconds() {
        let limiter = AdmissionController::new(2.0).unwrap();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let mut waited = Duration::ZERO;
        for _ in 0..5 {
            waited += limiter.acquire(&cancel).await.unwrap();
        }

        assert!(waited >= Duration::from_secs(2));
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_limiter_grants_one_token_immediately() {
        let limiter = AdmissionController::new(1.0).unwrap();
        let cancel = CancellationToken::new();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.acquire(&cancel).await.unwrap(), Duration::ZERO);

        // No accumulated burst: the second call still waits a full interval
        let waited = limiter.acquire(&cancel).await.unwrap();
        assert!(waited >= Duration::from_secs(1));
        assert!(waited < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_waiter_fails_without_consuming() {
        let limiter = AdmissionController::new(1.0).unwrap();
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let canceled = CancellationToken::new();
        canceled.cancel();
        assert_eq!(limiter.acquire(&canceled).await, Err(AdmissionCanceled));

        // The next token is still due one interval after the first grant
        let waited = limiter.acquire(&cancel).await.unwrap();
        assert!(waited >= Duration::from_secs(1));
        assert!(waited < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let limiter = AdmissionController::new(0.1).unwrap();
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let waiter = CancellationToken::new();
        let trigger = waiter.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert_eq!(limiter.acquire(&waiter).await, Err(AdmissionCanceled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
