//! Sliding-window rate limiter
//!
//! Admits at most `max_requests` calls in any window of `period`. A caller
//! over budget is suspended until the oldest admission leaves the window; it
//! never fails. Admission is FIFO-ish only: under sustained overload a waiter
//! may be overtaken.

use crate::config::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Rate limiter shared by every task issuing one kind of call
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    max_requests: usize,
    period: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter labelled `name` in logs
    #[must_use]
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        let max_requests = config.max_requests.max(1);
        Self {
            name,
            max_requests,
            period: config.period().max(Duration::from_millis(1)),
            admissions: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait until a call may be issued, then record it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock();
                let now = Instant::now();
                self.evict_expired(&mut admissions, now);

                if admissions.len() < self.max_requests {
                    admissions.push_back(now);
                    return;
                }

                admissions
                    .front()
                    .map(|oldest| self.period.saturating_sub(now.duration_since(*oldest)))
                    .unwrap_or_default()
            };

            tracing::debug!(
                limiter = self.name,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "throttled"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Run `call` once a slot is available
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        call().await
    }

    /// Admissions still available in the current window
    #[must_use]
    pub fn available(&self) -> usize {
        let mut admissions = self.admissions.lock();
        self.evict_expired(&mut admissions, Instant::now());
        self.max_requests - admissions.len()
    }

    fn evict_expired(&self, admissions: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = admissions.front() {
            if now.duration_since(*oldest) >= self.period {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_budget_without_waiting() {
        let limiter = RateLimiter::new("test", RateLimitConfig::per_second(3));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.available(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn suspends_until_window_slides() {
        let limiter = RateLimiter::new("test", RateLimitConfig::per_second(2));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        // 2 in the first window, 2 in the second, 1 in the third
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_recovers_after_period() {
        let limiter = RateLimiter::new("test", RateLimitConfig::per_second(1));
        limiter.acquire().await;
        assert_eq!(limiter.available(), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_budget() {
        let limiter = Arc::new(RateLimiter::new(
            "test",
            RateLimitConfig::new(10, Duration::from_millis(100)),
        ));
        let start = Instant::now();

        let tasks: Vec<_> = (0..30)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn run_wraps_the_call() {
        let limiter = RateLimiter::new("test", RateLimitConfig::per_second(1));
        let value = limiter.run(|| async { 7 }).await;
        assert_eq!(value, 7);
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn zero_budget_is_clamped() {
        let limiter = RateLimiter::new("test", RateLimitConfig::new(0, Duration::ZERO));
        assert_eq!(limiter.max_requests, 1);
        assert!(limiter.period > Duration::ZERO);
    }
}
