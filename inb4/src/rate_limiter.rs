//! Outbound request throttling
//!
//! Last.fm allows roughly one request per second per API key. The limiter
//! holds a single token that refills continuously, so there is never a
//! burst above one request. Waiters are served in arrival order.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Default spacing between upstream requests
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token-bucket limiter with capacity 1
pub struct RateLimiter {
    /// `None` when throttling is disabled
    limiter: Option<DirectLimiter>,
    /// tokio's mutex is fair, which gives FIFO release order
    queue: Mutex<()>,
    interval: Duration,
    acquired: AtomicU64,
}

impl RateLimiter {
    /// One token per `interval`
    ///
    /// A zero interval disables throttling.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval)
            .map(|quota| governor::RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        Self {
            limiter,
            queue: Mutex::new(()),
            interval,
            acquired: AtomicU64::new(0),
        }
    }

    /// Wait for a token
    pub async fn acquire(&self) {
        let _turn = self.queue.lock().await;

        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                tracing::trace!(interval = ?self.interval, "Rate limiting: waiting for token");
                limiter.until_ready().await;
            }
        }

        self.acquired.fetch_add(1, Ordering::Relaxed);
    }

    /// Tokens handed out so far
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_default_interval() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.interval(), Duration::from_secs(1));
        assert_eq!(limiter.acquired(), 0);
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(Duration::from_millis(200));

        let start = Instant::now();

        // First token - no wait
        limiter.acquire().await;
        let first_elapsed = start.elapsed();

        // Second token - should wait ~200ms
        limiter.acquire().await;
        let second_elapsed = start.elapsed();

        // Third token - another ~200ms
        limiter.acquire().await;
        let third_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
        assert!(third_elapsed >= Duration::from_millis(380));
        assert_eq!(limiter.acquired(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // 4 tokens need at least 3 full intervals
        assert!(times[3] >= Duration::from_millis(280), "last token at {:?}", times[3]);
    }

    #[tokio::test]
    async fn test_waiters_released_in_arrival_order() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));
        let released = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for waiter in 0..5 {
            let limiter = Arc::clone(&limiter);
            let released = Arc::clone(&released);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                released.lock().unwrap().push(waiter);
            }));
            // Let this waiter queue up before the next one arrives
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*released.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(limiter.acquired(), 5);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_block() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
