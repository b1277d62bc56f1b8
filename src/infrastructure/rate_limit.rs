//! # Rate Limiter
//!
//! Per-provider token bucket.
//!
//! Capacity and refill rate both equal the configured number of requests
//! per period. Tokens accumulate continuously, capped at capacity, and
//! each admitted call consumes exactly one. State sits behind a single
//! mutex per limiter, so contention on one courier never blocks another.
//!
//! Fan-out paths use [`RateLimiter::allow`], which never blocks;
//! [`RateLimiter::wait`] polls it with a fixed 100ms backoff.
//!
//! # Examples
//!
//! ```
//! use shipment_hub::infrastructure::rate_limit::RateLimiter;
//!
//! let limiter = RateLimiter::per_minute(2);
//! assert!(limiter.allow());
//! assert!(limiter.allow());
//! assert!(!limiter.allow());
//! ```

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Backoff between polls in [`RateLimiter::wait`].
const WAIT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    tokens_per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests` per `period`, starting full.
    ///
    /// A zero `period` is treated as one second.
    #[must_use]
    pub fn new(requests: u32, period: Duration) -> Self {
        let period = if period.is_zero() {
            Duration::from_secs(1)
        } else {
            period
        };
        let capacity = f64::from(requests);
        Self {
            capacity,
            tokens_per_second: capacity / period.as_secs_f64(),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Creates a limiter admitting `requests` per minute.
    #[must_use]
    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }

    /// Returns the bucket capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        // Capacity was built from a u32.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capacity = self.capacity as u32;
        capacity
    }

    /// Takes a token if one is available. Never blocks on time.
    #[must_use]
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut bucket = self.bucket.lock();
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.tokens_per_second).min(self.capacity);
        bucket.last_refill = now.max(bucket.last_refill);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available, polling every 100ms.
    ///
    /// Cancel-safe: dropping the future consumes nothing.
    pub async fn wait(&self) {
        while !self.allow() {
            tokio::time::sleep(WAIT_BACKOFF).await;
        }
    }

    /// Returns the tokens currently available, after refill.
    #[must_use]
    pub fn available(&self) -> f64 {
        let bucket = self.bucket.lock();
        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        (bucket.tokens + elapsed * self.tokens_per_second).min(self.capacity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn forty_per_minute_burst_then_refill() {
        let limiter = RateLimiter::per_minute(40);
        let start = Instant::now();

        for i in 0..40 {
            assert!(limiter.allow_at(start), "call {} should be admitted", i + 1);
        }
        assert!(!limiter.allow_at(start + Duration::from_millis(500)));
        assert!(limiter.allow_at(start + Duration::from_millis(2000)));
    }

    #[test]
    fn refill_is_capped_at_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        let start = Instant::now();
        let later = start + Duration::from_secs(3600);

        let admitted = (0..10).filter(|_| limiter.allow_at(later)).count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn zero_capacity_denies_everything() {
        let limiter = RateLimiter::per_minute(0);
        assert!(!limiter.allow());
        assert_eq!(limiter.capacity(), 0);
    }

    #[test]
    fn zero_period_is_one_second() {
        let limiter = RateLimiter::new(5, Duration::ZERO);
        assert_eq!(limiter.capacity(), 5);
        assert!(limiter.allow());
    }

    #[test]
    fn independent_limiters_do_not_share_tokens() {
        let exhausted = RateLimiter::per_minute(1);
        let fresh = RateLimiter::per_minute(1);
        assert!(exhausted.allow());
        assert!(!exhausted.allow());
        assert!(fresh.allow());
    }

    #[test]
    fn concurrent_callers_never_exceed_capacity() {
        let limiter = Arc::new(RateLimiter::per_minute(25));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..10).filter(|_| limiter.allow()).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 25);
    }

    #[tokio::test]
    async fn real_clock_refills_after_wait() {
        let limiter = RateLimiter::per_minute(40);
        for _ in 0..40 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(limiter.allow());
    }

    #[tokio::test]
    async fn wait_returns_once_a_token_refills() {
        let limiter = RateLimiter::new(1, Duration::from_millis(200));
        assert!(limiter.allow());
        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    proptest! {
        #[test]
        fn burst_never_exceeds_capacity(capacity in 0u32..200, attempts in 0usize..400) {
            let limiter = RateLimiter::per_minute(capacity);
            let now = Instant::now();
            let admitted = (0..attempts).filter(|_| limiter.allow_at(now)).count();
            prop_assert_eq!(admitted, attempts.min(capacity as usize));
        }
    }
}
