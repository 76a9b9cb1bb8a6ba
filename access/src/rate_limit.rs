//! Fixed-window request rate limiting.
//!
//! # Algorithm
//!
//! Each key owns one bucket `{ count, reset_at }`. The first request for a
//! key, or the first request at or after `reset_at`, replaces the bucket
//! with a fresh window. Every other request increments the count and is
//! denied once the count exceeds the limit.
//!
//! A burst straddling a window boundary can admit up to twice the limit,
//! and each server process keeps its own table, so a deployment running N
//! instances admits up to N times the limit. Both are accepted: the limiter
//! is abuse protection, not a quota.
//!
//! # Memory
//!
//! Expired buckets are dropped by a full sweep that runs lazily, at most
//! once per [`GC_INTERVAL`] of clock time, from inside [`RateLimiter::check`].

use chrono::Duration;
use dashmap::DashMap;
use guestgate_core::environment::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Minimum clock time between two sweeps of expired buckets.
pub const GC_INTERVAL: Duration = Duration::seconds(60);

/// Limit and window for one throttled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests admitted per window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Outcome of one [`RateLimiter::check`] call.
///
/// All fields are reported on every response so clients can self-throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// The policy's limit.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Seconds until the current window resets (at least 1).
    pub retry_after_seconds: u64,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    reset_at_ms: i64,
}

/// In-process fixed-window rate limiter.
///
/// The bucket table is a [`DashMap`], so concurrent requests for different
/// keys do not contend and requests for the same key serialize on that
/// key's shard only.
///
/// # Example
///
/// ```
/// use guestgate_access::rate_limit::{RateLimiter, RateLimitPolicy};
/// use guestgate_core::environment::SystemClock;
/// use chrono::Duration;
/// use std::sync::Arc;
///
/// let limiter = RateLimiter::new(Arc::new(SystemClock));
/// let policy = RateLimitPolicy::new(2, Duration::minutes(1));
///
/// assert!(limiter.check("guest:join:evt1:10.0.0.1", policy).allowed);
/// assert!(limiter.check("guest:join:evt1:10.0.0.1", policy).allowed);
/// assert!(!limiter.check("guest:join:evt1:10.0.0.1", policy).allowed);
/// ```
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    last_gc_ms: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Create an empty limiter reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now_ms = clock.now().timestamp_millis();
        Self {
            buckets: DashMap::new(),
            last_gc_ms: AtomicI64::new(now_ms),
            clock,
        }
    }

    /// Count one request against `key` and decide whether it may proceed.
    pub fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now_ms = self.clock.now().timestamp_millis();
        let window_ms = policy.window.num_milliseconds().max(1);

        // Sweep before taking the entry: `retain` locks every shard.
        self.maybe_collect(now_ms);

        let mut entry = self.buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            reset_at_ms: now_ms,
        });
        let bucket = entry.value_mut();

        if bucket.reset_at_ms <= now_ms {
            *bucket = Bucket {
                count: 1,
                reset_at_ms: now_ms + window_ms,
            };
            return RateLimitDecision {
                allowed: true,
                limit: policy.limit,
                remaining: policy.limit.saturating_sub(1),
                retry_after_seconds: ceil_seconds(window_ms),
            };
        }

        bucket.count = bucket.count.saturating_add(1);
        let retry_after_seconds = ceil_seconds(bucket.reset_at_ms - now_ms);

        if bucket.count > policy.limit {
            let count = bucket.count;
            drop(entry);
            tracing::warn!(key, count, limit = policy.limit, "Rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                limit: policy.limit,
                remaining: 0,
                retry_after_seconds,
            };
        }

        RateLimitDecision {
            allowed: true,
            limit: policy.limit,
            remaining: policy.limit - bucket.count,
            retry_after_seconds,
        }
    }

    /// Number of live buckets (expired ones may linger until the next sweep).
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if no bucket is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn maybe_collect(&self, now_ms: i64) {
        let last = self.last_gc_ms.load(Ordering::Relaxed);
        if now_ms - last < GC_INTERVAL.num_milliseconds() {
            return;
        }
        // One caller wins the sweep; the rest carry on.
        if self
            .last_gc_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| bucket.reset_at_ms > now_ms);
        tracing::debug!(
            dropped = before.saturating_sub(self.buckets.len()),
            kept = self.buckets.len(),
            "Swept expired rate-limit buckets"
        );
    }
}

fn ceil_seconds(ms: i64) -> u64 {
    let seconds = (ms + 999) / 1000;
    u64::try_from(seconds).unwrap_or(0).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use guestgate_testing::ManualClock;

    fn limiter() -> (RateLimiter, ManualClock) {
        let clock = ManualClock::at_test_epoch();
        (RateLimiter::new(Arc::new(clock.clone())), clock)
    }

    const FIVE_PER_MINUTE: RateLimitPolicy = RateLimitPolicy::new(5, Duration::seconds(60));

    #[test]
    fn test_sixth_call_is_denied() {
        let (limiter, _clock) = limiter();

        for n in 1..=5u32 {
            let decision = limiter.check("k", FIVE_PER_MINUTE);
            assert!(decision.allowed, "call {n} denied");
            assert_eq!(decision.remaining, 5 - n);
            assert_eq!(decision.limit, 5);
        }

        let denied = limiter.check("k", FIVE_PER_MINUTE);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after_seconds > 0);
    }

    #[test]
    fn test_window_resets() {
        let (limiter, clock) = limiter();
        for _ in 0..6 {
            limiter.check("k", FIVE_PER_MINUTE);
        }

        clock.advance(Duration::seconds(60));

        let decision = limiter.check("k", FIVE_PER_MINUTE);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
        assert_eq!(decision.retry_after_seconds, 60);
    }

    #[test]
    fn test_retry_after_counts_down() {
        let (limiter, clock) = limiter();
        limiter.check("k", FIVE_PER_MINUTE);

        clock.advance(Duration::milliseconds(59_500));
        let decision = limiter.check("k", FIVE_PER_MINUTE);
        assert_eq!(decision.retry_after_seconds, 1);

        clock.advance(Duration::seconds(1));
        let decision = limiter.check("k", FIVE_PER_MINUTE);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter();
        let one = RateLimitPolicy::new(1, Duration::minutes(1));

        assert!(limiter.check("a", one).allowed);
        assert!(!limiter.check("a", one).allowed);
        assert!(limiter.check("b", one).allowed);
    }

    #[test]
    fn test_expired_buckets_are_swept_lazily() {
        let (limiter, clock) = limiter();
        let short = RateLimitPolicy::new(3, Duration::seconds(5));

        limiter.check("a", short);
        limiter.check("b", short);
        assert_eq!(limiter.len(), 2);

        // Expired, but the sweep interval has not elapsed.
        clock.advance(Duration::seconds(10));
        limiter.check("c", short);
        assert_eq!(limiter.len(), 3);

        clock.advance(Duration::seconds(60));
        limiter.check("c", short);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_never_over_admit() {
        let clock = ManualClock::at_test_epoch();
        let limiter = Arc::new(RateLimiter::new(Arc::new(clock)));
        let policy = RateLimitPolicy::new(10, Duration::minutes(1));

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.check("shared", policy).allowed })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap_or(false) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }
}
