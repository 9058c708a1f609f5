//! Global rate limiter for upstream requests.
//!
//! Sleeper enforces its request budget per source IP, so one bucket is
//! shared by every operation in the process.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default ceiling: Sleeper allows roughly 1000 requests per minute.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 1000;

/// Default burst: permits available immediately after an idle period.
const DEFAULT_BURST: u32 = 50;

const WINDOW: Duration = Duration::from_secs(60);

/// Gate that callers pass through before each upstream request.
///
/// `acquire` suspends until the caller may proceed. It never fails.
pub trait Throttle: Send + Sync + 'static {
    fn acquire(&self) -> impl Future<Output = ()> + Send;
}

/// Configuration for the token bucket.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum permits handed out in any rolling 60-second window.
    pub requests_per_minute: u32,

    /// Bucket capacity, kept below the ceiling. The rest of the ceiling is
    /// refilled continuously.
    pub burst: u32,
}

impl RateLimitConfig {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst: DEFAULT_BURST.min(requests_per_minute.saturating_sub(1)).max(1),
        }
    }

    /// Set the bucket capacity.
    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst;
        self
    }

    fn ceiling(&self) -> u32 {
        self.requests_per_minute.max(1)
    }

    /// Capacity actually used: at least one, and below the ceiling so that
    /// some of the window is left for refill.
    fn capacity(&self) -> f64 {
        let ceiling = self.ceiling();
        let max = if ceiling > 1 { ceiling - 1 } else { 1 };
        f64::from(self.burst.clamp(1, max))
    }

    /// Tokens per second.
    ///
    /// A full bucket plus one window of refill must not exceed the ceiling.
    /// With a ceiling of one the single token comes back once per window.
    fn refill_per_sec(&self) -> f64 {
        let refill = (f64::from(self.ceiling()) - self.capacity()).max(1.0);
        refill / WINDOW.as_secs_f64()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE)
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with continuous refill and FIFO waiters.
///
/// Waiters queue on a fair async mutex: whoever holds it is the next caller
/// to be served, and sleeps for its token while later callers queue behind.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = config.capacity();
        Self {
            capacity,
            refill_per_sec: config.refill_per_sec(),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens =
            (bucket.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;
    }

    /// Tokens currently available, after refilling.
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }
}

impl Throttle for TokenBucket {
    async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;

        loop {
            self.refill(&mut bucket, Instant::now());

            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return;
            }

            let deficit = 1.0 - bucket.tokens;
            let wait = Duration::from_secs_f64(deficit / self.refill_per_sec);
            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}
