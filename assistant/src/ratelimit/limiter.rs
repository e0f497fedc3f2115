//! Token bucket limiter shared by outbound calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::ratelimit::{BucketConfig, RateLimitConfig, RateLimitError};

/// Mutable bucket state.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(shape: BucketConfig) -> Self {
        Self {
            tokens: f64::from(shape.capacity),
            last_refill: Instant::now(),
        }
    }

    /// Add the tokens accrued since the last refill, capped at capacity.
    fn refill(&mut self, shape: BucketConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = elapsed
            .mul_add(f64::from(shape.refill_per_sec), self.tokens)
            .min(f64::from(shape.capacity));
        self.last_refill = now;
    }

    /// Time until one whole token is available.
    fn wait_for_token(&self, shape: BucketConfig) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / f64::from(shape.refill_per_sec))
    }
}

/// Token bucket rate limiter.
///
/// Cloning is cheap and every clone draws from the same bucket. Token
/// consumption is serialized behind an async mutex, so waiters are served
/// in arrival order.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    enabled: bool,
    shape: BucketConfig,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Creates a new limiter with a full bucket.
    pub fn new(config: RateLimitConfig) -> Self {
        // A zero-sized or non-refilling bucket would block forever.
        let shape = BucketConfig {
            capacity: config.bucket.capacity.max(1),
            refill_per_sec: config.bucket.refill_per_sec.max(1),
        };

        Self {
            enabled: config.enabled,
            shape,
            bucket: Arc::new(Mutex::new(Bucket::full(shape))),
        }
    }

    /// Creates a limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        })
    }

    /// Waits until a token is available and consumes it.
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn acquire(&self) {
        if !self.enabled {
            return;
        }

        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.shape, Instant::now());

        if bucket.tokens < 1.0 {
            let wait = bucket.wait_for_token(self.shape);
            debug!(
                wait_ms = wait.as_millis() as u64,
                "Outbound rate limit reached, waiting for token"
            );
            // Sleep while holding the lock so later callers queue behind us.
            sleep(wait).await;
            bucket.refill(self.shape, Instant::now());
        }

        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    /// Consumes a token if one is available right now.
    pub async fn try_acquire(&self) -> Result<(), RateLimitError> {
        if !self.enabled {
            return Ok(());
        }

        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.shape, Instant::now());

        if bucket.tokens < 1.0 {
            return Err(RateLimitError::Exhausted {
                retry_after: bucket.wait_for_token(self.shape),
            });
        }

        bucket.tokens -= 1.0;
        Ok(())
    }

    /// Whole tokens currently available.
    pub async fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.shape, Instant::now());
        bucket.tokens.floor() as u32
    }

    /// Whether this limiter enforces a limit.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}
