//! Token-bucket rate limiter for adapter calls.
//!
//! Excess calls wait while queue slots remain, then fail with
//! `Overloaded` carrying a retry hint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::IEmbeddingProvider;

/// Classic token bucket: `capacity` tokens, refilled at `refill_per_sec`.
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            capacity: capacity as f64,
            refill_per_sec,
        }
    }

    /// Take one token if available. Returns the wait until the next token
    /// otherwise.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut state = self.state.lock().expect("token bucket poisoned");
        let elapsed = state.last_refill.elapsed().as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = Instant::now();

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - state.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }
}

/// Rate-limited embedding provider with a bounded wait queue.
pub struct RateLimited {
    inner: Arc<dyn IEmbeddingProvider>,
    bucket: TokenBucket,
    queue_depth: AtomicUsize,
    max_queue_depth: usize,
}

impl RateLimited {
    pub fn new(
        inner: Arc<dyn IEmbeddingProvider>,
        bucket: TokenBucket,
        max_queue_depth: usize,
    ) -> Self {
        Self {
            inner,
            bucket,
            queue_depth: AtomicUsize::new(0),
            max_queue_depth,
        }
    }

    fn acquire(&self) -> EngramResult<()> {
        if let Err(wait) = self.bucket.try_acquire() {
            // Bounded queue: callers beyond the depth limit fail fast.
            let depth = self.queue_depth.fetch_add(1, Ordering::SeqCst);
            if depth >= self.max_queue_depth {
                self.queue_depth.fetch_sub(1, Ordering::SeqCst);
                return Err(EngramError::Overloaded {
                    reason: "adapter rate limit queue full".into(),
                    retry_after_ms: wait.as_millis() as u64,
                });
            }
            std::thread::sleep(wait);
            let retry = self.bucket.try_acquire();
            self.queue_depth.fetch_sub(1, Ordering::SeqCst);
            if retry.is_err() {
                return Err(EngramError::Overloaded {
                    reason: "adapter rate limit exceeded".into(),
                    retry_after_ms: wait.as_millis() as u64,
                });
            }
        }
        Ok(())
    }
}

impl IEmbeddingProvider for RateLimited {
    fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        self.acquire()?;
        self.inner.embed(text)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_embedder::HashEmbedder;

    #[test]
    fn bucket_exhausts_and_refills() {
        let bucket = TokenBucket::new(2, 1000.0);
        assert!(bucket.try_acquire().is_ok());
        assert!(bucket.try_acquire().is_ok());
        // Third call may need a (tiny) wait.
        match bucket.try_acquire() {
            Ok(()) => {}
            Err(wait) => assert!(wait < Duration::from_millis(10)),
        }
    }

    #[test]
    fn zero_queue_depth_fails_fast_when_empty() {
        let inner = Arc::new(HashEmbedder::with_dimensions(8));
        // No refill to speak of: the second call cannot get a token.
        let limited = RateLimited::new(inner, TokenBucket::new(1, 0.000001), 0);

        limited.embed("first").unwrap();
        let err = limited.embed("second").unwrap_err();
        assert_eq!(err.kind(), engram_core::errors::ErrorKind::Overloaded);
        assert!(err.retry_after_ms().is_some());
    }
}
