use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded (SUMMARIZER_RATE_LIMIT_RPS={rps}): try again in ~{}ms", .retry_after.as_millis())]
pub struct RateLimited {
    pub rps: u32,
    pub retry_after: Duration,
}

/// Token bucket guarding tool calls that reach the upstream model.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `None` (or zero) disables limiting.
    pub fn from_rps(rps: Option<u32>) -> Option<Self> {
        let rps = rps.filter(|&n| n > 0)?;
        Some(Self {
            rps,
            state: Arc::new(Mutex::new(Bucket {
                tokens: rps as f64,
                last: Instant::now(),
            })),
        })
    }

    pub async fn check(&self) -> Result<(), RateLimited> {
        let mut bucket = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;

        let capacity = self.rps as f64;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * capacity).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        Err(RateLimited {
            rps: self.rps,
            retry_after: Duration::from_secs_f64((1.0 - bucket.tokens) / capacity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_positive_rps() {
        assert!(RateLimiter::from_rps(None).is_none());
        assert!(RateLimiter::from_rps(Some(0)).is_none());
    }

    #[tokio::test]
    async fn burst_is_capped_at_rps() {
        let limiter = RateLimiter::from_rps(Some(2)).unwrap();
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_ok());
        let err = limiter.check().await.unwrap_err();
        assert_eq!(err.rps, 2);
        assert!(err.retry_after <= Duration::from_millis(500));
        assert!(err.to_string().starts_with("rate limit exceeded"));
    }

    #[tokio::test]
    async fn tokens_refill_over_time() {
        let limiter = RateLimiter::from_rps(Some(10)).unwrap();
        for _ in 0..10 {
            assert!(limiter.check().await.is_ok());
        }
        assert!(limiter.check().await.is_err());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(limiter.check().await.is_ok());
    }
}
