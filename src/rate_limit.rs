use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum interval between calls to a remote API.
///
/// Clones share the same clock, so every holder of a clone is throttled
/// together.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    last_call: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
    name: String,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            last_call: Arc::new(Mutex::new(None)),
            min_interval,
            name: name.into(),
        }
    }

    /// Waits until `min_interval` has passed since the previous call.
    ///
    /// The lock is held while sleeping so concurrent callers queue up.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(
                    rate_limiter = %self.name,
                    wait_ms = wait.as_millis() as u64,
                    "Throttling request"
                );
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new("test", Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_second_call_waits() {
        let limiter = RateLimiter::new("test", Duration::from_millis(100));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_clones_share_the_clock() {
        let limiter = RateLimiter::new("test", Duration::from_millis(100));
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new("test", Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
