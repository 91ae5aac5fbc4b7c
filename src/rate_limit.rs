//! Outbound request pacing
//!
//! The market-data API enforces a requests-per-second ceiling shared by every
//! endpoint, so one limiter instance is shared by all remote-calling clients.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between two outbound requests
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(200);

/// Spaces outbound requests at least `min_interval` apart
///
/// Callers that arrive too early are delayed, never rejected. The lock is held
/// across the delay so concurrent callers are served one at a time.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MIN_REQUEST_INTERVAL)
    }
}

impl RateLimiter {
    /// Creates a limiter with the given minimum spacing
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Minimum spacing this limiter enforces
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until a request may be issued and records it as issued now
    pub async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!(?wait_time, "Rate limiting: delaying outbound request");
                tokio::time::sleep(wait_time).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_sequential_requests_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let mut issued = Vec::new();

        for _ in 0..4 {
            limiter.acquire().await;
            issued.push(Instant::now());
        }

        for pair in issued.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(50));
        }
    }

    #[tokio::test]
    async fn test_no_wait_after_interval_has_passed() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(40)));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap());
        }
        issued.sort();

        // Allow a little scheduling slack between acquiring and reading the clock
        for pair in issued.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(35));
        }
    }

    #[tokio::test]
    async fn test_default_interval() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.min_interval(), MIN_REQUEST_INTERVAL);
    }
}
