//! Client-side request budget
//!
//! Sliding-window limiter shared by all requests of one client. Callers wait
//! until the oldest request in the window ages out rather than letting the
//! API answer 429.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::info;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    sent: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            sent: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// `requests_per_minute == 0` disables limiting
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self::new(requests_per_minute as usize, Duration::from_secs(60))
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    /// Wait for a slot in the window, then claim it
    ///
    /// The lock is held while sleeping so waiters are served in order.
    pub async fn acquire(&self) {
        if !self.is_enabled() {
            return;
        }

        let mut sent = self.sent.lock().await;
        self.prune(&mut sent, Instant::now());

        if sent.len() >= self.max_requests
            && let Some(oldest) = sent.front().copied()
        {
            let wait = self.window.saturating_sub(oldest.elapsed());
            if !wait.is_zero() {
                info!(
                    wait_ms = wait.as_millis() as u64,
                    "Rate limit approaching, waiting"
                );
                sleep(wait).await;
            }
            self.prune(&mut sent, Instant::now());
        }

        sent.push_back(Instant::now());
    }

    fn prune(&self, sent: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = sent.front() {
            if now.duration_since(*oldest) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_waits_when_window_full() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(1));
        limiter.acquire().await;

        tokio::time::advance(Duration::from_millis(1500)).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_disabled_never_waits() {
        let limiter = RateLimiter::per_minute(0);
        assert!(!limiter.is_enabled());
        for _ in 0..100 {
            limiter.acquire().await;
        }
    }
}
