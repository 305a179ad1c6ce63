//! Fixed-window request limiter keyed by client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    pub window: Duration,
    /// How often expired windows are swept
    pub prune_every: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            prune_every: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    fn windows(&self) -> MutexGuard<'_, HashMap<String, Window>> {
        // A panic mid-update leaves at worst one stale counter.
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn check_and_record(&self, client: &str) -> bool {
        self.check_and_record_at(client, Instant::now())
    }

    /// Counts one request for `client` and reports whether it is allowed. The
    /// first request, or the first after the window has passed, opens a fresh
    /// window.
    pub fn check_and_record_at(&self, client: &str, now: Instant) -> bool {
        let mut windows = self.windows();
        if let Some(window) = windows
            .get_mut(client)
            .filter(|window| now <= window.reset_at)
        {
            window.count = window.count.saturating_add(1);
            if window.count > self.config.max_requests {
                tracing::warn!(%client, count = window.count, "rate limit exceeded");
                return false;
            }
            return true;
        }

        windows.insert(
            client.to_string(),
            Window {
                count: 1,
                reset_at: now + self.config.window,
            },
        );
        true
    }

    /// Drops every window that has expired by `now`; returns how many went.
    pub fn prune(&self, now: Instant) -> usize {
        let mut windows = self.windows();
        let before = windows.len();
        windows.retain(|_, window| now <= window.reset_at);
        before - windows.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows().len()
    }

    /// Sweeps expired windows every `prune_every` until the task is aborted.
    pub fn spawn_pruner(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.config.prune_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let dropped = limiter.prune(Instant::now());
                if dropped > 0 {
                    tracing::debug!(dropped, "pruned rate limit windows");
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            prune_every: Duration::from_secs(300),
        })
    }

    #[test]
    fn allows_cap_then_rejects_within_window() {
        let limiter = limiter(10, 60);
        let start = Instant::now();
        for i in 0..10 {
            assert!(
                limiter.check_and_record_at("1.2.3.4", start + Duration::from_secs(i)),
                "request {i} should pass"
            );
        }
        assert!(!limiter.check_and_record_at("1.2.3.4", start + Duration::from_secs(30)));
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = limiter(1, 60);
        let now = Instant::now();
        assert!(limiter.check_and_record_at("a", now));
        assert!(limiter.check_and_record_at("b", now));
        assert!(!limiter.check_and_record_at("a", now));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = limiter(2, 60);
        let start = Instant::now();
        assert!(limiter.check_and_record_at("c", start));
        assert!(limiter.check_and_record_at("c", start));
        assert!(!limiter.check_and_record_at("c", start));
        // Still inside the window at exactly the reset instant.
        assert!(!limiter.check_and_record_at("c", start + Duration::from_secs(60)));
        assert!(limiter.check_and_record_at("c", start + Duration::from_secs(61)));
        assert!(limiter.check_and_record_at("c", start + Duration::from_secs(62)));
    }

    #[test]
    fn prune_drops_only_expired_windows() {
        let limiter = limiter(5, 60);
        let start = Instant::now();
        assert!(limiter.check_and_record_at("old", start));
        assert!(limiter.check_and_record_at("fresh", start + Duration::from_secs(50)));

        assert_eq!(limiter.prune(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.prune(start + Duration::from_secs(200)), 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn defaults_match_ten_per_minute() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.max_requests, 10);
        assert_eq!(config.window, Duration::from_secs(60));
        assert_eq!(config.prune_every, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn pruner_sweeps_in_background() {
        let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
            max_requests: 5,
            window: Duration::from_millis(10),
            prune_every: Duration::from_millis(50),
        }));
        assert!(limiter.check_and_record("gone"));

        let handle = limiter.spawn_pruner();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(limiter.tracked_clients(), 0);
        handle.abort();
    }
}
