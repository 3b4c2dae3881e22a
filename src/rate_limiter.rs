use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

const REQUESTS_PER_MINUTE: usize = 20;
const FAILURE_BACKOFF_BASE: f64 = 1.5;
const MAX_BACKOFF_SECS: f64 = 60.0;
const JITTER_RANGE: (f64, f64) = (0.8, 1.2);
const MAX_SLEEP_SECS: f64 = 10.0;
const SLIDING_WINDOW_SECS: u64 = 60;

#[derive(Default)]
struct HostState {
    request_times: VecDeque<Instant>,
    failure_count: u32,
    success_streak: u32,
    adaptive_multiplier: f64,
    last_request_at: Option<Instant>,
}

impl HostState {
    fn new() -> Self {
        Self {
            adaptive_multiplier: 1.0,
            ..Default::default()
        }
    }
}

/// Per-host sliding-window throttle with exponential backoff and an adaptive
/// multiplier driven by recent success/failure streaks.
pub struct AdaptiveRateLimiter {
    hosts: Arc<RwLock<HashMap<String, HostState>>>,
}

impl Default for AdaptiveRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveRateLimiter {
    pub fn new() -> Self {
        Self {
            hosts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Compute and sleep the effective wait for `host`, then record the
    /// request. `base_delay` is typically the crawl delay from C1.
    pub async fn wait_if_needed(&self, host: &str, base_delay_secs: u64) {
        let wait = self.calculate_wait_secs(host, base_delay_secs).await;
        if wait > 0.0 {
            let jitter = rand_in_range(JITTER_RANGE.0, JITTER_RANGE.1);
            let total_wait = (wait * jitter).min(MAX_SLEEP_SECS);
            if total_wait > 5.0 {
                info!("rate limiting: waiting {:.1}s for {}", total_wait, host);
            } else {
                debug!("rate limiting: waiting {:.1}s for {}", total_wait, host);
            }
            tokio::time::sleep(Duration::from_secs_f64(total_wait)).await;
        }
        self.record_request(host).await;
    }

    async fn calculate_wait_secs(&self, host: &str, base_delay_secs: u64) -> f64 {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(HostState::new);
        let now = Instant::now();

        // Factor 1: base delay from robots.txt / config.
        let mut wait = base_delay_secs as f64;

        // Factor 2: sliding-window rate limit.
        while let Some(&front) = state.request_times.front() {
            if now.duration_since(front).as_secs() > SLIDING_WINDOW_SECS {
                state.request_times.pop_front();
            } else {
                break;
            }
        }
        if state.request_times.len() >= REQUESTS_PER_MINUTE {
            let oldest = *state.request_times.front().unwrap();
            let elapsed = now.duration_since(oldest).as_secs_f64();
            let time_until_next = SLIDING_WINDOW_SECS as f64 - elapsed;
            wait = wait.max(time_until_next);
        }

        // Factor 3: exponential backoff for consecutive failures.
        if state.failure_count > 0 {
            let backoff = FAILURE_BACKOFF_BASE
                .powi(state.failure_count as i32)
                .min(MAX_BACKOFF_SECS);
            wait = wait.max(backoff);
        }

        // Factor 4: adaptive multiplier.
        wait *= state.adaptive_multiplier;

        // Factor 5: subtract time already elapsed since the last request.
        if let Some(last) = state.last_request_at {
            let since_last = now.duration_since(last).as_secs_f64();
            wait = if since_last < wait { wait - since_last } else { 0.0 };
        }

        wait.max(0.0)
    }

    async fn record_request(&self, host: &str) {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(HostState::new);
        let now = Instant::now();
        state.request_times.push_back(now);
        state.last_request_at = Some(now);
    }

    pub async fn record_success(&self, host: &str) {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(HostState::new);
        state.failure_count = 0;
        state.success_streak += 1;
        if state.success_streak >= 5 {
            state.adaptive_multiplier = (state.adaptive_multiplier * 0.9).max(0.8);
            state.success_streak = 0;
        }
    }

    pub async fn record_failure(&self, host: &str) {
        let mut hosts = self.hosts.write().await;
        let state = hosts.entry(host.to_string()).or_insert_with(HostState::new);
        state.failure_count += 1;
        state.success_streak = 0;
        state.adaptive_multiplier = (state.adaptive_multiplier * 1.2).min(3.0);
        tracing::warn!(
            "recorded failure for {} (count: {})",
            host,
            state.failure_count
        );
    }

    pub async fn failure_count(&self, host: &str) -> u32 {
        self.hosts
            .read()
            .await
            .get(host)
            .map(|s| s.failure_count)
            .unwrap_or(0)
    }
}

fn rand_in_range(lo: f64, hi: f64) -> f64 {
    use rand::Rng;
    let mut rng = rand::rng();
    rng.random_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_then_failure_adjust_multiplier() {
        let limiter = AdaptiveRateLimiter::new();
        limiter.record_failure("example.com").await;
        assert_eq!(limiter.failure_count("example.com").await, 1);

        limiter.record_success("example.com").await;
        assert_eq!(limiter.failure_count("example.com").await, 0);
    }

    #[tokio::test]
    async fn five_successes_decay_multiplier() {
        let limiter = AdaptiveRateLimiter::new();
        limiter.record_failure("h").await; // multiplier -> 1.2
        for _ in 0..5 {
            limiter.record_success("h").await;
        }
        let hosts = limiter.hosts.read().await;
        let state = hosts.get("h").unwrap();
        // 1.2 * 0.9 = 1.08, floor 0.8 not hit yet
        assert!((state.adaptive_multiplier - 1.08).abs() < 1e-9);
    }

    #[tokio::test]
    async fn wait_respects_base_delay_floor() {
        let limiter = AdaptiveRateLimiter::new();
        let wait = limiter.calculate_wait_secs("fresh.example.com", 3).await;
        assert!((wait - 3.0).abs() < 1e-9);
    }
}
