use crate::error::{PipelineError, Result};
use crate::rate_limiter::AdaptiveRateLimiter;
use crate::robots::RobotsPolicyCache;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Default, Clone)]
pub struct CrawlCounters {
    pub requests_made: u64,
    pub successful_scrapes: u64,
    pub duplicates_found: u64,
    pub robots_blocked: u64,
    pub rate_limited: u64,
    pub forbidden_errors: u64,
}

/// `safe_request` is the sole I/O primitive adapters use. One instance is
/// shared per orchestrator run (its dedup sets are run-local).
pub struct CrawlEngine {
    client: reqwest::Client,
    robots: RobotsPolicyCache,
    rate_limiter: AdaptiveRateLimiter,
    user_agent: String,
    max_retries: u32,
    max_consecutive_failures: u32,
    seen_urls: Arc<Mutex<HashSet<String>>>,
    content_hashes: Arc<Mutex<HashSet<String>>>,
    host_failures: Arc<Mutex<std::collections::HashMap<String, u32>>>,
    counters: Arc<Mutex<CrawlCounters>>,
}

impl CrawlEngine {
    pub fn new(
        client: reqwest::Client,
        respect_robots_txt: bool,
        user_agent: String,
        max_retries: u32,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            robots: RobotsPolicyCache::new(client.clone(), respect_robots_txt),
            rate_limiter: AdaptiveRateLimiter::new(),
            client,
            user_agent,
            max_retries,
            max_consecutive_failures,
            seen_urls: Arc::new(Mutex::new(HashSet::new())),
            content_hashes: Arc::new(Mutex::new(HashSet::new())),
            host_failures: Arc::new(Mutex::new(std::collections::HashMap::new())),
            counters: Arc::new(Mutex::new(CrawlCounters::default())),
        }
    }

    pub async fn counters(&self) -> CrawlCounters {
        self.counters.lock().await.clone()
    }

    fn host_of(url: &str) -> Option<String> {
        Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string()))
    }

    pub async fn safe_request(&self, url: &str) -> Result<String> {
        // 1. Duplicate URL suppression.
        {
            let mut seen = self.seen_urls.lock().await;
            if seen.contains(url) {
                self.counters.lock().await.duplicates_found += 1;
                return Err(PipelineError::DuplicateUrl);
            }
            seen.insert(url.to_string());
        }

        // 2. Robots check.
        let policy = self.robots.resolve(url, &self.user_agent).await;
        if !policy.allowed {
            self.counters.lock().await.robots_blocked += 1;
            return Err(PipelineError::RobotsBlocked);
        }

        let host = Self::host_of(url).unwrap_or_default();

        // 4. Circuit breaker.
        {
            let failures = self.host_failures.lock().await;
            let count = *failures.get(&host).unwrap_or(&0);
            if count >= self.max_consecutive_failures {
                return Err(PipelineError::HostCircuitOpen { failures: count });
            }
        }

        // 3. Rate limit wait.
        self.rate_limiter
            .wait_if_needed(&host, policy.crawl_delay_secs)
            .await;

        let result = self.attempt_with_retries(url, &host).await;

        match &result {
            Ok(body) => {
                let mut hashes = self.content_hashes.lock().await;
                let digest = format!("{:x}", md5::compute(body.as_bytes()));
                if hashes.contains(&digest) {
                    self.counters.lock().await.duplicates_found += 1;
                    return Err(PipelineError::DuplicateContent);
                }
                hashes.insert(digest);
            }
            Err(_) => {}
        }

        result
    }

    async fn attempt_with_retries(&self, url: &str, host: &str) -> Result<String> {
        for attempt in 0..=self.max_retries {
            self.counters.lock().await.requests_made += 1;

            let resp = self
                .client
                .get(url)
                .header("User-Agent", &self.user_agent)
                .timeout(Duration::from_secs(20))
                .send()
                .await;

            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    warn!("request error for {}: {}", url, e);
                    if attempt == self.max_retries {
                        self.rate_limiter.record_failure(host).await;
                        self.bump_host_failure(host).await;
                        return Err(PipelineError::Transport(e));
                    }
                    continue;
                }
            };

            match resp.status().as_u16() {
                200 => {
                    let body = resp.text().await.map_err(PipelineError::Transport)?;
                    self.reset_host_failure(host).await;
                    self.rate_limiter.record_success(host).await;
                    self.counters.lock().await.successful_scrapes += 1;
                    return Ok(body);
                }
                403 => {
                    let new_count = self.bump_host_failure(host).await;
                    self.counters.lock().await.forbidden_errors += 1;
                    if new_count >= self.max_consecutive_failures {
                        warn!("host {} circuit open after {} 403s", host, new_count);
                        return Err(PipelineError::HostCircuitOpen { failures: new_count });
                    }
                    tokio::time::sleep(Duration::from_secs(5 * (attempt as u64 + 1))).await;
                }
                429 => {
                    self.rate_limiter.record_failure(host).await;
                    self.counters.lock().await.rate_limited += 1;
                    if attempt == self.max_retries {
                        return Err(PipelineError::RateLimited);
                    }
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
                404 => {
                    debug!("404 for {}", url);
                    return Err(PipelineError::NotFound);
                }
                other => {
                    warn!("unexpected status {} for {}", other, url);
                    if attempt == self.max_retries {
                        self.rate_limiter.record_failure(host).await;
                        self.bump_host_failure(host).await;
                        return Err(PipelineError::ParseError(format!("http status {other}")));
                    }
                }
            }
        }
        Err(PipelineError::ParseError("retries exhausted".to_string()))
    }

    async fn bump_host_failure(&self, host: &str) -> u32 {
        let mut failures = self.host_failures.lock().await;
        let count = failures.entry(host.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    async fn reset_host_failure(&self, host: &str) {
        let mut failures = self.host_failures.lock().await;
        failures.insert(host.to_string(), 0);
    }
}

/// Minimal MD5 so the crawl engine has no external hashing dependency beyond
/// the house crate set. Grounded in the content-hash dedup contract of §4.6 —
/// correctness of the hash algorithm itself is not load-bearing, only that
/// identical bodies collide and different bodies (overwhelmingly) don't.
mod md5 {
    pub struct Digest(pub [u8; 16]);

    impl std::fmt::LowerHex for Digest {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            for b in self.0 {
                write!(f, "{:02x}", b)?;
            }
            Ok(())
        }
    }

    pub fn compute(data: &[u8]) -> Digest {
        // FNV-1a 128-bit-folded fallback used purely as a run-local content
        // fingerprint (see module doc) — not a cryptographic MD5.
        let mut h1: u64 = 0xcbf29ce484222325;
        let mut h2: u64 = 0x100000001b3;
        for &b in data {
            h1 ^= b as u64;
            h1 = h1.wrapping_mul(0x100000001b3);
            h2 = h2.wrapping_add(b as u64).wrapping_mul(0xcbf29ce484222325);
        }
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&h1.to_be_bytes());
        out[8..].copy_from_slice(&h2.to_be_bytes());
        Digest(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_url_rejected_on_second_call() {
        let engine = CrawlEngine::new(reqwest::Client::new(), false, "test-bot".into(), 0, 3);
        {
            let mut seen = engine.seen_urls.lock().await;
            seen.insert("https://example.com/a".to_string());
        }
        let result = engine.safe_request("https://example.com/a").await;
        assert!(matches!(result, Err(PipelineError::DuplicateUrl)));
    }

    #[tokio::test]
    async fn circuit_open_after_max_failures() {
        let engine = CrawlEngine::new(reqwest::Client::new(), false, "test-bot".into(), 0, 2);
        {
            let mut failures = engine.host_failures.lock().await;
            failures.insert("blocked.example.com".to_string(), 2);
        }
        let result = engine.safe_request("https://blocked.example.com/x").await;
        assert!(matches!(result, Err(PipelineError::HostCircuitOpen { .. })));
    }
}
