use moka::future::Cache;
use std::time::Duration;
use url::Url;

const ROBOTS_TTL_SECS: u64 = 3600;
const MIN_CRAWL_DELAY: u64 = 2;
const DEFAULT_FALLBACK_DELAY: u64 = 5;

#[derive(Debug, Clone, Copy)]
pub struct RobotsPolicy {
    pub allowed: bool,
    pub crawl_delay_secs: u64,
}

/// Resolves per-host crawl permission and crawl-delay, caching results
/// (including the "no robots file" null result) under a 1-hour TTL.
///
/// Entries are stored per (host, user_agent) — moka's own `time_to_live`
/// does the staleness bookkeeping that the source's manual timestamp
/// comparison reimplemented by hand.
pub struct RobotsPolicyCache {
    cache: Cache<String, RobotsPolicy>,
    client: reqwest::Client,
    respect_robots_txt: bool,
}

impl RobotsPolicyCache {
    pub fn new(client: reqwest::Client, respect_robots_txt: bool) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(ROBOTS_TTL_SECS))
                .build(),
            client,
            respect_robots_txt,
        }
    }

    pub async fn resolve(&self, url: &str, user_agent: &str) -> RobotsPolicy {
        if !self.respect_robots_txt {
            return RobotsPolicy {
                allowed: true,
                crawl_delay_secs: DEFAULT_FALLBACK_DELAY.max(MIN_CRAWL_DELAY),
            };
        }

        let Ok(parsed) = Url::parse(url) else {
            return self.fallback_policy();
        };
        let Some(host) = parsed.host_str() else {
            return self.fallback_policy();
        };
        let scheme = parsed.scheme();
        let key = format!("{host}|{user_agent}");

        if let Some(cached) = self.cache.get(&key).await {
            return cached;
        }

        let policy = self
            .fetch_and_parse(scheme, host, user_agent)
            .await
            .unwrap_or_else(|| self.fallback_policy());
        self.cache.insert(key, policy).await;
        policy
    }

    fn fallback_policy(&self) -> RobotsPolicy {
        RobotsPolicy {
            allowed: true,
            crawl_delay_secs: DEFAULT_FALLBACK_DELAY.max(MIN_CRAWL_DELAY),
        }
    }

    async fn fetch_and_parse(
        &self,
        scheme: &str,
        host: &str,
        user_agent: &str,
    ) -> Option<RobotsPolicy> {
        let robots_url = format!("{scheme}://{host}/robots.txt");
        let resp = self
            .client
            .get(&robots_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body = resp.text().await.ok()?;
        Some(parse_robots_txt(&body, user_agent))
    }
}

/// Parse a robots.txt body for the given user agent. Falls back to the `*`
/// group when no agent-specific group exists.
fn parse_robots_txt(body: &str, user_agent: &str) -> RobotsPolicy {
    let mut current_group_matches = false;
    let mut matched_any_specific = false;
    let mut allowed = true;
    let mut crawl_delay: Option<u64> = None;
    let mut wildcard_allowed = true;
    let mut wildcard_delay: Option<u64> = None;
    let mut in_wildcard_group = false;

    let ua_lower = user_agent.to_ascii_lowercase();

    for raw_line in body.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                let agent = value.to_ascii_lowercase();
                in_wildcard_group = agent == "*";
                current_group_matches = ua_lower.contains(&agent) && agent != "*";
                if current_group_matches {
                    matched_any_specific = true;
                }
            }
            "disallow" => {
                if current_group_matches && !value.is_empty() {
                    allowed = false;
                }
                if in_wildcard_group && !value.is_empty() {
                    wildcard_allowed = false;
                }
            }
            "crawl-delay" => {
                if let Ok(secs) = value.parse::<u64>() {
                    if current_group_matches {
                        crawl_delay = Some(secs);
                    }
                    if in_wildcard_group {
                        wildcard_delay = Some(secs);
                    }
                }
            }
            _ => {}
        }
    }

    let (final_allowed, final_delay) = if matched_any_specific {
        (allowed, crawl_delay)
    } else {
        (wildcard_allowed, wildcard_delay)
    };

    RobotsPolicy {
        allowed: final_allowed,
        crawl_delay_secs: final_delay.unwrap_or(DEFAULT_FALLBACK_DELAY).max(MIN_CRAWL_DELAY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallow_for_matching_agent() {
        let body = "User-agent: *\nDisallow: /private\n";
        let policy = parse_robots_txt(body, "Interview Intelligence Research Bot 1.0");
        assert!(!policy.allowed);
    }

    #[test]
    fn allows_when_no_matching_disallow() {
        let body = "User-agent: *\nDisallow:\nCrawl-delay: 10\n";
        let policy = parse_robots_txt(body, "Interview Intelligence Research Bot 1.0");
        assert!(policy.allowed);
        assert_eq!(policy.crawl_delay_secs, 10);
    }

    #[test]
    fn crawl_delay_never_below_minimum() {
        let body = "User-agent: *\nCrawl-delay: 0\n";
        let policy = parse_robots_txt(body, "bot");
        assert_eq!(policy.crawl_delay_secs, MIN_CRAWL_DELAY);
    }

    #[tokio::test]
    async fn disabled_respect_flag_always_allows() {
        let cache = RobotsPolicyCache::new(reqwest::Client::new(), false);
        let policy = cache.resolve("https://example.com/page", "bot").await;
        assert!(policy.allowed);
        assert_eq!(policy.crawl_delay_secs, DEFAULT_FALLBACK_DELAY);
    }
}
