// ---------------------------------------------------------------------------
// PipelineConfig — file-based config loader (interview-intel.json) with
// env-var fallback, mirroring the house ShadowConfig pattern: every field is
// resolved file → env → hardcoded default, never silently panics on a
// missing or malformed file.
// ---------------------------------------------------------------------------

/// Raw, optional-everywhere shape deserialized from `interview-intel.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct PipelineConfig {
    pub user_agent: Option<String>,
    pub request_delay: Option<u64>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_consecutive_failures: Option<u32>,
    pub respect_robots_txt: Option<bool>,
    pub decay_lambda: Option<f64>,
    pub max_age_months: Option<u32>,
    pub target_companies: Option<Vec<String>>,
    pub min_sample_size: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub trend_significance_threshold: Option<f64>,
}

pub const ENV_USER_AGENT: &str = "USER_AGENT";
pub const ENV_REQUEST_DELAY: &str = "REQUEST_DELAY";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
pub const ENV_TIMEOUT: &str = "TIMEOUT";
pub const ENV_MAX_CONSECUTIVE_FAILURES: &str = "MAX_CONSECUTIVE_FAILURES";
pub const ENV_RESPECT_ROBOTS_TXT: &str = "RESPECT_ROBOTS_TXT";
pub const ENV_DECAY_LAMBDA: &str = "DECAY_LAMBDA";
pub const ENV_MAX_AGE_MONTHS: &str = "MAX_AGE_MONTHS";
pub const ENV_TARGET_COMPANIES: &str = "TARGET_COMPANIES";
pub const ENV_MIN_SAMPLE_SIZE: &str = "MIN_SAMPLE_SIZE";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";
pub const ENV_TREND_SIGNIFICANCE_THRESHOLD: &str = "TREND_SIGNIFICANCE_THRESHOLD";

impl PipelineConfig {
    pub fn resolve_user_agent(&self) -> String {
        if let Some(v) = &self.user_agent {
            if !v.trim().is_empty() {
                return v.clone();
            }
        }
        std::env::var(ENV_USER_AGENT)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "Interview Intelligence Research Bot 1.0".to_string())
    }

    pub fn resolve_request_delay(&self) -> u64 {
        self.request_delay.unwrap_or_else(|| {
            std::env::var(ENV_REQUEST_DELAY)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1)
        })
    }

    pub fn resolve_max_retries(&self) -> u32 {
        self.max_retries.unwrap_or_else(|| {
            std::env::var(ENV_MAX_RETRIES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2)
        })
    }

    pub fn resolve_timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or_else(|| {
            std::env::var(ENV_TIMEOUT)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20)
        })
    }

    pub fn resolve_max_consecutive_failures(&self) -> u32 {
        self.max_consecutive_failures.unwrap_or_else(|| {
            std::env::var(ENV_MAX_CONSECUTIVE_FAILURES)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3)
        })
    }

    /// Default `false` — research mode does not consult robots.txt unless
    /// explicitly turned on.
    pub fn resolve_respect_robots_txt(&self) -> bool {
        if let Some(v) = self.respect_robots_txt {
            return v;
        }
        std::env::var(ENV_RESPECT_ROBOTS_TXT)
            .ok()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }

    pub fn resolve_decay_lambda(&self) -> f64 {
        self.decay_lambda.unwrap_or_else(|| {
            std::env::var(ENV_DECAY_LAMBDA)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.08)
        })
    }

    pub fn resolve_max_age_months(&self) -> u32 {
        self.max_age_months.unwrap_or_else(|| {
            std::env::var(ENV_MAX_AGE_MONTHS)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60)
        })
    }

    pub fn resolve_target_companies(&self) -> Vec<String> {
        if let Some(v) = &self.target_companies {
            if !v.is_empty() {
                return v.clone();
            }
        }
        std::env::var(ENV_TARGET_COMPANIES)
            .ok()
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_else(|| vec!["Amazon".to_string(), "Google".to_string(), "Microsoft".to_string()])
    }

    pub fn resolve_min_sample_size(&self) -> usize {
        self.min_sample_size.unwrap_or_else(|| {
            std::env::var(ENV_MIN_SAMPLE_SIZE)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3)
        })
    }

    pub fn resolve_confidence_threshold(&self) -> f64 {
        self.confidence_threshold.unwrap_or_else(|| {
            std::env::var(ENV_CONFIDENCE_THRESHOLD)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7)
        })
    }

    pub fn resolve_trend_significance_threshold(&self) -> f64 {
        self.trend_significance_threshold.unwrap_or_else(|| {
            std::env::var(ENV_TREND_SIGNIFICANCE_THRESHOLD)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.15)
        })
    }
}

/// Load `interview-intel.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `./interview-intel.json`
/// 2. `../interview-intel.json`
/// 3. `INTERVIEW_INTEL_CONFIG` env var path
///
/// Missing file → `PipelineConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `PipelineConfig::default()`.
pub fn load_config() -> PipelineConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("interview-intel.json"),
            std::path::PathBuf::from("../interview-intel.json"),
        ];
        if let Ok(env_path) = std::env::var("INTERVIEW_INTEL_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                return match serde_json::from_str::<PipelineConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::info!("interview-intel.json loaded from {}", path.display());
                        cfg
                    }
                    Err(e) => {
                        tracing::warn!(
                            "interview-intel.json parse error at {}: {} — using defaults",
                            path.display(),
                            e
                        );
                        PipelineConfig::default()
                    }
                };
            }
            Err(_) => continue,
        }
    }

    PipelineConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.resolve_max_retries(), 2);
        assert_eq!(cfg.resolve_max_consecutive_failures(), 3);
        assert!((cfg.resolve_decay_lambda() - 0.08).abs() < 1e-9);
        assert_eq!(cfg.resolve_min_sample_size(), 3);
    }

    #[test]
    fn file_value_overrides_default() {
        let cfg = PipelineConfig {
            max_retries: Some(5),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_max_retries(), 5);
    }
}
