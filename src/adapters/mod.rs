mod geeksforgeeks;
mod glassdoor;
mod leetcode;
mod reddit;

pub use geeksforgeeks::GeeksForGeeksAdapter;
pub use glassdoor::GlassdoorAdapter;
pub use leetcode::LeetCodeAdapter;
pub use reddit::RedditAdapter;

use crate::crawl::CrawlEngine;
use crate::error::Result;
use crate::types::ExperienceRecord;
use async_trait::async_trait;

/// Common shape every source adapter implements. The crawl engine is
/// injected rather than owned, so one engine's dedup/rate-limit state is
/// shared across every adapter touched in a single orchestrator run.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform_name(&self) -> &'static str;

    /// Best-effort URL discovery for `company`. An empty result is not an
    /// error — it just means this platform had nothing for this company.
    async fn discover_experience_urls(
        &self,
        engine: &CrawlEngine,
        company: &str,
        max_pages: usize,
    ) -> Result<Vec<String>>;

    async fn extract_experience_data(
        &self,
        engine: &CrawlEngine,
        url: &str,
        target_company: Option<&str>,
    ) -> Result<ExperienceRecord>;
}

/// Minimum content length below which an extracted record is discarded
/// rather than stored (mirrors the source scrapers' 100-char floor).
pub const MIN_CONTENT_CHARS: usize = 100;

pub(crate) fn role_from_text(text: &str) -> String {
    let lower = text.to_lowercase();
    const ROLE_PATTERNS: &[(&str, &[&str])] = &[
        ("SDE Intern", &["intern", "internship", "summer intern"]),
        ("SDE-3", &["sde-3", "sde 3", "senior sde", "staff engineer"]),
        ("SDE-2", &["sde-2", "sde 2", "sde ii"]),
        ("SDE-1", &["sde-1", "sde 1", "sde i"]),
        (
            "SDE",
            &["sde", "software development engineer", "software developer", "software engineer"],
        ),
    ];
    for (role, patterns) in ROLE_PATTERNS {
        if patterns.iter().any(|p| lower.contains(p)) {
            return role.to_string();
        }
    }
    "Software Engineer".to_string()
}

pub(crate) fn rounds_from_text(text: &str) -> (i32, Vec<crate::types::RoundDetail>) {
    use regex::Regex;
    use std::sync::OnceLock;
    static ROUND_SPLIT: OnceLock<Regex> = OnceLock::new();
    let re = ROUND_SPLIT.get_or_init(|| {
        Regex::new(r"(?i)round\s*\d+|\b(?:first|second|third|fourth|fifth)\s+round\b").unwrap()
    });

    let details: Vec<crate::types::RoundDetail> = re
        .find_iter(text)
        .enumerate()
        .map(|(i, m)| {
            let window_end = (m.end() + 160).min(text.len());
            let description = text[m.start()..window_end].trim().to_string();
            crate::types::RoundDetail {
                round_number: i as i32 + 1,
                description,
            }
        })
        .collect();

    (details.len() as i32, details)
}

pub(crate) fn difficulty_indicators_from_text(text: &str) -> Vec<crate::types::Difficulty> {
    use crate::types::Difficulty;
    let lower = text.to_lowercase();
    let mut out = Vec::new();
    if lower.contains("easy") || lower.contains("straightforward") {
        out.push(Difficulty::Easy);
    }
    if lower.contains("medium") || lower.contains("moderate") {
        out.push(Difficulty::Medium);
    }
    if lower.contains("hard") || lower.contains("difficult") || lower.contains("challenging") {
        out.push(Difficulty::Hard);
    }
    out
}

pub(crate) fn outcome_from_text(text: &str) -> crate::types::Outcome {
    use crate::types::Outcome;
    let lower = text.to_lowercase();
    if lower.contains("got an offer")
        || lower.contains("received offer")
        || lower.contains("got the offer")
        || lower.contains("selected")
    {
        Outcome::Offer
    } else if lower.contains("rejected") || lower.contains("did not get") || lower.contains("didn't get") {
        Outcome::Rejected
    } else {
        Outcome::Unknown
    }
}
