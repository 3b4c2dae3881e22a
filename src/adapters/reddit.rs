use super::{difficulty_indicators_from_text, outcome_from_text, role_from_text, rounds_from_text, MIN_CONTENT_CHARS, SourceAdapter};
use crate::company::extract_company;
use crate::crawl::CrawlEngine;
use crate::error::{PipelineError, Result};
use crate::types::ExperienceRecord;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const SUBREDDITS: &[&str] = &[
    "cscareerquestions",
    "ExperiencedDevs",
    "interviews",
    "leetcode",
    "ITCareerQuestions",
    "cscareerquestionsEU",
];

fn interview_pattern() -> &'static Regex {
    static CACHE: OnceLock<Regex> = OnceLock::new();
    CACHE.get_or_init(|| {
        Regex::new(r"(?i)interview|onsite|phone\s*screen|oa\b").unwrap()
    })
}

/// Public-JSON-API forum adapter. Reddit's `.json` suffix on any listing or
/// search endpoint returns structured data with no authentication, so no
/// HTML parsing is needed — only a precise interview-pattern filter on
/// titles, since career subreddits are full of unrelated posts.
pub struct RedditAdapter;

impl RedditAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RedditAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    permalink: String,
    title: String,
    #[serde(default)]
    selftext: String,
    created_utc: f64,
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn platform_name(&self) -> &'static str {
        "reddit"
    }

    async fn discover_experience_urls(
        &self,
        engine: &CrawlEngine,
        company: &str,
        max_pages: usize,
    ) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let query = format!("{company} interview experience");

        for subreddit in SUBREDDITS {
            if urls.len() >= max_pages {
                break;
            }
            let search_url = format!(
                "https://www.reddit.com/r/{subreddit}/search.json?q={}&restrict_sr=on&sort=relevance&limit=25&t=all",
                url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>()
            );

            let body = match engine.safe_request(&search_url).await {
                Ok(b) => b,
                Err(PipelineError::NotFound) | Err(PipelineError::RobotsBlocked) => continue,
                Err(e) => return Err(e),
            };

            let listing: Listing = match serde_json::from_str(&body) {
                Ok(l) => l,
                Err(_) => continue,
            };

            for child in listing.data.children {
                if is_interview_post(&child.data.title, company) {
                    urls.push(format!("https://www.reddit.com{}", child.data.permalink));
                }
            }
        }

        urls.truncate(max_pages);
        Ok(urls)
    }

    async fn extract_experience_data(
        &self,
        engine: &CrawlEngine,
        url: &str,
        target_company: Option<&str>,
    ) -> Result<ExperienceRecord> {
        let json_url = format!("{}.json", url.trim_end_matches('/'));
        let body = engine.safe_request(&json_url).await?;

        let listings: Vec<Listing> = serde_json::from_str(&body)
            .map_err(|e| PipelineError::ParseError(format!("reddit post JSON: {e}")))?;
        let post = listings
            .into_iter()
            .flat_map(|l| l.data.children)
            .map(|c| c.data)
            .next()
            .ok_or_else(|| PipelineError::ParseError("no post data in reddit response".to_string()))?;

        if post.selftext.len() < MIN_CONTENT_CHARS {
            return Err(PipelineError::ShortContent { min: MIN_CONTENT_CHARS });
        }

        let experience_date = Utc
            .timestamp_opt(post.created_utc as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let company = extract_company(&post.title, &post.selftext, target_company);
        let role = role_from_text(&format!("{} {}", post.title, post.selftext));
        let (rounds_count, rounds_details) = rounds_from_text(&post.selftext);

        Ok(ExperienceRecord {
            title: post.title,
            content: post.selftext.clone(),
            source_url: url.to_string(),
            source_platform: self.platform_name().to_string(),
            company,
            role,
            experience_date,
            rounds_count,
            rounds_details,
            difficulty_indicators: difficulty_indicators_from_text(&post.selftext),
            outcome: outcome_from_text(&post.selftext),
            time_weight: 1.0,
        })
    }
}

fn is_interview_post(title: &str, company: &str) -> bool {
    let lower = title.to_lowercase();
    interview_pattern().is_match(&lower) && lower.contains(&company.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_title_mentioning_company_and_interview() {
        assert!(is_interview_post("My Amazon interview experience", "Amazon"));
        assert!(!is_interview_post("My Amazon vacation story", "Amazon"));
        assert!(!is_interview_post("My Google interview experience", "Amazon"));
    }
}
