use super::{difficulty_indicators_from_text, outcome_from_text, role_from_text, rounds_from_text, MIN_CONTENT_CHARS, SourceAdapter};
use crate::company::extract_company;
use crate::crawl::CrawlEngine;
use crate::error::{PipelineError, Result};
use crate::types::{parse_experience_date, ExperienceRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

const DISCUSS_SEARCH_URL: &str = "https://leetcode.com/discuss/api/search";

/// JSON-search adapter for LeetCode's discuss forum. Discussion posts are
/// fetched as JSON (no HTML parsing needed); the body of the post is the
/// experience content.
pub struct LeetCodeAdapter;

impl LeetCodeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeetCodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct DiscussSearchResponse {
    #[serde(default)]
    topics: Vec<DiscussTopic>,
}

#[derive(Debug, Deserialize)]
struct DiscussTopic {
    id: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct DiscussPost {
    title: String,
    content: String,
    #[serde(default)]
    creation_date: Option<String>,
}

#[async_trait]
impl SourceAdapter for LeetCodeAdapter {
    fn platform_name(&self) -> &'static str {
        "leetcode"
    }

    async fn discover_experience_urls(
        &self,
        engine: &CrawlEngine,
        company: &str,
        max_pages: usize,
    ) -> Result<Vec<String>> {
        let query = format!("{company} interview experience");
        let search_url = format!(
            "{DISCUSS_SEARCH_URL}?query={}",
            urlencode(&query)
        );

        let body = match engine.safe_request(&search_url).await {
            Ok(b) => b,
            Err(PipelineError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let parsed: DiscussSearchResponse = serde_json::from_str(&body)
            .map_err(|e| PipelineError::ParseError(format!("leetcode discuss JSON: {e}")))?;

        let urls: Vec<String> = parsed
            .topics
            .into_iter()
            .filter(|t| is_interview_post_title(&t.title))
            .take(max_pages)
            .map(|t| format!("https://leetcode.com/discuss/post/{}", t.id))
            .collect();

        Ok(urls)
    }

    async fn extract_experience_data(
        &self,
        engine: &CrawlEngine,
        url: &str,
        target_company: Option<&str>,
    ) -> Result<ExperienceRecord> {
        let post_id = url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::ParseError("malformed leetcode url".to_string()))?;
        let api_url = format!("https://leetcode.com/discuss/api/post/{post_id}");
        let body = engine.safe_request(&api_url).await?;

        let post: DiscussPost = serde_json::from_str(&body)
            .map_err(|e| PipelineError::ParseError(format!("leetcode post JSON: {e}")))?;

        if post.content.len() < MIN_CONTENT_CHARS {
            return Err(PipelineError::ShortContent { min: MIN_CONTENT_CHARS });
        }

        let now = Utc::now();
        let experience_date = post
            .creation_date
            .map(|raw| parse_experience_date(&raw, now))
            .unwrap_or(now - chrono::Duration::days(30));

        let company = extract_company(&post.title, &post.content, target_company);
        let role = role_from_text(&format!("{} {}", post.title, post.content));
        let (rounds_count, rounds_details) = rounds_from_text(&post.content);

        Ok(ExperienceRecord {
            title: post.title,
            content: post.content.clone(),
            source_url: url.to_string(),
            source_platform: self.platform_name().to_string(),
            company,
            role,
            experience_date,
            rounds_count,
            rounds_details,
            difficulty_indicators: difficulty_indicators_from_text(&post.content),
            outcome: outcome_from_text(&post.content),
            time_weight: 1.0,
        })
    }
}

fn is_interview_post_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.contains("interview") || lower.contains("onsite") || lower.contains("oa ")
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_non_interview_titles() {
        assert!(is_interview_post_title("Amazon Onsite Interview Experience"));
        assert!(!is_interview_post_title("Best sorting algorithm explained"));
    }
}
