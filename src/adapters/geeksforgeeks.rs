use super::{difficulty_indicators_from_text, outcome_from_text, role_from_text, rounds_from_text, MIN_CONTENT_CHARS, SourceAdapter};
use crate::company::extract_company;
use crate::crawl::CrawlEngine;
use crate::error::{PipelineError, Result};
use crate::types::{parse_experience_date, ExperienceRecord};
use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};

const BASE_URL: &str = "https://www.geeksforgeeks.org";

/// Blog-style adapter: discovers company article pages and known URL
/// patterns, then scrapes a single article per URL with CSS-selector
/// fallback chains (grounded on the GeeksforGeeks scraper's multi-selector
/// strategy — a page's markup varies by era, so no single selector works
/// for the whole corpus).
pub struct GeeksForGeeksAdapter;

impl GeeksForGeeksAdapter {
    pub fn new() -> Self {
        Self
    }

    fn company_slug(company: &str) -> String {
        company.to_lowercase().replace(' ', "-")
    }
}

impl Default for GeeksForGeeksAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for GeeksForGeeksAdapter {
    fn platform_name(&self) -> &'static str {
        "geeksforgeeks"
    }

    async fn discover_experience_urls(
        &self,
        engine: &CrawlEngine,
        company: &str,
        max_pages: usize,
    ) -> Result<Vec<String>> {
        let slug = Self::company_slug(company);
        let mut urls = Vec::new();

        let articles_url = format!("{BASE_URL}/companies/{slug}/articles/");
        if let Ok(body) = engine.safe_request(&articles_url).await {
            urls.extend(extract_experience_links(&body));
        }

        if urls.len() < max_pages {
            let candidates = [
                format!("{BASE_URL}/{slug}-interview-experience"),
                format!("{BASE_URL}/{slug}-software-engineer-interview-experience"),
                format!("{BASE_URL}/{slug}-sde-interview-experience"),
            ];
            for candidate in candidates {
                if urls.len() >= max_pages {
                    break;
                }
                if engine.safe_request(&candidate).await.is_ok() {
                    urls.push(candidate);
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
        let body = engine.safe_request(url).await?;
        let document = Html::parse_document(&body);

        let title = extract_with_fallbacks(
            &document,
            &["h1.entry-title", "h1.article-title", "h1", ".page-title", "title"],
        )
        .ok_or_else(|| PipelineError::ParseError("no title found".to_string()))?;
        if title.len() <= 10 {
            return Err(PipelineError::ParseError("title too short".to_string()));
        }

        let content = extract_with_fallbacks(
            &document,
            &[".entry-content", ".article-content", ".post-content", "article", ".content", "main"],
        )
        .unwrap_or_default();
        if content.len() < MIN_CONTENT_CHARS {
            return Err(PipelineError::ShortContent { min: MIN_CONTENT_CHARS });
        }

        let now = Utc::now();
        let experience_date = extract_date_text(&document)
            .map(|raw| parse_experience_date(&raw, now))
            .unwrap_or(now - chrono::Duration::days(30));

        let company = extract_company(&title, &content, target_company);
        let role = role_from_text(&format!("{title} {content}"));
        let (rounds_count, rounds_details) = rounds_from_text(&content);

        Ok(ExperienceRecord {
            title,
            content: content.clone(),
            source_url: url.to_string(),
            source_platform: self.platform_name().to_string(),
            company,
            role,
            experience_date,
            rounds_count,
            rounds_details,
            difficulty_indicators: difficulty_indicators_from_text(&content),
            outcome: outcome_from_text(&content),
            time_weight: 1.0,
        })
    }
}

fn extract_experience_links(body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains("interview-experience"))
        .map(|href| {
            if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{BASE_URL}{href}")
            }
        })
        .collect()
}

fn extract_with_fallbacks(document: &Html, selectors: &[&str]) -> Option<String> {
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(el) = document.select(&selector).next() {
                let text: String = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn extract_date_text(document: &Html) -> Option<String> {
    for sel in [".entry-date", ".published-date", ".post-date", "time[datetime]"] {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(el) = document.select(&selector).next() {
                if let Some(dt) = el.value().attr("datetime") {
                    return Some(dt.to_string());
                }
                let text = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}
