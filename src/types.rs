use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One interview round as reported by a source adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundDetail {
    pub round_number: i32,
    pub description: String,
}

/// Outcome as parsed from the experience text. Never guessed beyond these three.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Offer,
    Rejected,
    Unknown,
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Unknown
    }
}

/// Difficulty cue as surfaced by C7's difficulty assessment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// The record an adapter hands to the crawl/persistence boundary (§6 schema).
/// Not yet a stored `InterviewExperience` — `time_weight` here is precomputed
/// at extraction time per the adapter's clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceRecord {
    pub title: String,
    pub content: String,
    pub source_url: String,
    pub source_platform: String,
    pub company: String,
    pub role: String,
    pub experience_date: DateTime<Utc>,
    pub rounds_count: i32,
    pub rounds_details: Vec<RoundDetail>,
    pub difficulty_indicators: Vec<Difficulty>,
    pub outcome: Outcome,
    pub time_weight: f64,
}

/// Stored experience (§3). Owned by exactly one company, identified by `source_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewExperience {
    pub id: Uuid,
    pub company: String,
    pub title: String,
    pub content: String,
    pub source_url: String,
    pub source_platform: String,
    pub role: String,
    pub experience_date: DateTime<Utc>,
    pub scraped_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub time_weight: f64,
    pub rounds_count: i32,
    pub rounds_details: Vec<RoundDetail>,
    pub difficulty_indicators: Vec<Difficulty>,
    pub outcome: Outcome,
    pub difficulty_score: Option<f64>,
}

impl InterviewExperience {
    pub fn success(&self) -> bool {
        matches!(self.outcome, Outcome::Offer)
    }

    pub fn from_record(record: ExperienceRecord, scraped_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company: record.company,
            title: record.title,
            content: record.content,
            source_url: record.source_url,
            source_platform: record.source_platform,
            role: record.role,
            experience_date: record.experience_date,
            scraped_at,
            processed_at: None,
            time_weight: record.time_weight,
            rounds_count: record.rounds_count,
            rounds_details: record.rounds_details,
            difficulty_indicators: record.difficulty_indicators,
            outcome: record.outcome,
            difficulty_score: None,
        }
    }
}

/// A single (experience, topic) scored occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicMention {
    pub experience_id: Uuid,
    pub topic: String,
    pub category: String,
    pub raw_count: u32,
    pub frequency_percent: f64,
    pub importance: f64,
    pub weighted_importance: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// Rolled-up per (company, topic) row. Replaced atomically on each regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyInsight {
    pub company: String,
    pub topic: String,
    pub category: String,
    pub weighted_frequency: f64,
    pub confidence: f64,
    pub sample_size: usize,
    pub priority: Priority,
    pub recommendation: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Parse a date the way adapters are required to: ISO-8601, RFC-2822, or a
/// handful of common human formats. Unknown/unparseable → `now - 30 days`.
pub fn parse_experience_date(raw: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.with_timezone(&Utc);
    }
    let formats = ["%d %B %Y", "%B %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];
    for fmt in formats {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(raw.trim(), fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return DateTime::from_naive_utc_and_offset(dt, Utc);
            }
        }
    }
    now - chrono::Duration::days(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso8601() {
        let now = Utc::now();
        let dt = parse_experience_date("2024-03-12T10:00:00Z", now);
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-12");
    }

    #[test]
    fn parses_human_format() {
        let now = Utc::now();
        let dt = parse_experience_date("12 March 2024", now);
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-03-12");
    }

    #[test]
    fn falls_back_on_unparseable() {
        let now = Utc::now();
        let dt = parse_experience_date("not a date", now);
        assert_eq!(dt, now - chrono::Duration::days(30));
    }
}
