use crate::decay::DecayCalculator;
use crate::types::{Difficulty, InterviewExperience, Priority, TopicMention};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// C8's fixed half-life cutoff for its own temporal split. Distinct from
/// `DecayCalculator::trend_analysis`'s date-range midpoint split (§4.3) —
/// this one is always 180 days back from `now`, per §4.8.
const TEMPORAL_SPLIT_DAYS: i64 = 180;
const TREND_CHANGE_THRESHOLD: f64 = 0.20;
const COMMON_ROUND_THRESHOLD: f64 = 0.30;
const ROUND_CONFIDENCE_FLOOR: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct DataQuality {
    pub quality_score: f64,
    pub sample_adequacy: &'static str,
    pub confidence_level: &'static str,
}

#[derive(Debug, Clone)]
pub struct TopicInsight {
    pub topic: String,
    pub category: String,
    pub weighted_frequency: f64,
    pub avg_importance: f64,
    pub avg_confidence: f64,
    pub freq_std_dev: f64,
    pub sample_size: usize,
    pub priority: Priority,
    pub actionable_insight: String,
    pub difficulty_assessment: Option<Difficulty>,
}

#[derive(Debug, Clone)]
pub struct TopicDistribution {
    pub by_category: HashMap<String, f64>,
    pub by_priority: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct DifficultyRollup {
    pub majority: Option<Difficulty>,
    pub percentage: f64,
    pub avg_confidence: f64,
}

#[derive(Debug, Clone)]
pub struct RoundInsight {
    pub round: String,
    pub frequency_percent: f64,
    pub common: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone)]
pub struct TopicTrend {
    pub topic: String,
    pub direction: TrendDirection,
    pub relative_change: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TemporalTrends {
    pub trending_up: Vec<TopicTrend>,
    pub trending_down: Vec<TopicTrend>,
}

#[derive(Debug, Clone)]
pub struct FocusItem {
    pub topic: String,
    pub hours: u32,
}

#[derive(Debug, Clone)]
pub struct StudyRecommendations {
    pub immediate_focus: Vec<FocusItem>,
    pub secondary_focus: Vec<FocusItem>,
}

#[derive(Debug, Clone)]
pub struct PreparationStrategy {
    pub timeline: &'static str,
    pub practice_distribution: HashMap<&'static str, f64>,
    pub key_recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SuccessFactor {
    pub topic: String,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub delta: f64,
}

#[derive(Debug, Clone)]
pub struct ComparativeAnalysis {
    pub comparison_available: bool,
    pub note: &'static str,
}

#[derive(Debug, Clone)]
pub struct CompanyInsightsReport {
    pub company: String,
    pub sample_size: usize,
    pub data_quality: DataQuality,
    pub topic_insights: Vec<TopicInsight>,
    pub top_5: Vec<String>,
    pub high_priority: Vec<String>,
    pub topic_distribution: TopicDistribution,
    pub difficulty_analysis: DifficultyRollup,
    pub interview_process_insights: Vec<RoundInsight>,
    pub temporal_trends: TemporalTrends,
    pub study_recommendations: StudyRecommendations,
    pub preparation_strategy: PreparationStrategy,
    pub success_factors: Vec<SuccessFactor>,
    pub statistical_confidence: f64,
    pub comparative_analysis: ComparativeAnalysis,
}

#[derive(Debug, Clone)]
pub enum InsightsResult {
    InsufficientData { have: usize, need: usize },
    Ready(Box<CompanyInsightsReport>),
}

/// Aggregates persisted `TopicMention`s and `InterviewExperience`s for one
/// company into the full insights report. Gated by `min_sample_size` — below
/// it, every other computation is skipped rather than emitted on thin data.
pub fn generate_comprehensive_insights(
    company: &str,
    experiences: &[InterviewExperience],
    mentions: &[TopicMention],
    decay: &DecayCalculator,
    min_sample_size: usize,
    now: DateTime<Utc>,
) -> InsightsResult {
    if experiences.len() < min_sample_size {
        return InsightsResult::InsufficientData {
            have: experiences.len(),
            need: min_sample_size,
        };
    }

    let data_quality = assess_data_quality(experiences, mentions);
    let mut topic_insights = generate_topic_insights(experiences, mentions);
    topic_insights.sort_by(|a, b| b.weighted_frequency.partial_cmp(&a.weighted_frequency).unwrap());

    let top_5: Vec<String> = topic_insights.iter().take(5).map(|t| t.topic.clone()).collect();
    let high_priority: Vec<String> = topic_insights
        .iter()
        .filter(|t| t.priority == Priority::High)
        .map(|t| t.topic.clone())
        .collect();
    let topic_distribution = calculate_topic_distribution(&topic_insights);

    let difficulty_analysis = analyze_difficulty_trends(experiences);
    let interview_process_insights = analyze_interview_process(experiences);
    let temporal_trends = analyze_temporal_trends(experiences, mentions, now);
    let study_recommendations = generate_study_recommendations(&topic_insights);
    let preparation_strategy = generate_preparation_strategy(&difficulty_analysis);
    let success_factors = identify_success_factors(experiences, mentions);
    let statistical_confidence = calculate_statistical_confidence(experiences, mentions);

    InsightsResult::Ready(Box::new(CompanyInsightsReport {
        company: company.to_string(),
        sample_size: experiences.len(),
        data_quality,
        topic_insights,
        top_5,
        high_priority,
        topic_distribution,
        difficulty_analysis,
        interview_process_insights,
        temporal_trends,
        study_recommendations,
        preparation_strategy,
        success_factors,
        statistical_confidence,
        comparative_analysis: ComparativeAnalysis {
            comparison_available: false,
            note: "cross-company comparison requires a second company's insights; not computed here",
        },
    }))
}

fn sample_adequacy(n: usize) -> &'static str {
    if n >= 15 {
        "excellent"
    } else if n >= 8 {
        "good"
    } else if n >= 5 {
        "adequate"
    } else if n >= 3 {
        "minimal"
    } else {
        "insufficient"
    }
}

fn confidence_bucket(avg_conf: f64) -> &'static str {
    if avg_conf >= 0.8 {
        "high"
    } else if avg_conf >= 0.6 {
        "medium"
    } else if avg_conf >= 0.4 {
        "low"
    } else {
        "very_low"
    }
}

fn assess_data_quality(experiences: &[InterviewExperience], mentions: &[TopicMention]) -> DataQuality {
    let content_score = {
        let avg_len = experiences.iter().map(|e| e.content.len() as f64).sum::<f64>()
            / experiences.len() as f64;
        (avg_len / 500.0).min(1.0)
    };
    let confidence_score = if mentions.is_empty() {
        0.0
    } else {
        mentions.iter().map(|m| m.confidence).sum::<f64>() / mentions.len() as f64
    };
    let topic_diversity_score = {
        let unique: std::collections::HashSet<&str> =
            mentions.iter().map(|m| m.topic.as_str()).collect();
        (unique.len() as f64 / 10.0).min(1.0)
    };
    let sample_score = (experiences.len() as f64 / 15.0).min(1.0);

    let quality_score =
        (content_score + confidence_score + topic_diversity_score + sample_score) / 4.0;

    DataQuality {
        quality_score,
        sample_adequacy: sample_adequacy(experiences.len()),
        confidence_level: confidence_bucket(confidence_score),
    }
}

/// Combined priority score: `freq·0.4 + importance·0.4 + confidence·20·0.2`.
/// HIGH requires both the score and the confidence floor; MEDIUM relaxes both.
fn determine_priority_level(weighted_frequency: f64, avg_importance: f64, avg_confidence: f64) -> Priority {
    let score = weighted_frequency * 0.4 + avg_importance * 0.4 + avg_confidence * 20.0 * 0.2;
    if score >= 15.0 && avg_confidence >= 0.7 {
        Priority::High
    } else if score >= 8.0 && avg_confidence >= 0.5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn generate_topic_insights(
    experiences: &[InterviewExperience],
    mentions: &[TopicMention],
) -> Vec<TopicInsight> {
    let time_weights: HashMap<Uuid, f64> = experiences.iter().map(|e| (e.id, e.time_weight)).collect();

    let mut by_topic: HashMap<(String, String), Vec<&TopicMention>> = HashMap::new();
    for m in mentions {
        by_topic
            .entry((m.category.clone(), m.topic.clone()))
            .or_default()
            .push(m);
    }

    by_topic
        .into_iter()
        .map(|((category, topic), group)| {
            let n = group.len() as f64;
            // weighted_frequency = Σ(frequency% · exp.time_weight) / Σ(exp.time_weight) · 100
            let weighted_frequency = {
                let weight_of = |m: &&TopicMention| {
                    time_weights.get(&m.experience_id).copied().unwrap_or(1.0)
                };
                let weight_sum: f64 = group.iter().map(weight_of).sum();
                if weight_sum > 0.0 {
                    let numerator: f64 = group.iter().map(|m| m.frequency_percent * weight_of(m)).sum();
                    numerator / weight_sum * 100.0
                } else {
                    0.0
                }
            };
            let avg_importance = group.iter().map(|m| m.importance).sum::<f64>() / n;
            let avg_confidence = group.iter().map(|m| m.confidence).sum::<f64>() / n;
            let mean_freq_pct = group.iter().map(|m| m.frequency_percent).sum::<f64>() / n;
            let freq_std_dev = {
                let variance = group
                    .iter()
                    .map(|m| (m.frequency_percent - mean_freq_pct).powi(2))
                    .sum::<f64>()
                    / n;
                variance.sqrt()
            };
            let priority = determine_priority_level(weighted_frequency, avg_importance, avg_confidence);
            let difficulty_assessment = assess_topic_difficulty(&topic, experiences, &group);
            let actionable_insight = format!(
                "{topic} appears across {count} mention(s) in this company's interviews \
                 (avg confidence {conf:.0}%); prioritize it as a {priority} focus area.",
                topic = topic,
                count = group.len(),
                conf = avg_confidence * 100.0,
                priority = priority,
            );

            TopicInsight {
                topic,
                category,
                weighted_frequency,
                avg_importance,
                avg_confidence,
                freq_std_dev,
                sample_size: group.len(),
                priority,
                actionable_insight,
                difficulty_assessment,
            }
        })
        .collect()
}

/// Majority-vote difficulty restricted to experiences that actually mention
/// this topic (per §4.8 — not the experience-wide difficulty rollup).
fn assess_topic_difficulty(
    _topic: &str,
    experiences: &[InterviewExperience],
    mentions: &[&TopicMention],
) -> Option<Difficulty> {
    let exp_ids: std::collections::HashSet<_> = mentions.iter().map(|m| m.experience_id).collect();
    let mut counts: HashMap<Difficulty, u32> = HashMap::new();
    for exp in experiences.iter().filter(|e| exp_ids.contains(&e.id)) {
        for d in &exp.difficulty_indicators {
            *counts.entry(*d).or_insert(0) += 1;
        }
    }
    counts.into_iter().max_by_key(|(_, c)| *c).map(|(d, _)| d)
}

fn calculate_topic_distribution(topics: &[TopicInsight]) -> TopicDistribution {
    let total = topics.len().max(1) as f64;
    let mut by_category: HashMap<String, f64> = HashMap::new();
    let mut by_priority: HashMap<String, f64> = HashMap::new();

    for t in topics {
        *by_category.entry(t.category.clone()).or_insert(0.0) += 100.0 / total;
        *by_priority.entry(t.priority.to_string()).or_insert(0.0) += 100.0 / total;
    }

    TopicDistribution { by_category, by_priority }
}

fn analyze_difficulty_trends(experiences: &[InterviewExperience]) -> DifficultyRollup {
    let mut counts: HashMap<Difficulty, u32> = HashMap::new();
    let mut total = 0u32;
    for exp in experiences {
        for d in &exp.difficulty_indicators {
            *counts.entry(*d).or_insert(0) += 1;
            total += 1;
        }
    }
    if total == 0 {
        return DifficultyRollup {
            majority: None,
            percentage: 0.0,
            avg_confidence: 0.0,
        };
    }
    let (majority, count) = counts.iter().max_by_key(|(_, c)| **c).map(|(d, c)| (*d, *c)).unwrap();
    let scores: Vec<f64> = experiences
        .iter()
        .filter_map(|e| e.difficulty_score)
        .collect();
    let avg_confidence = if scores.is_empty() {
        count as f64 / total as f64
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    DifficultyRollup {
        majority: Some(majority),
        percentage: count as f64 / total as f64 * 100.0,
        avg_confidence,
    }
}

fn analyze_interview_process(experiences: &[InterviewExperience]) -> Vec<RoundInsight> {
    let total = experiences.len().max(1) as f64;
    let mut round_counts: HashMap<String, u32> = HashMap::new();

    for exp in experiences {
        for round in &exp.rounds_details {
            let label = classify_round_label(&round.description);
            *round_counts.entry(label).or_insert(0) += 1;
        }
    }

    round_counts
        .into_iter()
        .map(|(round, count)| {
            let frequency_percent = count as f64 / total * 100.0;
            RoundInsight {
                round,
                frequency_percent,
                common: frequency_percent > COMMON_ROUND_THRESHOLD * 100.0,
            }
        })
        .collect()
}

fn classify_round_label(description: &str) -> String {
    let lower = description.to_lowercase();
    if lower.contains("system design") {
        "system_design".to_string()
    } else if lower.contains("behavioral") || lower.contains("hr") {
        "behavioral".to_string()
    } else if lower.contains("code") || lower.contains("coding") || lower.contains("dsa") {
        "coding".to_string()
    } else {
        "technical_discussion".to_string()
    }
}

/// Fixed 180-day split (not the generic midpoint split C3 uses): per-capita
/// mention rate (experiences-mentioning-topic / experiences-in-half) for the
/// last 180 days vs. everything older. Every topic mentioned in either half
/// is considered — a topic absent from one half still has a rate of 0.0
/// there, it isn't dropped. The "not enough data" gate is on the size of
/// each half (at least 2 experiences), not on per-topic mention counts.
fn analyze_temporal_trends(
    experiences: &[InterviewExperience],
    mentions: &[TopicMention],
    now: DateTime<Utc>,
) -> TemporalTrends {
    let cutoff = now - ChronoDuration::days(TEMPORAL_SPLIT_DAYS);
    let exp_dates: HashMap<Uuid, DateTime<Utc>> =
        experiences.iter().map(|e| (e.id, e.experience_date)).collect();

    let older_total = experiences.iter().filter(|e| e.experience_date < cutoff).count();
    let newer_total = experiences.iter().filter(|e| e.experience_date >= cutoff).count();
    if older_total < 2 || newer_total < 2 {
        return TemporalTrends::default();
    }

    let mut older_counts: HashMap<String, u32> = HashMap::new();
    let mut newer_counts: HashMap<String, u32> = HashMap::new();
    for m in mentions {
        let Some(date) = exp_dates.get(&m.experience_id) else { continue };
        let bucket = if *date < cutoff { &mut older_counts } else { &mut newer_counts };
        *bucket.entry(m.topic.clone()).or_insert(0) += 1;
    }

    let topics: HashSet<&String> = older_counts.keys().chain(newer_counts.keys()).collect();

    let mut trends: Vec<TopicTrend> = Vec::new();
    for topic in topics {
        let older_freq = *older_counts.get(topic).unwrap_or(&0) as f64 / older_total as f64;
        let newer_freq = *newer_counts.get(topic).unwrap_or(&0) as f64 / newer_total as f64;
        let change = newer_freq - older_freq;
        if change.abs() > TREND_CHANGE_THRESHOLD {
            trends.push(TopicTrend {
                topic: topic.clone(),
                direction: if change > 0.0 { TrendDirection::Up } else { TrendDirection::Down },
                relative_change: change,
            });
        }
    }

    trends.sort_by(|a, b| b.relative_change.abs().partial_cmp(&a.relative_change.abs()).unwrap());

    let trending_up: Vec<TopicTrend> = trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Up)
        .take(3)
        .cloned()
        .collect();
    let trending_down: Vec<TopicTrend> = trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Down)
        .take(3)
        .cloned()
        .collect();

    TemporalTrends { trending_up, trending_down }
}

fn generate_study_recommendations(topics: &[TopicInsight]) -> StudyRecommendations {
    let immediate_focus = topics
        .iter()
        .take(3)
        .map(|t| FocusItem { topic: t.topic.clone(), hours: 15 })
        .collect();
    let secondary_focus = topics
        .iter()
        .skip(3)
        .take(3)
        .map(|t| FocusItem { topic: t.topic.clone(), hours: 8 })
        .collect();

    StudyRecommendations { immediate_focus, secondary_focus }
}

fn generate_preparation_strategy(difficulty: &DifficultyRollup) -> PreparationStrategy {
    let (timeline, coding, system_design, behavioral) = match difficulty.majority {
        Some(Difficulty::Hard) => ("6-8 weeks", 0.5, 0.35, 0.15),
        Some(Difficulty::Medium) => ("4-6 weeks", 0.55, 0.25, 0.20),
        Some(Difficulty::Easy) | None => ("2-4 weeks", 0.6, 0.15, 0.25),
    };

    let mut practice_distribution = HashMap::new();
    practice_distribution.insert("coding", coding);
    practice_distribution.insert("system_design", system_design);
    practice_distribution.insert("behavioral", behavioral);

    let key_recommendations = vec![
        format!("Plan for a {timeline} preparation window given the observed difficulty mix."),
        "Practice a mock round for every interview stage reported by prior candidates.".to_string(),
        "Revisit the top-priority topics list before scheduling the onsite.".to_string(),
    ];

    PreparationStrategy { timeline, practice_distribution, key_recommendations }
}

fn identify_success_factors(
    experiences: &[InterviewExperience],
    mentions: &[TopicMention],
) -> Vec<SuccessFactor> {
    let offers: std::collections::HashSet<_> = experiences
        .iter()
        .filter(|e| e.success())
        .map(|e| e.id)
        .collect();
    let rejected: std::collections::HashSet<_> = experiences
        .iter()
        .filter(|e| matches!(e.outcome, crate::types::Outcome::Rejected))
        .map(|e| e.id)
        .collect();

    if offers.len() < 2 || rejected.len() < 2 {
        return Vec::new();
    }

    let mut by_topic: HashMap<String, (u32, u32)> = HashMap::new();
    for m in mentions {
        let entry = by_topic.entry(m.topic.clone()).or_insert((0, 0));
        if offers.contains(&m.experience_id) {
            entry.0 += 1;
        } else if rejected.contains(&m.experience_id) {
            entry.1 += 1;
        }
    }

    by_topic
        .into_iter()
        .filter_map(|(topic, (offer_hits, reject_hits))| {
            let success_rate = offer_hits as f64 / offers.len() as f64;
            let failure_rate = reject_hits as f64 / rejected.len() as f64;
            let delta = success_rate - failure_rate;
            if delta > 0.3 {
                Some(SuccessFactor { topic, success_rate, failure_rate, delta })
            } else {
                None
            }
        })
        .collect()
}

fn calculate_statistical_confidence(
    experiences: &[InterviewExperience],
    mentions: &[TopicMention],
) -> f64 {
    let n = experiences.len();
    let sample_size_confidence = if n >= 20 {
        0.9
    } else if n >= 10 {
        0.7
    } else if n >= 5 {
        0.5
    } else {
        0.3
    };

    let avg_topics_per_exp = if experiences.is_empty() {
        0.0
    } else {
        mentions.len() as f64 / experiences.len() as f64
    };
    let quality_confidence = if avg_topics_per_exp >= 5.0 {
        0.9
    } else if avg_topics_per_exp >= 3.0 {
        0.7
    } else if avg_topics_per_exp >= 2.0 {
        0.5
    } else {
        0.3
    };

    (sample_size_confidence + quality_confidence) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceRecord, Outcome, RoundDetail};
    use uuid::Uuid;

    fn experience(outcome: Outcome, difficulty: Vec<Difficulty>) -> InterviewExperience {
        let rec = ExperienceRecord {
            title: "Amazon SDE".into(),
            content: "x".repeat(600),
            source_url: format!("https://example.com/{}", Uuid::new_v4()),
            source_platform: "test".into(),
            company: "Amazon".into(),
            role: "SDE".into(),
            experience_date: Utc::now(),
            rounds_count: 1,
            rounds_details: vec![RoundDetail { round_number: 1, description: "coding round".into() }],
            difficulty_indicators: difficulty,
            outcome,
            time_weight: 1.0,
        };
        InterviewExperience::from_record(rec, Utc::now())
    }

    #[test]
    fn insufficient_sample_short_circuits() {
        let experiences = vec![experience(Outcome::Unknown, vec![])];
        let result = generate_comprehensive_insights(
            "Amazon",
            &experiences,
            &[],
            &DecayCalculator::new(0.08),
            3,
            Utc::now(),
        );
        assert!(matches!(
            result,
            InsightsResult::InsufficientData { have: 1, need: 3 }
        ));
    }

    #[test]
    fn priority_high_requires_both_thresholds() {
        assert_eq!(determine_priority_level(20.0, 20.0, 0.8), Priority::High);
        assert_eq!(determine_priority_level(20.0, 5.0, 0.6), Priority::Medium);
        // High score alone isn't enough without the confidence floor.
        assert_eq!(determine_priority_level(20.0, 20.0, 0.5), Priority::Medium);
        assert_eq!(determine_priority_level(1.0, 1.0, 0.9), Priority::Low);
    }

    #[test]
    fn full_report_assembles_with_enough_samples() {
        let experiences: Vec<InterviewExperience> = (0..5)
            .map(|i| {
                experience(
                    if i % 2 == 0 { Outcome::Offer } else { Outcome::Rejected },
                    vec![Difficulty::Medium],
                )
            })
            .collect();
        let mentions: Vec<TopicMention> = experiences
            .iter()
            .map(|e| TopicMention {
                experience_id: e.id,
                topic: "dynamic_programming".into(),
                category: "algorithms".into(),
                raw_count: 3,
                frequency_percent: 2.0,
                importance: 5.0,
                weighted_importance: 4.5,
                confidence: 0.8,
            })
            .collect();

        let result = generate_comprehensive_insights(
            "Amazon",
            &experiences,
            &mentions,
            &DecayCalculator::new(0.08),
            3,
            Utc::now(),
        );
        match result {
            InsightsResult::Ready(report) => {
                assert_eq!(report.sample_size, 5);
                assert!(!report.topic_insights.is_empty());
            }
            InsightsResult::InsufficientData { .. } => panic!("expected a ready report"),
        }
    }
}
