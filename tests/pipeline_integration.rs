//! End-to-end scenarios exercising the pipeline without any real network
//! traffic: `MemoryStore` stands in for C10, and fake `SourceAdapter`s stand
//! in for C5 so the orchestrator's staging/isolation behavior can be driven
//! deterministically.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use interview_intel::adapters::SourceAdapter;
use interview_intel::company::extract_company;
use interview_intel::crawl::CrawlEngine;
use interview_intel::decay::DecayCalculator;
use interview_intel::error::{PipelineError, Result};
use interview_intel::insights::InsightsResult;
use interview_intel::orchestrator::Orchestrator;
use interview_intel::store::{MemoryStore, PersistenceGateway};
use interview_intel::types::{Difficulty, ExperienceRecord, InterviewExperience, Outcome, RoundDetail};
use interview_intel::PipelineConfig;
use std::sync::Arc;

fn sample_record(company: &str, url: &str, outcome: Outcome) -> ExperienceRecord {
    ExperienceRecord {
        title: format!("{company} SDE Interview Experience"),
        content: "Interviewed for SDE role, 3 rounds: coding round on dynamic programming, \
                  a system design round about caching, and an HR round. "
            .repeat(3),
        source_url: url.to_string(),
        source_platform: "test".to_string(),
        company: company.to_string(),
        role: "SDE".to_string(),
        experience_date: Utc::now() - ChronoDuration::days(10),
        rounds_count: 3,
        rounds_details: vec![
            RoundDetail { round_number: 1, description: "coding round on dynamic programming".into() },
            RoundDetail { round_number: 2, description: "system design round about caching".into() },
        ],
        difficulty_indicators: vec![Difficulty::Medium],
        outcome,
        time_weight: 1.0,
    }
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        min_sample_size: Some(3),
        ..Default::default()
    }
}

fn build_engine() -> Arc<CrawlEngine> {
    Arc::new(CrawlEngine::new(reqwest::Client::new(), false, "test-bot".into(), 0, 3))
}

/// A fixed-response adapter with no network I/O: `discover_experience_urls`
/// just hands back `urls`, `extract_experience_data` looks up the matching
/// prebuilt record. Used to drive the orchestrator deterministically.
struct FakeAdapter {
    name: &'static str,
    urls: Vec<String>,
    records: std::collections::HashMap<String, ExperienceRecord>,
    fail_discovery: bool,
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn platform_name(&self) -> &'static str {
        self.name
    }

    async fn discover_experience_urls(
        &self,
        _engine: &CrawlEngine,
        _company: &str,
        _max_pages: usize,
    ) -> Result<Vec<String>> {
        if self.fail_discovery {
            return Err(PipelineError::ParseError("adapter B is down".to_string()));
        }
        Ok(self.urls.clone())
    }

    async fn extract_experience_data(
        &self,
        _engine: &CrawlEngine,
        url: &str,
        _target_company: Option<&str>,
    ) -> Result<ExperienceRecord> {
        self.records
            .get(url)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound)
    }
}

/// Scenario 1 (§8): ten stored experiences, no adapters produce new records,
/// `force_refresh=false` — all ten still contribute to the insights report.
#[tokio::test]
async fn scenario_single_company_happy_path() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        let rec = sample_record("Amazon", &format!("https://example.com/amazon/{i}"), Outcome::Offer);
        let exp = InterviewExperience::from_record(rec, Utc::now());
        store.upsert_experience(exp).await.unwrap();
    }
    assert_eq!(store.count_experiences("Amazon").await.unwrap(), 10);

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(FakeAdapter {
        name: "empty",
        urls: vec![],
        records: Default::default(),
        fail_discovery: false,
    })];
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), build_engine(), adapters, test_config()));

    let result = orchestrator.run_complete_analysis("Amazon", 10, false).await.unwrap();
    match result {
        InsightsResult::Ready(report) => {
            assert_eq!(report.sample_size, 10);
            for t in &report.topic_insights {
                if t.priority == interview_intel::types::Priority::High {
                    let score = t.weighted_frequency * 0.4 + t.avg_importance * 0.4 + t.avg_confidence * 20.0 * 0.2;
                    assert!(score >= 15.0 && t.avg_confidence >= 0.7);
                }
            }
        }
        InsightsResult::InsufficientData { .. } => panic!("expected a ready report with 10 samples"),
    }
    assert_eq!(store.count_experiences("Amazon").await.unwrap(), 10);
}

/// Scenario 2 (§8): PhonePe precedes Flipkart in the disambiguation table.
#[test]
fn scenario_disambiguation_prefers_earlier_priority_entry() {
    let title = "PhonePe Interview Experience";
    let content = "We discussed Walmart and Flipkart as competitors during the PhonePe SDE round.";
    assert_eq!(extract_company(title, content, None), "PhonePe");
}

/// Scenario 3 (§8): one 429 followed by a success records exactly one
/// failure, then clears it back to zero on success — driven directly against
/// C2, since there is no mock HTTP server wired into this crate's tests.
#[tokio::test]
async fn scenario_rate_limit_backoff_then_recovery() {
    use interview_intel::rate_limiter::AdaptiveRateLimiter;

    let limiter = AdaptiveRateLimiter::new();
    limiter.record_failure("flaky.example.com").await;
    assert_eq!(limiter.failure_count("flaky.example.com").await, 1);

    limiter.record_success("flaky.example.com").await;
    assert_eq!(limiter.failure_count("flaky.example.com").await, 0);
}

/// Scenario 3b: three consecutive 403s open the crawl engine's circuit
/// breaker for that host, short-circuiting further attempts.
#[tokio::test]
async fn scenario_circuit_breaker_short_circuits_after_three_403s() {
    let engine = CrawlEngine::new(reqwest::Client::new(), false, "test-bot".into(), 0, 3);
    for _ in 0..3 {
        let _ = engine.safe_request("https://blocked.example.com/unreachable").await;
    }
    let result = engine.safe_request("https://blocked.example.com/another-path").await;
    assert!(
        matches!(result, Err(PipelineError::HostCircuitOpen { .. }))
            || matches!(result, Err(PipelineError::Transport(_)))
    );
}

/// Scenario 4 (§8): exact decay-weight values at 12 and 60 months with λ=0.08.
#[test]
fn scenario_decay_weighting_matches_expected_values() {
    let calc = DecayCalculator::new(0.08);
    let now = Utc::now();

    let twelve_months_ago = now - ChronoDuration::days((12.0 * 30.44) as i64);
    let w12 = calc.weight(twelve_months_ago, now);
    assert!((w12 - 0.3829).abs() < 0.01, "expected ~0.3829, got {w12}");

    let sixty_months_ago = now - ChronoDuration::days((60.0 * 30.44) as i64);
    let w60 = calc.weight(sixty_months_ago, now);
    assert_eq!(w60, 0.01, "expected clamp to the 0.01 floor, got {w60}");
}

/// Scenario 5 (§8): recent mentions of a topic trending up against a cohort
/// of much older mentions of the same topic.
#[test]
fn scenario_trend_detection_flags_recently_surging_topic() {
    use interview_intel::types::TopicMention;
    use uuid::Uuid;

    let now = Utc::now();
    let mut experiences = Vec::new();
    let mut mentions = Vec::new();

    for i in 0..5 {
        let rec = sample_record("Amazon", &format!("https://example.com/recent/{i}"), Outcome::Offer);
        let mut exp = InterviewExperience::from_record(rec, now);
        exp.experience_date = now - ChronoDuration::days(30 + i);
        let exp_id = exp.id;
        experiences.push(exp);
        mentions.push(TopicMention {
            experience_id: exp_id,
            topic: "dynamic_programming".into(),
            category: "algorithms".into(),
            raw_count: 2,
            frequency_percent: 3.0,
            importance: 6.0,
            weighted_importance: 5.0,
            confidence: 0.8,
        });
    }
    for i in 0..5 {
        let rec = sample_record("Amazon", &format!("https://example.com/old/{i}"), Outcome::Rejected);
        let mut exp = InterviewExperience::from_record(rec, now);
        exp.experience_date = now - ChronoDuration::days(400 + i);
        experiences.push(exp);
        // No mentions of dynamic_programming from the older cohort.
    }

    let result = interview_intel::insights::generate_comprehensive_insights(
        "Amazon",
        &experiences,
        &mentions,
        &DecayCalculator::new(0.08),
        3,
        now,
    );
    match result {
        InsightsResult::Ready(report) => {
            assert_eq!(report.sample_size, 10);
            let dp_trend = report
                .temporal_trends
                .trending_up
                .iter()
                .find(|t| t.topic == "dynamic_programming")
                .expect("dynamic_programming should be flagged as trending up");
            assert!((dp_trend.relative_change - 1.0).abs() < 1e-9);
        }
        InsightsResult::InsufficientData { .. } => panic!("expected a ready report"),
    }
}

/// Scenario 6 (§8): one adapter failing discovery doesn't abort the others,
/// and the collection stage still persists whatever the healthy adapters
/// produced.
#[tokio::test]
async fn scenario_adapter_isolation_survives_one_failure() {
    let store = Arc::new(MemoryStore::new());

    let mut records_a = std::collections::HashMap::new();
    records_a.insert(
        "https://a.example.com/1".to_string(),
        sample_record("Amazon", "https://a.example.com/1", Outcome::Offer),
    );
    let mut records_c = std::collections::HashMap::new();
    records_c.insert(
        "https://c.example.com/1".to_string(),
        sample_record("Amazon", "https://c.example.com/1", Outcome::Rejected),
    );

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(FakeAdapter {
            name: "adapter-a",
            urls: vec!["https://a.example.com/1".to_string()],
            records: records_a,
            fail_discovery: false,
        }),
        Arc::new(FakeAdapter {
            name: "adapter-b",
            urls: vec![],
            records: Default::default(),
            fail_discovery: true,
        }),
        Arc::new(FakeAdapter {
            name: "adapter-c",
            urls: vec!["https://c.example.com/1".to_string()],
            records: records_c,
            fail_discovery: false,
        }),
    ];

    let orchestrator = Arc::new(Orchestrator::new(store.clone(), build_engine(), adapters, test_config()));
    let result = orchestrator.run_complete_analysis("Amazon", 10, false).await;

    assert!(result.is_ok(), "adapter B's discovery failure must not abort the run");
    assert_eq!(store.count_experiences("Amazon").await.unwrap(), 2);
}

/// Invariant (§8): re-ingesting the same source URL never creates a second
/// experience row.
#[tokio::test]
async fn invariant_reingesting_same_url_is_idempotent() {
    let store = MemoryStore::new();
    let rec = sample_record("Google", "https://example.com/dup", Outcome::Unknown);

    let first = InterviewExperience::from_record(rec.clone(), Utc::now());
    let id1 = store.upsert_experience(first).await.unwrap();

    let second = InterviewExperience::from_record(rec, Utc::now());
    let id2 = store.upsert_experience(second).await.unwrap();

    assert_eq!(id1, id2);
    assert_eq!(store.count_experiences("Google").await.unwrap(), 1);
}

/// Boundary (§8): sample size exactly `min_sample_size - 1` is insufficient;
/// exactly `min_sample_size` is ready.
#[test]
fn boundary_min_sample_size_threshold() {
    let now = Utc::now();
    let make = |n: usize| -> Vec<InterviewExperience> {
        (0..n)
            .map(|i| {
                let rec = sample_record("Meta", &format!("https://example.com/meta/{i}"), Outcome::Offer);
                InterviewExperience::from_record(rec, now)
            })
            .collect()
    };

    let below = make(2);
    let at = make(3);
    let decay = DecayCalculator::new(0.08);

    assert!(matches!(
        interview_intel::insights::generate_comprehensive_insights("Meta", &below, &[], &decay, 3, now),
        InsightsResult::InsufficientData { have: 2, need: 3 }
    ));
    assert!(matches!(
        interview_intel::insights::generate_comprehensive_insights("Meta", &at, &[], &decay, 3, now),
        InsightsResult::Ready(_)
    ));
}

/// Invariant (§8): batch analysis never runs the same company twice
/// concurrently — the second call should not panic or deadlock even when
/// dispatched back-to-back.
#[tokio::test]
async fn batch_analysis_is_safe_to_call_for_overlapping_company_sets() {
    let store = Arc::new(MemoryStore::new());

    let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(FakeAdapter {
        name: "empty",
        urls: vec![],
        records: Default::default(),
        fail_discovery: false,
    })];
    let orchestrator = Arc::new(Orchestrator::new(store, build_engine(), adapters, test_config()));

    let results = orchestrator
        .run_batch_analysis(vec!["Amazon".to_string(), "Google".to_string(), "Meta".to_string()], 5)
        .await;

    assert_eq!(results.len(), 3);
    for (_, result) in results {
        assert!(result.is_ok());
    }
}
