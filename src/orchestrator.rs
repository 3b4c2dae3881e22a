use crate::adapters::SourceAdapter;
use crate::config::PipelineConfig;
use crate::crawl::CrawlEngine;
use crate::decay::DecayCalculator;
use crate::error::{PipelineError, Result};
use crate::insights::{generate_comprehensive_insights, InsightsResult};
use crate::store::PersistenceGateway;
use crate::topics::extract_topics;
use crate::types::{CompanyInsight, InterviewExperience, Priority, TopicMention};
use chrono::{Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

/// Batch runs never exceed this many companies in flight at once — the
/// target sites are shared external hosts, not ours to hammer.
const MAX_CONCURRENT_COMPANIES: usize = 2;
const STALE_TTL_HOURS: i64 = 24;
const STALE_COLLECTION_DAYS: i64 = 7;

/// Ties together the crawl engine, every registered source adapter, the
/// persistence gateway, and the analysis stack (topics + decay + insights)
/// into the four-stage pipeline: Collection, Analysis, Insights,
/// Recommendations (the last is folded into the insights report itself).
pub struct Orchestrator<S: PersistenceGateway> {
    store: Arc<S>,
    engine: Arc<CrawlEngine>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    decay: DecayCalculator,
    config: PipelineConfig,
    in_flight: Mutex<HashSet<String>>,
}

impl<S: PersistenceGateway + 'static> Orchestrator<S> {
    pub fn new(
        store: Arc<S>,
        engine: Arc<CrawlEngine>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        config: PipelineConfig,
    ) -> Self {
        let decay = DecayCalculator::new(config.resolve_decay_lambda());
        Self {
            store,
            engine,
            adapters,
            decay,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Runs the full pipeline for one company: Collection (adapters ->
    /// crawl engine -> store), Analysis (topic extraction -> store),
    /// Insights (aggregate -> store), and returns the resulting report.
    /// `force_refresh` treats every experience as stale instead of only
    /// unprocessed/TTL-expired ones.
    pub async fn run_complete_analysis(
        &self,
        company: &str,
        max_experiences: usize,
        force_refresh: bool,
    ) -> Result<InsightsResult> {
        let correlation_id = Uuid::new_v4();
        info!(%correlation_id, company, "starting complete analysis");

        self.stage_collection(company, max_experiences, force_refresh).await?;
        self.stage_analysis(company, force_refresh).await?;
        let report = self.stage_insights(company).await?;

        info!(%correlation_id, company, "complete analysis finished");
        Ok(report)
    }

    /// Skips crawling entirely when the store already has at least
    /// `max_experiences` rows for this company and the most recent scrape is
    /// under a week old — `force_refresh` bypasses both checks.
    async fn stage_collection(
        &self,
        company: &str,
        max_experiences: usize,
        force_refresh: bool,
    ) -> Result<()> {
        if !force_refresh {
            let count = self.store.count_experiences(company).await?;
            let latest = self.store.latest_scraped_at(company).await?;
            let fresh_enough = latest
                .map(|t| Utc::now() - t < ChronoDuration::days(STALE_COLLECTION_DAYS))
                .unwrap_or(false);
            if count >= max_experiences && fresh_enough {
                info!(company, count, "collection skipped: fresh and at quota");
                return Ok(());
            }
        }

        let per_adapter_quota = (max_experiences / self.adapters.len().max(1)).max(1);

        for adapter in &self.adapters {
            let urls = match adapter
                .discover_experience_urls(&self.engine, company, per_adapter_quota * 2)
                .await
            {
                Ok(urls) => urls,
                Err(e) => {
                    warn!(adapter = adapter.platform_name(), error = %e, "discovery failed, skipping adapter");
                    continue;
                }
            };

            let mut stored = 0usize;
            for url in urls {
                if stored >= per_adapter_quota {
                    break;
                }
                match adapter
                    .extract_experience_data(&self.engine, &url, Some(company))
                    .await
                {
                    Ok(record) => {
                        let experience = InterviewExperience::from_record(record, Utc::now());
                        if let Err(e) = self.store.upsert_experience(experience).await {
                            warn!(url, error = %e, "failed to persist experience");
                            continue;
                        }
                        stored += 1;
                    }
                    Err(e) => {
                        warn!(url, adapter = adapter.platform_name(), error = %e, "extraction failed");
                    }
                }
            }
        }

        Ok(())
    }

    async fn stage_analysis(&self, company: &str, force_refresh: bool) -> Result<()> {
        let ttl = if force_refresh {
            ChronoDuration::seconds(0)
        } else {
            ChronoDuration::hours(STALE_TTL_HOURS)
        };

        let pending = self
            .store
            .list_unprocessed_or_stale_experiences(company, ttl)
            .await?;

        let now = Utc::now();
        for experience in pending {
            let analysis = extract_topics(
                &experience.title,
                &experience.content,
                experience.experience_date,
                now,
                &self.decay,
            );

            let mentions: Vec<TopicMention> = analysis
                .topics
                .iter()
                .map(|t| TopicMention {
                    experience_id: experience.id,
                    topic: t.topic.clone(),
                    category: t.category.clone(),
                    raw_count: t.raw_count,
                    frequency_percent: t.frequency_percent,
                    importance: t.importance,
                    weighted_importance: t.weighted_importance,
                    confidence: t.confidence,
                })
                .collect();

            self.store.save_topic_mentions(experience.id, mentions).await?;
            self.store.mark_processed(experience.id, now).await?;
        }

        Ok(())
    }

    async fn stage_insights(&self, company: &str) -> Result<InsightsResult> {
        let experiences = self.store.list_experiences(company).await?;
        let mentions = self.store.list_mentions(company).await?;

        let result = generate_comprehensive_insights(
            company,
            &experiences,
            &mentions,
            &self.decay,
            self.config.resolve_min_sample_size(),
            Utc::now(),
        );

        if let InsightsResult::Ready(report) = &result {
            let rows: Vec<CompanyInsight> = report
                .topic_insights
                .iter()
                .map(|t| CompanyInsight {
                    company: company.to_string(),
                    topic: t.topic.clone(),
                    category: t.category.clone(),
                    weighted_frequency: t.weighted_frequency,
                    confidence: t.avg_confidence,
                    sample_size: t.sample_size,
                    priority: t.priority,
                    recommendation: t.actionable_insight.clone(),
                    analyzed_at: Utc::now(),
                })
                .collect();
            self.store.replace_company_insights(company, rows).await?;
        }

        Ok(result)
    }

    /// Runs `run_complete_analysis` across many companies, at most
    /// `MAX_CONCURRENT_COMPANIES` at a time. One company's failure never
    /// aborts the batch — its slot just reports an error and the rest
    /// continue.
    pub async fn run_batch_analysis(
        self: &Arc<Self>,
        companies: Vec<String>,
        quota_each: usize,
    ) -> Vec<(String, Result<InsightsResult>)> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_COMPANIES));
        let batch_id = Uuid::new_v4();
        info!(%batch_id, count = companies.len(), "starting batch analysis");

        stream::iter(companies.into_iter().map(|company| {
            let this = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");

                {
                    let mut in_flight = this.in_flight.lock().await;
                    if !in_flight.insert(company.clone()) {
                        return (company, Err(PipelineError::StoreError(
                            "company already has an analysis in flight".to_string(),
                        )));
                    }
                }

                let result = this.run_complete_analysis(&company, quota_each, false).await;

                {
                    let mut in_flight = this.in_flight.lock().await;
                    in_flight.remove(&company);
                }

                (company, result)
            }
        }))
        .buffer_unordered(MAX_CONCURRENT_COMPANIES)
        .collect()
        .await
    }
}

pub fn priority_rank(p: Priority) -> u8 {
    match p {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{GeeksForGeeksAdapter, LeetCodeAdapter};
    use crate::store::MemoryStore;

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            min_sample_size: Some(3),
            ..Default::default()
        }
    }

    fn build_orchestrator() -> Arc<Orchestrator<MemoryStore>> {
        let engine = Arc::new(CrawlEngine::new(reqwest::Client::new(), false, "test-bot".into(), 0, 3));
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(GeeksForGeeksAdapter::new()),
            Arc::new(LeetCodeAdapter::new()),
        ];
        Arc::new(Orchestrator::new(
            Arc::new(MemoryStore::new()),
            engine,
            adapters,
            test_config(),
        ))
    }

    #[tokio::test]
    async fn insights_stage_reports_insufficient_data_on_empty_store() {
        let orchestrator = build_orchestrator();
        let result = orchestrator.stage_insights("Amazon").await.unwrap();
        assert!(matches!(
            result,
            InsightsResult::InsufficientData { have: 0, .. }
        ));
    }

    #[tokio::test]
    async fn batch_analysis_never_panics_on_unreachable_hosts() {
        let orchestrator = build_orchestrator();
        let results = orchestrator
            .run_batch_analysis(vec!["Amazon".to_string(), "Google".to_string()], 2)
            .await;
        assert_eq!(results.len(), 2);
    }
}
