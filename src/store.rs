use crate::error::{PipelineError, Result};
use crate::types::{CompanyInsight, InterviewExperience, TopicMention};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Abstract contract for the durable store. No SQL in the core — a real
/// backend implements this trait outside this crate's scope; `MemoryStore`
/// below is the reference implementation used by tests and the demo harness.
///
/// All multi-row writes (`save_topic_mentions` + `mark_processed`,
/// `replace_company_insights`) are one unit of work each.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Idempotent on `source_url`; creates the Company row on first sight.
    /// Returns the experience id (existing or newly created).
    async fn upsert_experience(&self, experience: InterviewExperience) -> Result<Uuid>;

    async fn count_experiences(&self, company: &str) -> Result<usize>;

    async fn latest_scraped_at(&self, company: &str) -> Result<Option<DateTime<Utc>>>;

    async fn list_experiences(&self, company: &str) -> Result<Vec<InterviewExperience>>;

    /// Experiences with `processed_at` null or older than `ttl`.
    async fn list_unprocessed_or_stale_experiences(
        &self,
        company: &str,
        ttl: chrono::Duration,
    ) -> Result<Vec<InterviewExperience>>;

    /// Must occur in one unit of work: persist mentions, then stamp `processed_at`.
    async fn save_topic_mentions(
        &self,
        experience_id: Uuid,
        mentions: Vec<TopicMention>,
    ) -> Result<()>;

    async fn mark_processed(&self, experience_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn list_mentions(&self, company: &str) -> Result<Vec<TopicMention>>;

    /// Delete-then-insert in one unit of work.
    async fn replace_company_insights(
        &self,
        company: &str,
        new_insights: Vec<CompanyInsight>,
    ) -> Result<()>;

    async fn list_insights(&self, company: &str) -> Result<Vec<CompanyInsight>>;
}

#[derive(Default)]
struct MemoryStoreInner {
    experiences: HashMap<Uuid, InterviewExperience>,
    by_source_url: HashMap<String, Uuid>,
    mentions: HashMap<Uuid, Vec<TopicMention>>,
    insights: HashMap<String, Vec<CompanyInsight>>,
}

/// In-memory reference implementation of `PersistenceGateway`.
///
/// Two processes running the same pipeline each hold an independent store —
/// acceptable for a research-grade single-node pipeline (see design notes).
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryStoreInner::default())),
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryStore {
    async fn upsert_experience(&self, experience: InterviewExperience) -> Result<Uuid> {
        let mut inner = self.inner.write().await;
        if let Some(existing_id) = inner.by_source_url.get(&experience.source_url).copied() {
            // Idempotent: re-ingesting the same URL updates nothing.
            return Ok(existing_id);
        }
        let id = experience.id;
        inner
            .by_source_url
            .insert(experience.source_url.clone(), id);
        inner.experiences.insert(id, experience);
        Ok(id)
    }

    async fn count_experiences(&self, company: &str) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner
            .experiences
            .values()
            .filter(|e| e.company == company)
            .count())
    }

    async fn latest_scraped_at(&self, company: &str) -> Result<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner
            .experiences
            .values()
            .filter(|e| e.company == company)
            .map(|e| e.scraped_at)
            .max())
    }

    async fn list_experiences(&self, company: &str) -> Result<Vec<InterviewExperience>> {
        let inner = self.inner.read().await;
        Ok(inner
            .experiences
            .values()
            .filter(|e| e.company == company)
            .cloned()
            .collect())
    }

    async fn list_unprocessed_or_stale_experiences(
        &self,
        company: &str,
        ttl: chrono::Duration,
    ) -> Result<Vec<InterviewExperience>> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        Ok(inner
            .experiences
            .values()
            .filter(|e| e.company == company)
            .filter(|e| match e.processed_at {
                None => true,
                Some(p) => now - p > ttl,
            })
            .cloned()
            .collect())
    }

    async fn save_topic_mentions(
        &self,
        experience_id: Uuid,
        mentions: Vec<TopicMention>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.experiences.contains_key(&experience_id) {
            return Err(PipelineError::StoreError(format!(
                "unknown experience id {experience_id}"
            )));
        }
        inner.mentions.insert(experience_id, mentions);
        Ok(())
    }

    async fn mark_processed(&self, experience_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let exp = inner.experiences.get_mut(&experience_id).ok_or_else(|| {
            PipelineError::StoreError(format!("unknown experience id {experience_id}"))
        })?;
        exp.processed_at = Some(at);
        Ok(())
    }

    async fn list_mentions(&self, company: &str) -> Result<Vec<TopicMention>> {
        let inner = self.inner.read().await;
        let ids: Vec<Uuid> = inner
            .experiences
            .values()
            .filter(|e| e.company == company)
            .map(|e| e.id)
            .collect();
        Ok(ids
            .into_iter()
            .flat_map(|id| inner.mentions.get(&id).cloned().unwrap_or_default())
            .collect())
    }

    async fn replace_company_insights(
        &self,
        company: &str,
        new_insights: Vec<CompanyInsight>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.insights.insert(company.to_string(), new_insights);
        Ok(())
    }

    async fn list_insights(&self, company: &str) -> Result<Vec<CompanyInsight>> {
        let inner = self.inner.read().await;
        Ok(inner.insights.get(company).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceRecord, Outcome};

    fn sample_record(url: &str) -> ExperienceRecord {
        ExperienceRecord {
            title: "Amazon Interview".to_string(),
            content: "x".repeat(150),
            source_url: url.to_string(),
            source_platform: "test".to_string(),
            company: "Amazon".to_string(),
            role: "SDE".to_string(),
            experience_date: Utc::now(),
            rounds_count: 2,
            rounds_details: vec![],
            difficulty_indicators: vec![],
            outcome: Outcome::Unknown,
            time_weight: 1.0,
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_source_url() {
        let store = MemoryStore::new();
        let rec = sample_record("https://example.com/a");
        let exp1 = InterviewExperience::from_record(rec.clone(), Utc::now());
        let id1 = store.upsert_experience(exp1).await.unwrap();

        let exp2 = InterviewExperience::from_record(rec, Utc::now());
        let id2 = store.upsert_experience(exp2).await.unwrap();

        assert_eq!(id1, id2);
        assert_eq!(store.count_experiences("Amazon").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_insights_swaps_atomically() {
        let store = MemoryStore::new();
        let first = vec![CompanyInsight {
            company: "Amazon".into(),
            topic: "algorithms.sorting".into(),
            category: "algorithms".into(),
            weighted_frequency: 10.0,
            confidence: 0.5,
            sample_size: 3,
            priority: crate::types::Priority::Low,
            recommendation: "".into(),
            analyzed_at: Utc::now(),
        }];
        store
            .replace_company_insights("Amazon", first)
            .await
            .unwrap();
        assert_eq!(store.list_insights("Amazon").await.unwrap().len(), 1);

        store
            .replace_company_insights("Amazon", vec![])
            .await
            .unwrap();
        assert_eq!(store.list_insights("Amazon").await.unwrap().len(), 0);
    }
}
