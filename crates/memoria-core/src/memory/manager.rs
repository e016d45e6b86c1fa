//! MemoryManager: the single entry point the outer layers call.
//!
//! Composes extraction, reconciliation, recency search, question answering
//! and pattern analysis over one shared [`MemoryRepository`]. Holds no state
//! of its own beyond the components and the retrieval settings.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use memoria_types::config::{MemoriaConfig, RetrievalConfig};
use memoria_types::llm::Message;
use memoria_types::memory::{Memory, MemorySearchResult, MemoryType, ReconcileTranscript};
use memoria_types::pattern::ComprehensivePatterns;
use memoria_types::recall::RecallAnswer;

use super::completion::CompletionClient;
use super::extractor::MemoryExtractor;
use super::locks::OwnerLocks;
use super::patterns::PatternAnalyzer;
use super::recall::MemoryRecall;
use super::recency::RecencySearch;
use super::reconciler::MemoryReconciler;
use super::repository::MemoryRepository;

#[derive(Clone)]
pub struct MemoryManager {
    repository: MemoryRepository,
    extractor: MemoryExtractor,
    reconciler: MemoryReconciler,
    recency: RecencySearch,
    recall: MemoryRecall,
    patterns: PatternAnalyzer,
    retrieval: RetrievalConfig,
}

impl MemoryManager {
    /// Wire every component over one repository and one completion client.
    pub fn new(repository: MemoryRepository, llm: CompletionClient, config: &MemoriaConfig) -> Self {
        Self::with_locks(repository, llm, OwnerLocks::new(), config)
    }

    /// Like [`Self::new`], sharing an existing lock table.
    pub fn with_locks(
        repository: MemoryRepository,
        llm: CompletionClient,
        locks: OwnerLocks,
        config: &MemoriaConfig,
    ) -> Self {
        let recency = RecencySearch::new(repository.clone(), config.retrieval.recency_pool);
        Self {
            extractor: MemoryExtractor::new(llm.clone()),
            reconciler: MemoryReconciler::from_config(
                repository.clone(),
                llm.clone(),
                locks,
                &config.reconcile,
            ),
            recall: MemoryRecall::new(recency.clone(), llm.clone(), config.retrieval.clone()),
            recency,
            patterns: PatternAnalyzer::new(repository.clone(), llm),
            retrieval: config.retrieval.clone(),
            repository,
        }
    }

    pub fn repository(&self) -> &MemoryRepository {
        &self.repository
    }

    /// Extract memories from a conversation and merge them into the store.
    #[tracing::instrument(
        name = "add_conversation",
        skip(self, messages),
        fields(user_id = %user_id, message_count = messages.len())
    )]
    pub async fn add_conversation(&self, messages: &[Message], user_id: &str) -> ReconcileTranscript {
        let candidates = self.extractor.extract(messages, user_id).await;
        if candidates.is_empty() {
            tracing::debug!("nothing extracted");
            return ReconcileTranscript::default();
        }
        self.reconciler.reconcile(&candidates, user_id).await
    }

    /// Recency-boosted search with the configured boost; `limit` defaults to
    /// the configured `top_k`.
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: Option<usize>,
    ) -> Vec<MemorySearchResult> {
        self.search_with_boost(query, user_id, self.retrieval.boost_factor, limit)
            .await
    }

    pub async fn search_with_boost(
        &self,
        query: &str,
        user_id: &str,
        boost_factor: f32,
        limit: Option<usize>,
    ) -> Vec<MemorySearchResult> {
        let top_k = limit.unwrap_or(self.retrieval.top_k);
        self.recency
            .score_with_recency(user_id, query, boost_factor, top_k)
            .await
    }

    /// Answer a natural-language question from the owner's memories.
    pub async fn ask(&self, question: &str, user_id: &str) -> RecallAnswer {
        self.recall.ask(question, user_id).await
    }

    pub async fn list_for_user(&self, user_id: &str, memory_type: Option<MemoryType>) -> Vec<Memory> {
        self.repository.list_for_user(user_id, memory_type).await
    }

    /// Memories from the last `days` days; `None` uses the configured window.
    pub async fn recent(&self, user_id: &str, days: Option<i64>) -> Vec<Memory> {
        self.recency
            .recent(user_id, days.unwrap_or(self.retrieval.recent_days))
            .await
    }

    pub async fn by_date_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Memory> {
        self.recency.by_date_range(user_id, start, end).await
    }

    pub async fn delete_for_owner(&self, id: &Uuid, user_id: &str) -> bool {
        self.repository.delete_for_owner(id, user_id).await
    }

    pub async fn get_comprehensive_patterns(&self, user_id: &str) -> ComprehensivePatterns {
        self.patterns.get_comprehensive_patterns(user_id).await
    }
}
