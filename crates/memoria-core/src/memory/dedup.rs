//! Near-duplicate lookup for extraction candidates.
//!
//! A recall filter, not a merge decision: it narrows which existing memories
//! the merge model gets to see.

use memoria_types::config::ReconcileConfig;
use memoria_types::error::MemoryError;
use memoria_types::memory::{Memory, MemorySearchResult};

use super::repository::MemoryRepository;

#[derive(Clone)]
pub struct MemoryDeduplicator {
    repository: MemoryRepository,
    threshold: f32,
    per_candidate: usize,
}

impl MemoryDeduplicator {
    pub fn new(repository: MemoryRepository, threshold: f32, per_candidate: usize) -> Self {
        Self {
            repository,
            threshold,
            per_candidate,
        }
    }

    pub fn from_config(repository: MemoryRepository, config: &ReconcileConfig) -> Self {
        Self::new(
            repository,
            config.similarity_threshold,
            config.candidates_per_fact,
        )
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Stored memories of `user_id` scoring at least the threshold against
    /// `memory.content`, best first.
    pub async fn try_find_scored(
        &self,
        memory: &Memory,
        user_id: &str,
    ) -> Result<Vec<MemorySearchResult>, MemoryError> {
        let mut hits = self
            .repository
            .try_search_with_scores(&memory.content, user_id, None, self.per_candidate)
            .await?;
        hits.retain(|hit| hit.score >= self.threshold);
        Ok(hits)
    }

    pub async fn find_candidates(&self, memory: &Memory, user_id: &str) -> Vec<Memory> {
        match self.try_find_scored(memory, user_id).await {
            Ok(hits) => hits.into_iter().map(|hit| hit.memory).collect(),
            Err(e) => {
                tracing::warn!(error = %e, user_id, "near-duplicate lookup failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::{HashingEmbedder, InMemoryIndex, repository};
    use memoria_types::memory::MemoryType;

    #[tokio::test]
    async fn test_threshold_filters_unrelated_memories() {
        let index = InMemoryIndex::new();
        let repo = repository(&index, &HashingEmbedder::new());
        let same = Memory::new("alice", "Loves Italian food", MemoryType::Semantic);
        repo.store(&same).await;
        repo.store(&Memory::new("alice", "Works night shifts at the hospital", MemoryType::Semantic))
            .await;
        repo.store(&Memory::new("bob", "Loves Italian food", MemoryType::Semantic))
            .await;

        let dedup = MemoryDeduplicator::new(repo, 0.8, 5);
        let candidate = Memory::new("alice", "Loves Italian food", MemoryType::Semantic);
        let found = dedup.find_candidates(&candidate, "alice").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, same.id);
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_nothing() {
        let index = InMemoryIndex::new();
        let repo = repository(&index, &HashingEmbedder::new());
        index.set_failing(true);
        let dedup = MemoryDeduplicator::new(repo, 0.8, 5);
        let candidate = Memory::new("alice", "Loves Italian food", MemoryType::Semantic);
        assert!(dedup.find_candidates(&candidate, "alice").await.is_empty());
        assert!(dedup.try_find_scored(&candidate, "alice").await.is_err());
    }
}
