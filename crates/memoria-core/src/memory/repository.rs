//! Typed memory storage over a vector index and an embedder.
//!
//! `MemoryRepository` turns [`Memory`] records into vector points and back.
//! Every operation comes in two forms: a `try_*` method that returns the
//! failure, and a facade that logs it and degrades to an empty or no-op
//! result so a flaky store never breaks the conversation flow.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use memoria_types::config::{EmbeddingConfig, RetrievalConfig};
use memoria_types::error::MemoryError;
use memoria_types::memory::{Memory, MemorySearchResult, MemoryType};
use memoria_types::vector::{PointFilter, VectorPoint};

use super::box_embedder::BoxEmbedder;
use super::box_index::BoxVectorIndex;
use super::record;

/// Tunables for [`MemoryRepository`].
#[derive(Debug, Clone)]
pub struct RepositorySettings {
    /// Deadline for one embedding call.
    pub embed_timeout: Duration,
    /// Cap on `list_for_user` results.
    pub list_page_size: usize,
}

impl RepositorySettings {
    pub fn from_config(retrieval: &RetrievalConfig, embedding: &EmbeddingConfig) -> Self {
        Self {
            embed_timeout: embedding.timeout(),
            list_page_size: retrieval.list_page_size,
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default(), &EmbeddingConfig::default())
    }
}

/// Read/write access to stored memories. Cheap to clone.
#[derive(Clone)]
pub struct MemoryRepository {
    index: Arc<BoxVectorIndex>,
    embedder: Arc<BoxEmbedder>,
    settings: RepositorySettings,
}

impl MemoryRepository {
    pub fn new(
        index: Arc<BoxVectorIndex>,
        embedder: Arc<BoxEmbedder>,
        settings: RepositorySettings,
    ) -> Self {
        Self {
            index,
            embedder,
            settings,
        }
    }

    pub fn list_page_size(&self) -> usize {
        self.settings.list_page_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let timeout = self.settings.embed_timeout;
        let vector = tokio::time::timeout(timeout, self.embedder.embed_one(text))
            .await
            .map_err(|_| MemoryError::Timeout {
                operation: "embed",
                after_ms: timeout.as_millis() as u64,
            })??;
        Ok(vector)
    }

    /// Embed and upsert a memory under its own id.
    #[tracing::instrument(
        name = "memory_store",
        skip(self, memory),
        fields(memory_id = %memory.id, user_id = %memory.user_id)
    )]
    pub async fn try_store(&self, memory: &Memory) -> Result<Uuid, MemoryError> {
        let vector = self.embed(&memory.content).await?;
        let point = VectorPoint {
            id: memory.id,
            vector,
            payload: record::to_payload(memory),
        };
        self.index.upsert(std::slice::from_ref(&point)).await?;
        tracing::debug!("memory stored");
        Ok(memory.id)
    }

    /// Store a memory; `None` means it was not saved (already logged).
    pub async fn store(&self, memory: &Memory) -> Option<Uuid> {
        match self.try_store(memory).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    memory_id = %memory.id,
                    user_id = %memory.user_id,
                    "failed to store memory; continuing without it"
                );
                None
            }
        }
    }

    /// Semantic search within one owner's memories, scores preserved.
    #[tracing::instrument(name = "memory_search", skip(self, query))]
    pub async fn try_search_with_scores(
        &self,
        query: &str,
        user_id: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<MemorySearchResult>, MemoryError> {
        let vector = self.embed(query).await?;
        let filter = record::owner_filter(user_id, memory_type);
        let hits = self.index.search(&vector, &filter, limit).await?;

        let results = hits
            .into_iter()
            .filter_map(|hit| match record::from_payload(hit.id, &hit.payload) {
                Ok(memory) => Some(MemorySearchResult::new(memory, hit.score)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt point in search results");
                    None
                }
            })
            .collect();
        Ok(results)
    }

    pub async fn search_with_scores(
        &self,
        query: &str,
        user_id: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Vec<MemorySearchResult> {
        self.try_search_with_scores(query, user_id, memory_type, limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, user_id, "memory search failed; returning no results");
                Vec::new()
            })
    }

    /// Like [`Self::search_with_scores`] without the scores.
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Vec<Memory> {
        self.search_with_scores(query, user_id, memory_type, limit)
            .await
            .into_iter()
            .map(|r| r.memory)
            .collect()
    }

    /// Enumerate memories matching an arbitrary filter, skipping corrupt points.
    pub async fn try_custom_search(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<Memory>, MemoryError> {
        let points = self.index.scroll(filter, limit).await?;
        Ok(points
            .into_iter()
            .filter_map(|point| match record::from_payload(point.id, &point.payload) {
                Ok(memory) => Some(memory),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt point in scroll results");
                    None
                }
            })
            .collect())
    }

    pub async fn custom_search(&self, filter: &PointFilter, limit: usize) -> Vec<Memory> {
        self.try_custom_search(filter, limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "filtered memory scan failed; returning no results");
                Vec::new()
            })
    }

    /// Up to `list_page_size` memories for one owner, unordered.
    pub async fn try_list_for_user(
        &self,
        user_id: &str,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<Memory>, MemoryError> {
        let filter = record::owner_filter(user_id, memory_type);
        self.try_custom_search(&filter, self.settings.list_page_size)
            .await
    }

    pub async fn list_for_user(&self, user_id: &str, memory_type: Option<MemoryType>) -> Vec<Memory> {
        self.try_list_for_user(user_id, memory_type)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, user_id, "listing memories failed; returning none");
                Vec::new()
            })
    }

    /// Fetch one memory by id. A corrupt point reads as an error.
    pub async fn try_get(&self, id: &Uuid) -> Result<Option<Memory>, MemoryError> {
        match self.index.get(id).await? {
            Some(point) => Ok(Some(record::from_payload(point.id, &point.payload)?)),
            None => Ok(None),
        }
    }

    /// Delete memories by id. Missing ids are not an error.
    pub async fn try_delete(&self, ids: &[Uuid]) -> Result<(), MemoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.index.delete(ids).await?;
        Ok(())
    }

    /// Delete one memory; `false` means the delete failed (already logged).
    pub async fn delete(&self, id: &Uuid) -> bool {
        match self.try_delete(std::slice::from_ref(id)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, memory_id = %id, "failed to delete memory");
                false
            }
        }
    }

    /// Delete a memory only if `user_id` owns it.
    ///
    /// Returns `false` when the memory is absent, owned by someone else, or
    /// the store fails; the caller cannot tell these apart.
    #[tracing::instrument(name = "memory_delete_for_owner", skip(self), fields(memory_id = %id))]
    pub async fn delete_for_owner(&self, id: &Uuid, user_id: &str) -> bool {
        let memory = match self.try_get(id).await {
            Ok(Some(memory)) => memory,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "ownership lookup failed");
                return false;
            }
        };
        if memory.user_id != user_id {
            tracing::debug!("delete refused: not owned by caller");
            return false;
        }
        self.delete(id).await
    }
}
