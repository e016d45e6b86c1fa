//! Application state wiring the memory pipeline to its concrete adapters.
//!
//! `AppState` pins the `memoria-core` ports to the `memoria-infra`
//! implementations: LanceDB for the vector index, fastembed for embeddings
//! and an OpenAI-compatible endpoint for completions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use memoria_core::llm::box_provider::BoxLlmProvider;
use memoria_core::llm::provider::LlmProvider;
use memoria_core::memory::box_embedder::BoxEmbedder;
use memoria_core::memory::box_index::BoxVectorIndex;
use memoria_core::memory::completion::{CompletionClient, CompletionSettings};
use memoria_core::memory::manager::MemoryManager;
use memoria_core::memory::repository::{MemoryRepository, RepositorySettings};
use memoria_infra::config::vector_store_path;
use memoria_infra::llm::build_provider;
use memoria_infra::vector::embedder::FastEmbedEmbedder;
use memoria_infra::vector::index::LanceVectorIndex;
use memoria_infra::vector::lance::LanceVectorStore;
use memoria_types::config::MemoriaConfig;
use memoria_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Shared state for every subcommand.
pub struct AppState {
    pub manager: MemoryManager,
    pub config: MemoriaConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the vector store, load the embedding model and connect the LLM.
    ///
    /// When `needs_llm` is false a missing API key is tolerated: listing and
    /// searching never call the model.
    pub async fn init(data_dir: PathBuf, config: MemoriaConfig, needs_llm: bool) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let embedding_config = config.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || FastEmbedEmbedder::new(&embedding_config))
            .await
            .context("Embedding model loader panicked")?
            .context("Failed to load embedding model")?;
        let embedder = BoxEmbedder::new(embedder);

        if embedder.dimension() != config.store.vector_size {
            tracing::warn!(
                configured = config.store.vector_size,
                model = embedder.dimension(),
                "store.vector_size does not match the embedding model, using the model dimension"
            );
        }

        let store = LanceVectorStore::new(vector_store_path(&data_dir))
            .await
            .context("Failed to open vector store")?;
        let index = BoxVectorIndex::new(LanceVectorIndex::new(
            store,
            config.store.collection_name.clone(),
            embedder.dimension(),
        ));
        index
            .ensure_collection()
            .await
            .context("Failed to prepare memory collection")?;

        let provider = match build_provider(&config.llm) {
            Ok(provider) => provider,
            Err(e) if !needs_llm => {
                tracing::debug!("llm unavailable, continuing without it: {e}");
                BoxLlmProvider::new(UnconfiguredProvider {
                    reason: e.to_string(),
                })
            }
            Err(e) => return Err(e).context("Failed to configure the LLM provider"),
        };
        let llm = CompletionClient::new(
            Arc::new(provider),
            CompletionSettings::from_config(&config.llm),
        );

        let repository = MemoryRepository::new(
            Arc::new(index),
            Arc::new(embedder),
            RepositorySettings::from_config(&config.retrieval, &config.embedding),
        );
        let manager = MemoryManager::new(repository, llm, &config);

        Ok(Self {
            manager,
            config,
            data_dir,
        })
    }
}

/// Stand-in provider for commands that never reach the model.
struct UnconfiguredProvider {
    reason: String,
}

impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::InvalidRequest(self.reason.clone()))
    }
}
