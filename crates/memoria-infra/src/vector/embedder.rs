//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `memoria-core` with ONNX runtime
//! inference. Inference is CPU-bound, so each call runs on the blocking pool.

use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use memoria_core::memory::embedder::Embedder;
use memoria_types::config::EmbeddingConfig;
use memoria_types::error::EmbeddingError;

/// Map a configured model name to the fastembed model and its dimension.
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize), EmbeddingError> {
    match name {
        "BAAI/bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "BAAI/bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "BAAI/bge-large-en-v1.5" => Ok((EmbeddingModel::BGELargeENV15, 1024)),
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        other => Err(EmbeddingError::Model(format!(
            "unsupported embedding model '{other}'; supported: BAAI/bge-small-en-v1.5, \
             BAAI/bge-base-en-v1.5, BAAI/bge-large-en-v1.5, sentence-transformers/all-MiniLM-L6-v2"
        ))),
    }
}

pub struct FastEmbedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedEmbedder {
    /// Load the configured model, downloading it on first use.
    ///
    /// Blocking; call from `spawn_blocking` inside a runtime.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let (model, dimension) = resolve_model(&config.model)?;
        let mut options =
            InitOptions::new(model).with_show_download_progress(config.show_download_progress);
        if let Some(cache_dir) = &config.cache_dir {
            options = options.with_cache_dir(cache_dir.clone());
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            EmbeddingError::Model(format!("Failed to initialize embedding model: {e}"))
        })?;

        tracing::info!(model = %config.model, dimension, "initialized local embedder");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: config.model.clone(),
            dimension,
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| EmbeddingError::Model(format!("embedding model lock poisoned: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingError::Model(format!("Failed to generate embedding: {e}")))
        })
        .await
        .map_err(|e| EmbeddingError::Model(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
