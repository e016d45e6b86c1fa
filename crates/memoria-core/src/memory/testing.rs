//! In-process test doubles for the memory pipeline.
//!
//! Each double is a cheap `Clone` handle over shared state, so a test can
//! box one copy into the component under test and keep another to inspect
//! call counts and stored points.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use memoria_types::error::{EmbeddingError, RepositoryError};
use memoria_types::llm::{CompletionRequest, CompletionResponse, LlmError, StopReason, Usage};
use memoria_types::vector::{PointFilter, ScoredPoint, StoredPoint, VectorPoint};
use uuid::Uuid;

use super::box_embedder::BoxEmbedder;
use super::box_index::BoxVectorIndex;
use super::completion::{CompletionClient, CompletionSettings};
use super::embedder::Embedder;
use super::index::VectorIndex;
use super::repository::{MemoryRepository, RepositorySettings};
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;

pub const TEST_DIMENSION: usize = 64;

// ---------------------------------------------------------------------------
// Vector index
// ---------------------------------------------------------------------------

#[derive(Default)]
struct IndexState {
    points: Mutex<BTreeMap<Uuid, (Vec<f32>, memoria_types::vector::Payload)>>,
    upserts: AtomicUsize,
    deletes: AtomicUsize,
    fail: AtomicBool,
}

/// Brute-force cosine index over a `BTreeMap`.
#[derive(Clone, Default)]
pub struct InMemoryIndex {
    state: Arc<IndexState>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> BoxVectorIndex {
        BoxVectorIndex::new(self.clone())
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_failing(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.state.points.lock().unwrap().len()
    }

    pub fn upsert_calls(&self) -> usize {
        self.state.upserts.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.state.deletes.load(Ordering::SeqCst)
    }

    pub fn contents(&self) -> Vec<String> {
        let points = self.state.points.lock().unwrap();
        let mut contents: Vec<String> = points
            .values()
            .filter_map(|(_, payload)| payload.get("content")?.as_str().map(str::to_string))
            .collect();
        contents.sort();
        contents
    }

    /// Insert a point directly, bypassing embedding (e.g. a corrupt payload).
    pub fn insert_raw(&self, id: Uuid, vector: Vec<f32>, payload: memoria_types::vector::Payload) {
        self.state.points.lock().unwrap().insert(id, (vector, payload));
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.state.fail.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection("index unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

impl VectorIndex for InMemoryIndex {
    async fn ensure_collection(&self) -> Result<(), RepositoryError> {
        self.check()
    }

    async fn upsert(&self, points: &[VectorPoint]) -> Result<(), RepositoryError> {
        self.check()?;
        self.state.upserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.state.points.lock().unwrap();
        for point in points {
            stored.insert(point.id, (point.vector.clone(), point.payload.clone()));
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RepositoryError> {
        self.check()?;
        let stored = self.state.points.lock().unwrap();
        let mut hits: Vec<ScoredPoint> = stored
            .iter()
            .filter(|(_, (_, payload))| filter.matches(payload))
            .map(|(id, (v, payload))| ScoredPoint {
                id: *id,
                payload: payload.clone(),
                score: cosine(vector, v),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<StoredPoint>, RepositoryError> {
        self.check()?;
        let stored = self.state.points.lock().unwrap();
        Ok(stored
            .iter()
            .filter(|(_, (_, payload))| filter.matches(payload))
            .take(limit)
            .map(|(id, (_, payload))| StoredPoint {
                id: *id,
                payload: payload.clone(),
            })
            .collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
        self.check()?;
        self.state.deletes.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.state.points.lock().unwrap();
        for id in ids {
            stored.remove(id);
        }
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<StoredPoint>, RepositoryError> {
        self.check()?;
        let stored = self.state.points.lock().unwrap();
        Ok(stored.get(id).map(|(_, payload)| StoredPoint {
            id: *id,
            payload: payload.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EmbedderState {
    calls: AtomicUsize,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

/// Bag-of-words embedder: each lowercase word hashes (FNV-1a) into one of
/// [`TEST_DIMENSION`] buckets. Identical texts embed identically, and texts
/// sharing words have proportionally similar vectors.
#[derive(Clone, Default)]
pub struct HashingEmbedder {
    state: Arc<EmbedderState>,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> BoxEmbedder {
        BoxEmbedder::new(self.clone())
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; TEST_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % TEST_DIMENSION as u64) as usize] += 1.0;
        }
        vector
    }
}

impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Model("embedder offline".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }

    fn dimension(&self) -> usize {
        TEST_DIMENSION
    }
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LlmState {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Mutex<Option<Duration>>,
}

/// Returns queued responses in order; an empty queue yields an empty string.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    state: Arc<LlmState>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let llm = Self::new();
        for response in responses {
            llm.push(response);
        }
        llm
    }

    pub fn push(&self, response: impl Into<String>) {
        self.state
            .responses
            .lock()
            .unwrap()
            .push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.state.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// User-message text of every request so far.
    pub fn prompts(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|r| r.messages.iter().map(|m| m.content.clone()))
            .collect()
    }

    pub fn client(&self) -> CompletionClient {
        CompletionClient::new(
            Arc::new(BoxLlmProvider::new(self.clone())),
            CompletionSettings {
                model: "scripted".to_string(),
                temperature: 0.0,
                max_tokens: 512,
                timeout: Duration::from_secs(5),
            },
        )
    }
}

impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.state.requests.lock().unwrap().push(request.clone());
        let delay = *self.state.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.state.responses.lock().unwrap().pop_front();
        let content = match next {
            Some(response) => response?,
            None => String::new(),
        };
        Ok(CompletionResponse {
            id: "scripted".to_string(),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Repository over fresh doubles, with default settings.
pub fn repository(index: &InMemoryIndex, embedder: &HashingEmbedder) -> MemoryRepository {
    MemoryRepository::new(
        Arc::new(index.boxed()),
        Arc::new(embedder.boxed()),
        RepositorySettings::default(),
    )
}
