//! LLM-adjudicated merge of new candidates into stored memories.
//!
//! For one owner and a batch of candidates, `MemoryReconciler`:
//!
//! 1. returns an empty transcript for an empty batch;
//! 2. stores every candidate directly when the owner has no memories yet
//!    (no LLM call);
//! 3. otherwise gathers near-duplicates of every candidate, shows them to
//!    the merge model under short aliases ("0", "1", ...) together with the
//!    candidate facts, and applies the returned ADD/UPDATE/DELETE/NONE
//!    decisions in order.
//!
//! The whole read-decide-write cycle runs under the owner's lock. Decisions
//! may only touch memories the reconciler fetched for this owner; anything
//! else the model names is logged and ignored. ADD always mints a fresh id.

use std::collections::{HashMap, HashSet};

use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use memoria_types::config::ReconcileConfig;
use memoria_types::error::MemoryError;
use memoria_types::memory::{
    Memory, MemoryDecision, MemoryEvent, MemoryType, ReconcileTranscript,
};

use super::completion::CompletionClient;
use super::dedup::MemoryDeduplicator;
use super::locks::OwnerLocks;
use super::parse::parse_json_response;
use super::prompts;
use super::repository::MemoryRepository;

#[derive(Debug, Deserialize)]
struct RawDecisions {
    memory: Vec<RawDecision>,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    text: String,
    event: String,
    #[serde(default)]
    old_memory: Option<String>,
}

/// Parse the merge model's answer into decisions, in model order.
///
/// Decisions with an unrecognized event are logged and skipped; the rest of
/// the batch still applies.
pub fn parse_decisions(response: &str) -> Result<Vec<MemoryDecision>, MemoryError> {
    let raw: RawDecisions = parse_json_response(response)?;
    Ok(raw
        .memory
        .into_iter()
        .filter_map(|item| {
            let event = match item.event.parse::<MemoryEvent>() {
                Ok(event) => event,
                Err(_) => {
                    let err = MemoryError::UnknownEvent(item.event.clone());
                    tracing::warn!(error = %err, text = %item.text, "skipping merge decision");
                    return None;
                }
            };
            let id = item.id.and_then(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            Some(MemoryDecision {
                id,
                text: item.text.trim().to_string(),
                event,
                old_memory: item.old_memory,
            })
        })
        .collect())
}

/// Memories the model may refer to, with their aliases.
struct MergeContext {
    /// Near-duplicates shown to the model; alias is the position.
    shown: Vec<Memory>,
    /// Every memory fetched for this owner, by id.
    known: HashMap<Uuid, Memory>,
}

impl MergeContext {
    fn new(existing: Vec<Memory>, shown: Vec<Memory>) -> Self {
        let mut known: HashMap<Uuid, Memory> =
            existing.into_iter().map(|m| (m.id, m)).collect();
        for memory in &shown {
            known.entry(memory.id).or_insert_with(|| memory.clone());
        }
        Self { shown, known }
    }

    /// Look up a memory by alias or by real id.
    fn by_id(&self, id: &str) -> Option<&Memory> {
        let id = id.trim();
        if let Ok(alias) = id.parse::<usize>() {
            if let Some(memory) = self.shown.get(alias) {
                return Some(memory);
            }
        }
        Uuid::parse_str(id).ok().and_then(|uuid| self.known.get(&uuid))
    }

    fn by_content(&self, content: &str) -> Option<&Memory> {
        let content = content.trim();
        self.shown
            .iter()
            .find(|m| m.content == content)
            .or_else(|| self.known.values().find(|m| m.content == content))
    }

    /// Resolve a decision's target: by id first, then by `old_memory` text.
    fn resolve(&self, decision: &MemoryDecision) -> Option<&Memory> {
        decision
            .id
            .as_deref()
            .and_then(|id| self.by_id(id))
            .or_else(|| decision.old_memory.as_deref().and_then(|c| self.by_content(c)))
    }

    fn prompt_entries(&self) -> Value {
        Value::Array(
            self.shown
                .iter()
                .enumerate()
                .map(|(alias, m)| json!({"id": alias.to_string(), "text": m.content}))
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct MemoryReconciler {
    repository: MemoryRepository,
    deduplicator: MemoryDeduplicator,
    llm: CompletionClient,
    locks: OwnerLocks,
    max_context: usize,
}

impl MemoryReconciler {
    pub fn new(
        repository: MemoryRepository,
        deduplicator: MemoryDeduplicator,
        llm: CompletionClient,
        locks: OwnerLocks,
        max_context: usize,
    ) -> Self {
        Self {
            repository,
            deduplicator,
            llm,
            locks,
            max_context,
        }
    }

    pub fn from_config(
        repository: MemoryRepository,
        llm: CompletionClient,
        locks: OwnerLocks,
        config: &ReconcileConfig,
    ) -> Self {
        let deduplicator = MemoryDeduplicator::from_config(repository.clone(), config);
        Self::new(
            repository,
            deduplicator,
            llm,
            locks,
            config.max_context_memories,
        )
    }

    /// Reconcile candidates; any failure yields an empty transcript (already
    /// logged). Writes applied before the failure stay applied.
    pub async fn reconcile(&self, candidates: &[Memory], user_id: &str) -> ReconcileTranscript {
        match self.try_reconcile(candidates, user_id).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "reconciliation failed; nothing applied");
                ReconcileTranscript::default()
            }
        }
    }

    #[tracing::instrument(
        name = "reconcile_memories",
        skip(self, candidates),
        fields(user_id = %user_id, candidates = candidates.len())
    )]
    pub async fn try_reconcile(
        &self,
        candidates: &[Memory],
        user_id: &str,
    ) -> Result<ReconcileTranscript, MemoryError> {
        if candidates.is_empty() {
            return Ok(ReconcileTranscript::default());
        }

        let _guard = self.locks.acquire(user_id).await;

        let existing = self.repository.try_list_for_user(user_id, None).await?;
        if existing.is_empty() {
            return Ok(self.cold_start(candidates, user_id).await);
        }

        let shown = self.gather_context(candidates, user_id).await;
        let context = MergeContext::new(existing, shown);

        let facts: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let user_prompt = format!(
            "Current memory:\n{}\n\nRetrieved facts: {}\n\nReturn the updated memory.",
            serde_json::to_string_pretty(&context.prompt_entries())
                .map_err(|e| MemoryError::Parse(e.to_string()))?,
            json!(facts),
        );
        let response = self
            .llm
            .complete(
                "reconcile",
                prompts::render(prompts::MERGE_SYSTEM_PROMPT),
                user_prompt,
            )
            .await?;
        let decisions = parse_decisions(&response)?;
        tracing::debug!(decisions = decisions.len(), "merge decisions parsed");

        let transcript = self
            .apply(decisions, &context, candidates, user_id)
            .await;
        tracing::info!(
            added = transcript.added.len(),
            updated = transcript.updated.len(),
            deleted = transcript.deleted.len(),
            unchanged = transcript.unchanged.len(),
            "reconciliation applied"
        );
        Ok(transcript)
    }

    async fn cold_start(&self, candidates: &[Memory], user_id: &str) -> ReconcileTranscript {
        let mut added = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut memory = candidate.clone();
            memory.user_id = user_id.to_string();
            if self.repository.store(&memory).await.is_some() {
                added.push(memory);
            }
        }
        tracing::info!(added = added.len(), "cold start: stored all candidates");
        ReconcileTranscript::all_added(added)
    }

    /// Union of near-duplicates across candidates, first-seen order, capped.
    async fn gather_context(&self, candidates: &[Memory], user_id: &str) -> Vec<Memory> {
        let lookups = candidates
            .iter()
            .map(|candidate| self.deduplicator.try_find_scored(candidate, user_id));
        let mut seen = HashSet::new();
        let mut shown = Vec::new();
        for result in join_all(lookups).await {
            match result {
                Ok(hits) => {
                    for hit in hits {
                        if seen.insert(hit.memory.id) {
                            shown.push(hit.memory);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "near-duplicate lookup failed for one candidate")
                }
            }
        }
        shown.truncate(self.max_context);
        shown
    }

    async fn apply(
        &self,
        decisions: Vec<MemoryDecision>,
        context: &MergeContext,
        candidates: &[Memory],
        user_id: &str,
    ) -> ReconcileTranscript {
        let mut transcript = ReconcileTranscript::default();
        let mut removed: HashSet<Uuid> = HashSet::new();

        for decision in decisions {
            match decision.event {
                MemoryEvent::Add => {
                    if decision.text.is_empty() {
                        tracing::warn!("skipping ADD with empty text");
                        continue;
                    }
                    let memory_type = candidates
                        .iter()
                        .find(|c| c.content.trim().eq_ignore_ascii_case(&decision.text))
                        .map_or(MemoryType::Semantic, |c| c.memory_type);
                    let memory = Memory::new(user_id, decision.text, memory_type);
                    if self.repository.store(&memory).await.is_some() {
                        transcript.added.push(memory);
                    }
                }
                MemoryEvent::Update => {
                    if decision.text.is_empty() {
                        tracing::warn!("skipping UPDATE with empty text");
                        continue;
                    }
                    let memory = match context.resolve(&decision) {
                        Some(previous) if !removed.contains(&previous.id) => {
                            let mut replacement = Memory::new(
                                user_id,
                                decision.text.clone(),
                                previous.memory_type,
                            );
                            replacement.id = previous.id;
                            replacement.metadata = previous.metadata.clone();
                            replacement
                        }
                        _ => {
                            tracing::debug!(
                                id = ?decision.id,
                                "UPDATE target not found; storing as new memory"
                            );
                            Memory::new(user_id, decision.text, MemoryType::Semantic)
                        }
                    };
                    if self.repository.store(&memory).await.is_some() {
                        transcript.updated.push(memory);
                    }
                }
                MemoryEvent::Delete => {
                    let Some(target) = context.resolve(&decision) else {
                        tracing::debug!(id = ?decision.id, "DELETE target not found; ignoring");
                        continue;
                    };
                    if !removed.insert(target.id) {
                        continue;
                    }
                    if self.repository.delete(&target.id).await {
                        transcript.deleted.push(target.clone());
                    }
                }
                MemoryEvent::None => {
                    if let Some(target) = context.resolve(&decision) {
                        if !removed.contains(&target.id)
                            && !transcript.unchanged.iter().any(|m| m.id == target.id)
                        {
                            transcript.unchanged.push(target.clone());
                        }
                    }
                }
            }
        }
        transcript
    }
}
