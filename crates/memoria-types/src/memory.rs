//! Memory types for Memoria.
//!
//! A [`Memory`] is a single durable fact or event about one user. Memories
//! are extracted from conversations, reconciled against what is already
//! stored, and retrieved later by semantic search.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Open key-value map attached to every memory.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Payload field names persisted alongside each vector point.
///
/// A point missing any of the required fields is treated as corrupt and
/// skipped on read.
pub mod payload_keys {
    pub const USER_ID: &str = "user_id";
    pub const MEMORY_TYPE: &str = "memory_type";
    pub const CONTENT: &str = "content";
    pub const TIMESTAMP: &str = "timestamp";
    pub const METADATA: &str = "metadata";

    /// Fields every stored point must carry.
    pub const REQUIRED: [&str; 4] = [USER_ID, MEMORY_TYPE, CONTENT, TIMESTAMP];
}

/// Kind of memory, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Timeless fact or preference ("is vegetarian").
    Semantic,
    /// Time-bound event ("met John yesterday").
    Episodic,
}

impl MemoryType {
    /// Classify a label produced by a model.
    ///
    /// Anything that is not recognizably episodic falls back to the more
    /// general `Semantic` type.
    pub fn from_label_lenient(label: &str) -> Self {
        label.parse().unwrap_or(MemoryType::Semantic)
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryType::Semantic => write!(f, "semantic"),
            MemoryType::Episodic => write!(f, "episodic"),
        }
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semantic" => Ok(MemoryType::Semantic),
            "episodic" => Ok(MemoryType::Episodic),
            other => Err(format!("invalid memory type: '{other}'")),
        }
    }
}

/// A single stored (or candidate) memory.
///
/// Every memory has exactly one owner and one type. Content is never empty
/// once it has passed extraction filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    /// The fact or observation.
    pub content: String,
    pub memory_type: MemoryType,
    /// Owner of the memory. All operations are scoped to one owner.
    pub user_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Creation time, used for recency decay and range filters.
    pub timestamp: DateTime<Utc>,
}

impl Memory {
    /// Create a fresh memory with a new UUIDv7 id, `now` timestamp and
    /// empty metadata.
    ///
    /// The timestamp is truncated to microseconds, the precision it is
    /// persisted with.
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            content: content.into(),
            memory_type,
            user_id: user_id.into(),
            metadata: Metadata::new(),
            timestamp: Utc::now().trunc_subsecs(6),
        }
    }
}

/// A memory returned from a ranked query.
///
/// Not persisted. `boosted_score` equals `score` until a recency boost has
/// been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySearchResult {
    #[serde(flatten)]
    pub memory: Memory,
    /// Raw similarity from the vector index (typically 0..1).
    pub score: f32,
    /// Similarity adjusted for age.
    pub boosted_score: f32,
}

impl MemorySearchResult {
    pub fn new(memory: Memory, score: f32) -> Self {
        Self {
            memory,
            score,
            boosted_score: score,
        }
    }
}

/// Outcome of one reconciliation call.
///
/// The four lists partition the applied merge decisions, not the input
/// candidates: a successful run may add nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileTranscript {
    pub added: Vec<Memory>,
    pub updated: Vec<Memory>,
    pub deleted: Vec<Memory>,
    pub unchanged: Vec<Memory>,
}

impl ReconcileTranscript {
    /// True when no decision was applied.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.unchanged.is_empty()
    }

    /// Transcript for a cold start: every candidate was added.
    pub fn all_added(added: Vec<Memory>) -> Self {
        Self {
            added,
            ..Self::default()
        }
    }
}

/// Merge decision tag chosen by the model for one fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryEvent {
    Add,
    Update,
    Delete,
    None,
}

impl fmt::Display for MemoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryEvent::Add => write!(f, "ADD"),
            MemoryEvent::Update => write!(f, "UPDATE"),
            MemoryEvent::Delete => write!(f, "DELETE"),
            MemoryEvent::None => write!(f, "NONE"),
        }
    }
}

impl FromStr for MemoryEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADD" => Ok(MemoryEvent::Add),
            "UPDATE" => Ok(MemoryEvent::Update),
            "DELETE" => Ok(MemoryEvent::Delete),
            "NONE" | "NOOP" | "NO_CHANGE" => Ok(MemoryEvent::None),
            other => Err(format!("invalid memory event: '{other}'")),
        }
    }
}

/// One validated merge decision parsed from the model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDecision {
    /// Id echoed by the model. Informational for ADD.
    pub id: Option<String>,
    pub text: String,
    pub event: MemoryEvent,
    /// Previous content, reported by the model for UPDATE.
    pub old_memory: Option<String>,
}
