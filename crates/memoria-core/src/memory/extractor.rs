//! Conversation-to-memory extraction via LLM.
//!
//! `MemoryExtractor` renders chat turns into a role-prefixed transcript,
//! asks the model for `{"memories": [{"content", "type"}]}` and turns each
//! item into an unpersisted [`Memory`] candidate.
//!
//! Extraction is best-effort: a failed call or malformed answer logs a
//! warning and yields no candidates rather than breaking the turn.

use serde::Deserialize;

use memoria_types::error::MemoryError;
use memoria_types::llm::{Message, MessageRole};
use memoria_types::memory::{Memory, MemoryType};

use super::completion::CompletionClient;
use super::parse::parse_json_response;
use super::prompts;

#[derive(Debug, Deserialize)]
struct RawExtraction {
    memories: Vec<RawMemory>,
}

/// One extracted item. Bare strings are accepted as semantic facts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMemory {
    Typed {
        content: String,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
    Text(String),
}

/// Render messages as `"User: ...\nAssistant: ...\n"`. System turns are
/// left out; facts come from the conversation itself.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut transcript = String::new();
    for message in messages {
        let speaker = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
            MessageRole::System => continue,
        };
        transcript.push_str(speaker);
        transcript.push_str(": ");
        transcript.push_str(message.content.trim());
        transcript.push('\n');
    }
    transcript
}

/// Parse a model answer into candidates for `user_id`.
///
/// Items with empty content are dropped; unknown types become semantic.
pub fn parse_extraction(response: &str, user_id: &str) -> Result<Vec<Memory>, MemoryError> {
    let raw: RawExtraction = parse_json_response(response)?;
    Ok(raw
        .memories
        .into_iter()
        .filter_map(|item| {
            let (content, kind) = match item {
                RawMemory::Typed { content, kind } => (content, kind),
                RawMemory::Text(content) => (content, None),
            };
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            let memory_type = kind
                .as_deref()
                .map_or(MemoryType::Semantic, MemoryType::from_label_lenient);
            Some(Memory::new(user_id, content, memory_type))
        })
        .collect())
}

#[derive(Clone)]
pub struct MemoryExtractor {
    llm: CompletionClient,
}

impl MemoryExtractor {
    pub fn new(llm: CompletionClient) -> Self {
        Self { llm }
    }

    #[tracing::instrument(
        name = "extract_memory",
        skip(self, messages),
        fields(user_id = %user_id, message_count = messages.len())
    )]
    pub async fn try_extract(
        &self,
        messages: &[Message],
        user_id: &str,
    ) -> Result<Vec<Memory>, MemoryError> {
        let transcript = render_transcript(messages);
        if transcript.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .llm
            .complete(
                "extract",
                prompts::render(prompts::EXTRACTION_SYSTEM_PROMPT),
                format!("Extract memories from this conversation:\n\n{transcript}"),
            )
            .await?;

        let candidates = parse_extraction(&response, user_id).map_err(|e| {
            tracing::debug!(
                content_preview = %response.chars().take(200).collect::<String>(),
                "unparseable extraction response"
            );
            e
        })?;
        tracing::debug!(count = candidates.len(), "extracted memory candidates");
        Ok(candidates)
    }

    /// Extract candidates; any failure yields an empty list (already logged).
    pub async fn extract(&self, messages: &[Message], user_id: &str) -> Vec<Memory> {
        match self.try_extract(messages, user_id).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, user_id, "memory extraction failed; returning no candidates");
                Vec::new()
            }
        }
    }
}
