//! Read-only pattern analysis over a user's stored memories.

use serde::de::DeserializeOwned;

use memoria_types::error::MemoryError;
use memoria_types::memory::MemoryType;
use memoria_types::pattern::{ComprehensivePatterns, PatternReport, PreferenceReport, StyleReport};

use super::completion::CompletionClient;
use super::format::format_for_analysis;
use super::parse::parse_json_response;
use super::prompts;
use super::repository::MemoryRepository;

#[derive(Clone)]
pub struct PatternAnalyzer {
    repository: MemoryRepository,
    llm: CompletionClient,
}

impl PatternAnalyzer {
    pub fn new(repository: MemoryRepository, llm: CompletionClient) -> Self {
        Self { repository, llm }
    }

    /// List the owner's memories, send them with `template`, parse the answer.
    ///
    /// No memories means no model call and the default report.
    async fn try_analyze<T>(
        &self,
        operation: &'static str,
        template: &str,
        user_id: &str,
        memory_type: Option<MemoryType>,
    ) -> Result<T, MemoryError>
    where
        T: DeserializeOwned + Default,
    {
        let memories = self.repository.try_list_for_user(user_id, memory_type).await?;
        if memories.is_empty() {
            tracing::debug!(operation, user_id, "no memories to analyze");
            return Ok(T::default());
        }
        let listing = format_for_analysis(&memories);
        let response = self
            .llm
            .complete(
                operation,
                prompts::render(template),
                format!("Memories:\n{listing}"),
            )
            .await?;
        parse_json_response(&response)
    }

    async fn analyze<T>(
        &self,
        operation: &'static str,
        template: &str,
        user_id: &str,
        memory_type: Option<MemoryType>,
    ) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.try_analyze(operation, template, user_id, memory_type)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, operation, user_id, "analysis failed; returning empty report");
                T::default()
            })
    }

    pub async fn detect_patterns(&self, user_id: &str) -> PatternReport {
        self.analyze("detect_patterns", prompts::PATTERN_SYSTEM_PROMPT, user_id, None)
            .await
    }

    pub async fn analyze_preferences(&self, user_id: &str) -> PreferenceReport {
        self.analyze(
            "analyze_preferences",
            prompts::PREFERENCE_SYSTEM_PROMPT,
            user_id,
            None,
        )
        .await
    }

    /// Style is read from episodic memories only.
    pub async fn analyze_conversation_style(&self, user_id: &str) -> StyleReport {
        self.analyze(
            "analyze_conversation_style",
            prompts::STYLE_SYSTEM_PROMPT,
            user_id,
            Some(MemoryType::Episodic),
        )
        .await
    }

    /// All three analyses, run concurrently.
    #[tracing::instrument(name = "comprehensive_patterns", skip(self))]
    pub async fn get_comprehensive_patterns(&self, user_id: &str) -> ComprehensivePatterns {
        let (patterns, preferences, conversation_style) = tokio::join!(
            self.detect_patterns(user_id),
            self.analyze_preferences(user_id),
            self.analyze_conversation_style(user_id),
        );
        ComprehensivePatterns {
            patterns,
            preferences,
            conversation_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::{HashingEmbedder, InMemoryIndex, ScriptedLlm, repository};
    use memoria_types::memory::Memory;

    async fn seeded(index: &InMemoryIndex) -> MemoryRepository {
        let repo = repository(index, &HashingEmbedder::new());
        repo.store(&Memory::new("alice", "Loves cheese pizza", MemoryType::Semantic))
            .await;
        repo.store(&Memory::new(
            "alice",
            "Asked about Rust lifetimes",
            MemoryType::Episodic,
        ))
        .await;
        repo
    }

    #[tokio::test]
    async fn test_no_memories_returns_defaults_without_calls() {
        let index = InMemoryIndex::new();
        let llm = ScriptedLlm::new();
        let analyzer = PatternAnalyzer::new(repository(&index, &HashingEmbedder::new()), llm.client());

        let report = analyzer.get_comprehensive_patterns("alice").await;
        assert_eq!(report, ComprehensivePatterns::default());
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_detect_patterns_parses_fenced_answer() {
        let index = InMemoryIndex::new();
        let repo = seeded(&index).await;
        let llm = ScriptedLlm::with_responses([
            "```json\n{\"preferences\":[{\"topic\":\"pizza\"}],\"topic_clusters\":[]}\n```",
        ]);
        let analyzer = PatternAnalyzer::new(repo, llm.client());

        let report = analyzer.detect_patterns("alice").await;
        assert_eq!(report.preferences.len(), 1);
        assert!(report.behavioral_patterns.is_empty());

        let prompt = &llm.prompts()[0];
        assert!(prompt.starts_with("Memories:\n1. ["));
        assert!(prompt.contains("(semantic) Loves cheese pizza"));
        assert!(prompt.contains("(episodic) Asked about Rust lifetimes"));
    }

    #[tokio::test]
    async fn test_style_reads_episodic_only() {
        let index = InMemoryIndex::new();
        let repo = seeded(&index).await;
        let llm = ScriptedLlm::with_responses([r#"{"adaptation_suggestions":["Use code samples"]}"#]);
        let analyzer = PatternAnalyzer::new(repo, llm.client());

        let style = analyzer.analyze_conversation_style("alice").await;
        assert_eq!(style.adaptation_suggestions, vec!["Use code samples"]);
        let prompt = &llm.prompts()[0];
        assert!(!prompt.contains("cheese pizza"));
    }

    #[tokio::test]
    async fn test_unparseable_answer_degrades_to_default() {
        let index = InMemoryIndex::new();
        let repo = seeded(&index).await;
        let llm = ScriptedLlm::with_responses(["no patterns, sorry"]);
        let analyzer = PatternAnalyzer::new(repo, llm.client());

        assert_eq!(analyzer.analyze_preferences("alice").await, PreferenceReport::default());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_default() {
        let index = InMemoryIndex::new();
        let repo = seeded(&index).await;
        index.set_failing(true);
        let llm = ScriptedLlm::new();
        let analyzer = PatternAnalyzer::new(repo, llm.client());

        assert_eq!(analyzer.detect_patterns("alice").await, PatternReport::default());
        assert_eq!(llm.calls(), 0);
    }
}
