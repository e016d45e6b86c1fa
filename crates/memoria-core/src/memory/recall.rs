//! Answering natural-language questions from a user's memories.
//!
//! One model call picks the lookup (recent window, date range or
//! recency-boosted search), the hits are rendered with
//! [`format_memories_for_llm`], and a second call answers from that listing.
//! The owner is never taken from the model: every lookup is scoped to the
//! `user_id` the caller passes.

use memoria_types::config::RetrievalConfig;
use memoria_types::error::MemoryError;
use memoria_types::memory::Memory;
use memoria_types::recall::{RecallAnswer, RecallRoute};

use super::completion::CompletionClient;
use super::format::format_memories_for_llm;
use super::parse::parse_json_response;
use super::prompts;
use super::recency::{RecencySearch, day_span};

#[derive(Clone)]
pub struct MemoryRecall {
    recency: RecencySearch,
    llm: CompletionClient,
    retrieval: RetrievalConfig,
}

impl MemoryRecall {
    pub fn new(recency: RecencySearch, llm: CompletionClient, retrieval: RetrievalConfig) -> Self {
        Self {
            recency,
            llm,
            retrieval,
        }
    }

    pub async fn try_route(&self, question: &str) -> Result<RecallRoute, MemoryError> {
        let response = self
            .llm
            .complete(
                "route_recall",
                prompts::render(prompts::RECALL_ROUTING_SYSTEM_PROMPT),
                format!("Question: {question}"),
            )
            .await?;
        parse_json_response(&response)
    }

    /// Pick a lookup for `question`, falling back to searching for the
    /// question itself.
    pub async fn route(&self, question: &str) -> RecallRoute {
        let fallback = || RecallRoute::Search {
            query: question.to_string(),
        };
        match self.try_route(question).await {
            Ok(RecallRoute::Search { query }) if query.trim().is_empty() => fallback(),
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(error = %e, "recall routing failed; searching for the question");
                fallback()
            }
        }
    }

    pub async fn lookup(&self, user_id: &str, route: &RecallRoute) -> Vec<Memory> {
        match route {
            RecallRoute::Recent { days } => {
                let days = days.unwrap_or(self.retrieval.recent_days);
                self.recency.recent(user_id, days).await
            }
            RecallRoute::DateRange {
                start_date,
                end_date,
            } => {
                let (start, end) = day_span(*start_date, *end_date);
                self.recency.by_date_range(user_id, start, end).await
            }
            RecallRoute::Search { query } => self
                .recency
                .score_with_recency(
                    user_id,
                    query,
                    self.retrieval.boost_factor,
                    self.retrieval.search_limit,
                )
                .await
                .into_iter()
                .map(|result| result.memory)
                .collect(),
        }
    }

    /// Route, look up and answer `question` for `user_id`.
    ///
    /// Nothing found means no answering call. When the answering call fails
    /// the formatted listing itself is returned as the answer.
    #[tracing::instrument(name = "ask", skip(self, question))]
    pub async fn ask(&self, question: &str, user_id: &str) -> RecallAnswer {
        let route = self.route(question).await;
        let memories = self.lookup(user_id, &route).await;
        let listing = format_memories_for_llm(&memories);
        tracing::debug!(%route, hits = memories.len(), "recall lookup done");

        let answer = if memories.is_empty() {
            listing
        } else {
            match self
                .llm
                .complete(
                    "answer_recall",
                    prompts::render(prompts::RECALL_ANSWER_SYSTEM_PROMPT),
                    format!("Question: {question}\n\nMemories:\n{listing}"),
                )
                .await
            {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    tracing::warn!("empty recall answer; returning the listing");
                    listing
                }
                Err(e) => {
                    tracing::warn!(error = %e, "recall answer failed; returning the listing");
                    listing
                }
            }
        };

        RecallAnswer {
            route,
            memories,
            answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::repository::MemoryRepository;
    use crate::memory::testing::{HashingEmbedder, InMemoryIndex, ScriptedLlm, repository};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use memoria_types::memory::MemoryType;

    struct Harness {
        llm: ScriptedLlm,
        recall: MemoryRecall,
        repo: MemoryRepository,
    }

    fn harness() -> Harness {
        let index = InMemoryIndex::new();
        let repo = repository(&index, &HashingEmbedder::new());
        let llm = ScriptedLlm::new();
        let recall = MemoryRecall::new(
            RecencySearch::new(repo.clone(), 20),
            llm.client(),
            RetrievalConfig::default(),
        );
        Harness { llm, recall, repo }
    }

    #[tokio::test]
    async fn test_recent_route_answers_from_listing() {
        let h = harness();
        let mut rome = Memory::new("alice", "Visited Rome", MemoryType::Episodic);
        rome.timestamp = Utc::now() - Duration::days(30);
        h.repo.store(&rome).await;
        h.repo
            .store(&Memory::new("alice", "Visited Paris", MemoryType::Episodic))
            .await;
        h.llm.push(r#"{"tool": "recent", "days": 3}"#);
        h.llm.push("You visited Paris recently.");

        let answer = h.recall.ask("What did I do lately?", "alice").await;

        assert_eq!(answer.route, RecallRoute::Recent { days: Some(3) });
        assert_eq!(answer.memories.len(), 1);
        assert_eq!(answer.memories[0].content, "Visited Paris");
        assert_eq!(answer.answer, "You visited Paris recently.");
        assert_eq!(h.llm.calls(), 2);
        let prompts = h.llm.prompts();
        assert_eq!(prompts[0], "Question: What did I do lately?");
        assert!(prompts[1].contains("Memories:\n1. ["));
        assert!(prompts[1].ends_with("] Visited Paris"));
    }

    #[tokio::test]
    async fn test_date_range_route_is_inclusive_of_whole_days() {
        let h = harness();
        let mut march = Memory::new("alice", "Started a pottery class", MemoryType::Episodic);
        march.timestamp = Utc.with_ymd_and_hms(2024, 3, 31, 22, 15, 0).unwrap();
        h.repo.store(&march).await;
        h.repo
            .store(&Memory::new("alice", "Bought a new bike", MemoryType::Episodic))
            .await;
        h.llm.push(
            r#"```json
{"tool": "date_range", "start_date": "2024-03-01", "end_date": "2024-03-31"}
```"#,
        );
        h.llm.push("In March you started a pottery class.");

        let answer = h.recall.ask("What happened in March 2024?", "alice").await;

        assert_eq!(
            answer.route,
            RecallRoute::DateRange {
                start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            }
        );
        assert_eq!(answer.memories.len(), 1);
        assert_eq!(answer.memories[0].id, march.id);
    }

    #[tokio::test]
    async fn test_unparseable_route_searches_for_the_question() {
        let h = harness();
        h.repo
            .store(&Memory::new("alice", "Loves cheese pizza", MemoryType::Semantic))
            .await;
        h.repo
            .store(&Memory::new("bob", "Loves cheese pizza", MemoryType::Semantic))
            .await;
        h.llm.push("I would search, I think.");
        h.llm.push("You love cheese pizza.");

        let answer = h.recall.ask("cheese pizza", "alice").await;

        assert_eq!(
            answer.route,
            RecallRoute::Search {
                query: "cheese pizza".to_string()
            }
        );
        assert_eq!(answer.memories.len(), 1);
        assert_eq!(answer.memories[0].user_id, "alice");
        assert_eq!(answer.answer, "You love cheese pizza.");
    }

    #[tokio::test]
    async fn test_no_hits_skips_answering_call() {
        let h = harness();
        h.llm.push(r#"{"tool": "search", "query": "pizza"}"#);

        let answer = h.recall.ask("Do I like pizza?", "alice").await;

        assert!(answer.memories.is_empty());
        assert_eq!(answer.answer, "No memories found");
        assert_eq!(h.llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_answer_returns_listing() {
        let h = harness();
        h.repo
            .store(&Memory::new("alice", "Works as a nurse", MemoryType::Semantic))
            .await;
        // Routing gets an empty search query, answering gets "".
        h.llm.push(r#"{"tool": "search", "query": "  "}"#);

        let answer = h.recall.ask("Works as a nurse", "alice").await;

        assert_eq!(
            answer.route,
            RecallRoute::Search {
                query: "Works as a nurse".to_string()
            }
        );
        assert!(answer.answer.starts_with("1. ["));
        assert!(answer.answer.ends_with("] Works as a nurse"));
        assert_eq!(h.llm.calls(), 2);
    }
}
