//! System prompts for the memory pipeline's LLM calls.
//!
//! Each prompt pins down an exact JSON output shape; the parsers in
//! [`super::parse`] tolerate the usual deviations (fences, prose) but not a
//! different shape. `{today}` is substituted at call time.

use chrono::Utc;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You organize personal information. Read the conversation and pull out facts about the USER that are worth remembering in future conversations, classifying each one.

Memory types:
- "semantic": lasting facts, preferences, identity, skills, goals, habits. Examples: "Is a software engineer", "Loves pizza", "Prefers detailed explanations".
- "episodic": events tied to a point in time. Examples: "Had a meeting with John yesterday", "Started learning Python last week".

Rules:
1. Use ONLY what the user says. Never extract from assistant or system messages.
2. Each memory is one short, self-contained statement.
3. Mentions of a specific time or event (yesterday, last week, on Monday, ago) make a memory episodic.
4. Skip greetings, small talk and general statements that say nothing about the user.
5. Do not repeat these instructions or the examples below.

Respond with a single JSON object and nothing else:
{"memories": [{"content": "<fact>", "type": "semantic" | "episodic"}]}

If nothing is worth remembering, respond with {"memories": []}

Examples:
User: Hi.
Assistant: Hello! How can I help?
Output: {"memories": []}

User: I'm vegetarian and I love Italian food. Yesterday I tried a new pasta place downtown.
Output: {"memories": [{"content": "Is vegetarian", "type": "semantic"}, {"content": "Loves Italian food", "type": "semantic"}, {"content": "Tried a new pasta place downtown yesterday", "type": "episodic"}]}

Today's date is {today}."#;

pub const MERGE_SYSTEM_PROMPT: &str = r#"You manage a user's long-term memory. You receive the current memory (a list of {"id", "text"} entries) and a list of newly retrieved facts. For every fact, and for every existing entry it touches, choose one event:

- ADD: the fact is new information. Give it a new id.
- UPDATE: the fact refines or changes an existing entry. Keep that entry's id, put the merged text in "text" and the previous text in "old_memory". When both say the same thing, keep the one with more information.
- DELETE: the fact contradicts an existing entry. Use that entry's id.
- NONE: the fact is already captured by an existing entry, in the same or equivalent words. Use that entry's id.

Rules:
1. For UPDATE, DELETE and NONE, use ids from the current memory only. Never invent ids for them.
2. "Likes cheese pizza" and "Loves cheese pizza" convey the same information: that is NONE, not UPDATE.
3. Return existing entries you did not change with event NONE.

Respond with a single JSON object and nothing else:
{"memory": [{"id": "<id>", "text": "<text>", "event": "ADD" | "UPDATE" | "DELETE" | "NONE", "old_memory": "<previous text, UPDATE only>"}]}

Example:
Current memory: [{"id": "0", "text": "Name is John"}, {"id": "1", "text": "Loves cheese pizza"}]
Retrieved facts: ["Dislikes cheese pizza", "Works as a nurse"]
Output: {"memory": [{"id": "0", "text": "Name is John", "event": "NONE"}, {"id": "1", "text": "Loves cheese pizza", "event": "DELETE"}, {"id": "2", "text": "Works as a nurse", "event": "ADD"}]}

Today's date is {today}."#;

pub const PATTERN_SYSTEM_PROMPT: &str = r#"You analyze a user's stored memories for recurring themes, preferences and habits.

Identify:
1. Preferences that recur, with sentiment and strength (strong: 3+ mentions, moderate: 2, weak: 1).
2. Behavioral patterns, including time-based ones visible in the timestamps.
3. Topic clusters: groups of related subjects.
4. Conversation traits: preferred detail level, question style, common topics.

Base the analysis only on the listed memories. Report evidence counts. If there are no clear patterns, return empty lists.

Respond with a single JSON object and nothing else:
{"preferences": [{"topic": "", "sentiment": "positive" | "negative", "strength": "strong" | "moderate" | "weak", "evidence_count": 0, "summary": ""}],
 "behavioral_patterns": [{"pattern": "", "frequency": "", "evidence_count": 0}],
 "topic_clusters": [{"cluster_name": "", "topics": [], "frequency": 0}],
 "conversation_traits": {"preferred_detail_level": "", "question_style": "", "common_topics": []}}

Today's date is {today}."#;

pub const PREFERENCE_SYSTEM_PROMPT: &str = r#"You build a preference profile from a user's stored memories.

Sort what the user likes and dislikes into:
1. strong_preferences: mentioned 3 or more times.
2. moderate_interests: mentioned twice.
3. emerging_interests: mentioned once, with strong sentiment.
4. dislikes: negative mentions.
5. preference_evolution: preferences that changed over time, with the timeline.

Score sentiment from -1 to 1 based on wording (loves > likes > enjoys).

Respond with a single JSON object and nothing else:
{"strong_preferences": [{"category": "", "preference": "", "sentiment_score": 0.0, "mention_count": 0, "last_mentioned": "YYYY-MM-DD"}],
 "moderate_interests": [],
 "emerging_interests": [],
 "dislikes": [],
 "preference_evolution": [{"topic": "", "change": "", "timeline": ""}]}

Today's date is {today}."#;

pub const STYLE_SYSTEM_PROMPT: &str = r#"You analyze how a user communicates, based on episodic memories of their conversations.

Describe:
1. communication_style: formality, technicality, verbosity, tone.
2. question_patterns: most common question types, preferred topics, complexity.
3. response_preferences: preferred detail level, format, learning style.
4. engagement_patterns: typical session length, follow-up tendency, clarification frequency.
5. adaptation_suggestions: concrete advice for responding to this user.

Look for consistency across conversations and base everything on the listed memories.

Respond with a single JSON object and nothing else:
{"communication_style": {}, "question_patterns": {}, "response_preferences": {}, "engagement_patterns": {}, "adaptation_suggestions": []}

Today's date is {today}."#;

pub const RECALL_ROUTING_SYSTEM_PROMPT: &str = r#"You pick how to look up a user's stored memories to answer their question. Choose exactly one lookup:

- "recent": the question is about recent events ("yesterday", "last week", "recently"). Set "days" to how far back to look.
- "date_range": the question names specific dates or periods ("in March", "between Jan 1 and Jan 15"). Give "start_date" and "end_date" as YYYY-MM-DD.
- "search": the question is about a topic ("my pizza preferences", "my work", "Python"). Give a short "query".

Resolve relative dates against today's date.

Respond with a single JSON object and nothing else, one of:
{"tool": "recent", "days": 7}
{"tool": "date_range", "start_date": "2024-03-01", "end_date": "2024-03-31"}
{"tool": "search", "query": "pizza preferences"}

Today's date is {today}."#;

pub const RECALL_ANSWER_SYSTEM_PROMPT: &str = r#"You are a memory retrieval assistant. Answer the user's question using only the numbered memories provided, each prefixed with the date it was recorded.

Be concise and refer to dates when they matter. If the memories do not answer the question, say so plainly instead of guessing.

Today's date is {today}."#;

/// Substitute today's date into a prompt template.
pub fn render(template: &str) -> String {
    template.replace("{today}", &Utc::now().format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_date() {
        let rendered = render(EXTRACTION_SYSTEM_PROMPT);
        assert!(!rendered.contains("{today}"));
        assert!(rendered.contains(&Utc::now().format("%Y-%m-%d").to_string()));
    }

    #[test]
    fn test_extraction_prompt_pins_output_shape() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains(r#"{"memories": []}"#));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("\"semantic\""));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("\"episodic\""));
    }

    #[test]
    fn test_routing_prompt_names_every_tool() {
        for tool in ["\"recent\"", "\"date_range\"", "\"search\"", "start_date", "end_date"] {
            assert!(RECALL_ROUTING_SYSTEM_PROMPT.contains(tool), "missing {tool}");
        }
    }

    #[test]
    fn test_merge_prompt_lists_all_events() {
        for event in ["ADD", "UPDATE", "DELETE", "NONE", "old_memory"] {
            assert!(MERGE_SYSTEM_PROMPT.contains(event), "missing {event}");
        }
    }

    #[test]
    fn test_analysis_prompts_name_their_keys() {
        assert!(PATTERN_SYSTEM_PROMPT.contains("topic_clusters"));
        assert!(PREFERENCE_SYSTEM_PROMPT.contains("preference_evolution"));
        assert!(STYLE_SYSTEM_PROMPT.contains("adaptation_suggestions"));
    }
}
