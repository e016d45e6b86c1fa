//! Plain-text renderings of memories for prompts.

use memoria_types::memory::Memory;

/// Numbered `"{i}. [YYYY-MM-DD] content"` lines for injecting recalled
/// memories into a chat prompt. `"No memories found"` when empty.
pub fn format_memories_for_llm(memories: &[Memory]) -> String {
    if memories.is_empty() {
        return "No memories found".to_string();
    }
    memories
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. [{}] {}", i + 1, m.timestamp.format("%Y-%m-%d"), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered, timestamped, typed listing used by pattern analysis.
pub fn format_for_analysis(memories: &[Memory]) -> String {
    memories
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "{}. [{}] ({}) {}",
                i + 1,
                m.timestamp.format("%Y-%m-%d %H:%M"),
                m.memory_type,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
