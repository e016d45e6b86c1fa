//! Memory commands: add, search, ask, list, recent, range, delete, patterns.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use memoria_core::memory::recency::day_span;
use memoria_types::llm::{Message, MessageRole};
use memoria_types::memory::{Memory, MemorySearchResult, MemoryType};

use crate::state::AppState;

const CONTENT_WIDTH: usize = 60;

/// Parse a `ROLE:TEXT` argument into a message.
pub fn parse_message(raw: &str) -> Result<Message> {
    let Some((role, content)) = raw.split_once(':') else {
        bail!("expected ROLE:TEXT, got '{raw}'");
    };
    let role: MessageRole = role.trim().parse().map_err(anyhow::Error::msg)?;
    let content = content.trim();
    if content.is_empty() {
        bail!("message text is empty in '{raw}'");
    }
    Ok(Message {
        role,
        content: content.to_string(),
    })
}

/// Collect the conversation from `--file` (first) and `--message` flags.
pub async fn load_conversation(file: Option<&Path>, messages: &[String]) -> Result<Vec<Message>> {
    let mut conversation = Vec::new();
    if let Some(path) = file {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let parsed: Vec<Message> = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON array of messages", path.display()))?;
        conversation.extend(parsed);
    }
    for raw in messages {
        conversation.push(parse_message(raw)?);
    }
    if conversation.is_empty() {
        bail!("no messages given; pass --message ROLE:TEXT or --file");
    }
    Ok(conversation)
}

/// UTC bounds covering whole days `from` through `to`.
pub fn day_bounds(from: NaiveDate, to: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if from > to {
        bail!("--from {from} is after --to {to}");
    }
    Ok(day_span(from, to))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn type_cell(memory_type: MemoryType) -> Cell {
    match memory_type {
        MemoryType::Semantic => Cell::new("semantic").fg(Color::Cyan),
        MemoryType::Episodic => Cell::new("episodic").fg(Color::Magenta),
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::White))
            .collect::<Vec<_>>(),
    );
    table
}

fn print_memories(title: &str, memories: &[Memory], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(memories)?);
        return Ok(());
    }

    if memories.is_empty() {
        println!();
        println!("  {} No memories found.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = new_table(&["ID", "Content", "Type", "Date"]);
    for memory in memories {
        table.add_row(vec![
            Cell::new(memory.id.to_string()).fg(Color::DarkGrey),
            Cell::new(truncate(&memory.content, CONTENT_WIDTH)).fg(Color::White),
            type_cell(memory.memory_type),
            Cell::new(memory.timestamp.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  {}", style(title).bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} memor{}",
        style(memories.len()).bold(),
        if memories.len() == 1 { "y" } else { "ies" }
    );
    println!();
    Ok(())
}

/// Extract and reconcile a conversation.
///
/// ```bash
/// memoria add --user alice -m "user:I am vegetarian now." -m "assistant:Noted!"
/// ```
pub async fn add(
    state: &AppState,
    user: &str,
    file: Option<&Path>,
    messages: &[String],
    json: bool,
) -> Result<()> {
    let conversation = load_conversation(file, messages).await?;
    let transcript = state.manager.add_conversation(&conversation, user).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    println!();
    if transcript.is_empty() {
        println!("  {} Nothing new to remember.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    for memory in &transcript.added {
        println!("  {} {}", style("+").green().bold(), memory.content);
    }
    for memory in &transcript.updated {
        println!("  {} {}", style("~").yellow().bold(), memory.content);
    }
    for memory in &transcript.deleted {
        println!("  {} {}", style("-").red().bold(), style(&memory.content).strikethrough());
    }
    for memory in &transcript.unchanged {
        println!("  {} {}", style("=").dim(), style(&memory.content).dim());
    }
    println!();
    println!(
        "  {} added, {} updated, {} deleted, {} unchanged",
        style(transcript.added.len()).green().bold(),
        style(transcript.updated.len()).yellow().bold(),
        style(transcript.deleted.len()).red().bold(),
        transcript.unchanged.len(),
    );
    println!();
    Ok(())
}

/// Recency-boosted semantic search.
pub async fn search(
    state: &AppState,
    user: &str,
    query: &str,
    limit: Option<usize>,
    boost: Option<f32>,
    json: bool,
) -> Result<()> {
    let boost = boost.unwrap_or(state.config.retrieval.boost_factor);
    if !boost.is_finite() || boost < 0.0 {
        bail!("--boost must be a non-negative number");
    }
    let results = state
        .manager
        .search_with_boost(query, user, boost, limit)
        .await;
    print_results(query, &results, json)
}

fn print_results(query: &str, results: &[MemorySearchResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!();
        println!("  {} No memories match '{}'.", style("i").blue().bold(), query);
        println!();
        return Ok(());
    }

    let mut table = new_table(&["Content", "Type", "Score", "Boosted", "Date"]);
    for result in results {
        table.add_row(vec![
            Cell::new(truncate(&result.memory.content, CONTENT_WIDTH)).fg(Color::White),
            type_cell(result.memory.memory_type),
            Cell::new(format!("{:.3}", result.score)).fg(Color::DarkGrey),
            Cell::new(format!("{:.3}", result.boosted_score)).fg(Color::Yellow),
            Cell::new(result.memory.timestamp.format("%Y-%m-%d").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("  Results for '{}'", style(query).cyan().bold());
    println!();
    println!("{table}");
    println!();
    Ok(())
}

/// Answer a question from the user's memories.
///
/// ```bash
/// memoria ask --user alice "what did I do last week?"
/// ```
pub async fn ask(state: &AppState, user: &str, question: &str, json: bool) -> Result<()> {
    if question.trim().is_empty() {
        bail!("question is empty");
    }
    let answer = state.manager.ask(question, user).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!();
    println!("  {}", answer.answer.trim().replace('\n', "\n  "));
    println!();
    println!(
        "  {} {} ({} memor{})",
        style("via").dim(),
        style(&answer.route).cyan(),
        answer.memories.len(),
        if answer.memories.len() == 1 { "y" } else { "ies" }
    );
    println!();
    Ok(())
}

pub async fn list(state: &AppState, user: &str, memory_type: Option<MemoryType>, json: bool) -> Result<()> {
    let memories = state.manager.list_for_user(user, memory_type).await;
    print_memories(&format!("Memories for '{user}'"), &memories, json)
}

pub async fn recent(state: &AppState, user: &str, days: Option<i64>, json: bool) -> Result<()> {
    if matches!(days, Some(d) if d < 0) {
        bail!("--days must not be negative");
    }
    let window = days.unwrap_or(state.config.retrieval.recent_days);
    let memories = state.manager.recent(user, Some(window)).await;
    print_memories(&format!("Last {window} day(s) for '{user}'"), &memories, json)
}

pub async fn range(state: &AppState, user: &str, from: NaiveDate, to: NaiveDate, json: bool) -> Result<()> {
    let (start, end) = day_bounds(from, to)?;
    let memories = state.manager.by_date_range(user, start, end).await;
    print_memories(&format!("{from} to {to} for '{user}'"), &memories, json)
}

pub async fn delete(state: &AppState, user: &str, id: Uuid, json: bool) -> Result<()> {
    let deleted = state.manager.delete_for_owner(&id, user).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "id": id, "deleted": deleted }))?
        );
        return Ok(());
    }

    println!();
    if deleted {
        println!("  {} Deleted memory {}", style("ok").green().bold(), style(id).dim());
    } else {
        println!(
            "  {} No memory {} for '{}'",
            style("!").yellow().bold(),
            style(id).dim(),
            user
        );
    }
    println!();
    Ok(())
}

/// Pattern reports are always printed as JSON.
pub async fn patterns(state: &AppState, user: &str) -> Result<()> {
    let report = state.manager.get_comprehensive_patterns(user).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
