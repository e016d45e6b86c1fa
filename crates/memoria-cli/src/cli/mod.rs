//! CLI command definitions for the `memoria` binary.
//!
//! Uses clap derive macros. Every memory command is scoped to one owner
//! through `--user`.

pub mod config;
pub mod memory;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

use memoria_types::memory::MemoryType;

/// Long-term personal memory for conversational assistants.
#[derive(Parser)]
#[command(name = "memoria", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all logging except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logging (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter directive implied by `-v` / `--quiet`, if any.
    pub fn log_directive(&self) -> Option<&'static str> {
        match self.verbose {
            0 if self.quiet => Some("error"),
            0 => None,
            1 => Some("info,memoria=debug"),
            _ => Some("trace"),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract facts from a conversation and merge them into memory.
    Add {
        /// Owner of the memories.
        #[arg(long)]
        user: String,

        /// A conversation turn as ROLE:TEXT (repeatable, in order).
        #[arg(long = "message", short = 'm', value_name = "ROLE:TEXT")]
        messages: Vec<String>,

        /// JSON file holding an array of {"role", "content"} messages.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Search memories, favouring recent ones.
    Search {
        #[arg(long)]
        user: String,

        query: String,

        /// Number of results (default: retrieval.top_k).
        #[arg(long)]
        limit: Option<usize>,

        /// Recency boost factor (default: retrieval.boost_factor).
        #[arg(long)]
        boost: Option<f32>,
    },

    /// Answer a question from stored memories.
    Ask {
        #[arg(long)]
        user: String,

        /// The question, e.g. "what did I do last week?".
        question: String,
    },

    /// List stored memories.
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        user: String,

        /// Only this memory type (semantic or episodic).
        #[arg(long = "type", value_name = "TYPE")]
        memory_type: Option<MemoryType>,
    },

    /// Memories from the last few days.
    Recent {
        #[arg(long)]
        user: String,

        /// Window in days (default: retrieval.recent_days).
        #[arg(long)]
        days: Option<i64>,
    },

    /// Memories created between two dates (inclusive, UTC).
    Range {
        #[arg(long)]
        user: String,

        /// First day, YYYY-MM-DD.
        #[arg(long)]
        from: NaiveDate,

        /// Last day, YYYY-MM-DD.
        #[arg(long)]
        to: NaiveDate,
    },

    /// Delete one memory owned by the user.
    #[command(alias = "rm")]
    Delete {
        #[arg(long)]
        user: String,

        id: Uuid,
    },

    /// Analyze recurring patterns, preferences and conversation style.
    Patterns {
        #[arg(long)]
        user: String,
    },

    /// Print the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Commands {
    /// Whether the command calls the language model.
    pub fn needs_llm(&self) -> bool {
        matches!(
            self,
            Commands::Add { .. } | Commands::Ask { .. } | Commands::Patterns { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_with_messages() {
        let cli = Cli::try_parse_from([
            "memoria",
            "add",
            "--user",
            "alice",
            "-m",
            "user:I am vegetarian.",
            "--message",
            "assistant:Noted!",
        ])
        .unwrap();
        match cli.command {
            Commands::Add { user, messages, file } => {
                assert_eq!(user, "alice");
                assert_eq!(messages.len(), 2);
                assert!(file.is_none());
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_parse_list_type_and_global_json() {
        let cli = Cli::try_parse_from(["memoria", "list", "--user", "bob", "--type", "episodic", "--json"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::List { memory_type, .. } => {
                assert_eq!(memory_type, Some(MemoryType::Episodic));
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["memoria", "ask", "--user", "alice", "what did I eat?"]).unwrap();
        assert!(cli.command.needs_llm());
        match cli.command {
            Commands::Ask { user, question } => {
                assert_eq!(user, "alice");
                assert_eq!(question, "what did I eat?");
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_parse_range_rejects_bad_date() {
        assert!(
            Cli::try_parse_from([
                "memoria", "range", "--user", "u", "--from", "2024-13-01", "--to", "2024-12-31",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_log_directive() {
        let cli = Cli::try_parse_from(["memoria", "config"]).unwrap();
        assert_eq!(cli.log_directive(), None);
        let cli = Cli::try_parse_from(["memoria", "--quiet", "config"]).unwrap();
        assert_eq!(cli.log_directive(), Some("error"));
        let cli = Cli::try_parse_from(["memoria", "-vv", "config"]).unwrap();
        assert_eq!(cli.log_directive(), Some("trace"));
    }

    #[test]
    fn test_needs_llm() {
        let cli = Cli::try_parse_from(["memoria", "patterns", "--user", "u"]).unwrap();
        assert!(cli.command.needs_llm());
        let cli = Cli::try_parse_from(["memoria", "recent", "--user", "u"]).unwrap();
        assert!(!cli.command.needs_llm());
    }
}
