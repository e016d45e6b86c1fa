//! Types for answering questions from stored memories.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::memory::Memory;

/// The lookup chosen for a question.
///
/// Deserialized from the routing model's answer, e.g.
/// `{"tool": "date_range", "start_date": "2024-03-01", "end_date": "2024-03-31"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum RecallRoute {
    /// Memories from the last `days` days; `None` uses the configured window.
    Recent {
        #[serde(default)]
        days: Option<i64>,
    },
    /// Memories between two calendar days, both inclusive.
    DateRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    /// Recency-boosted semantic search.
    Search { query: String },
}

impl std::fmt::Display for RecallRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recent { days: Some(days) } => write!(f, "recent ({days} days)"),
            Self::Recent { days: None } => write!(f, "recent"),
            Self::DateRange {
                start_date,
                end_date,
            } => write!(f, "date range {start_date} to {end_date}"),
            Self::Search { query } => write!(f, "search '{query}'"),
        }
    }
}

/// Outcome of one question: the lookup used, what it found, and the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallAnswer {
    pub route: RecallRoute,
    pub memories: Vec<Memory>,
    pub answer: String,
}
