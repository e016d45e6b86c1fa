//! Vector index point and filter types.
//!
//! These are the storage-level shapes exchanged with a `VectorIndex`
//! implementation. The repository layer translates between them and
//! [`Memory`](crate::memory::Memory).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload stored next to each vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A point to write: id, embedding and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A point read back without a similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: Uuid,
    pub payload: Payload,
}

/// A point returned from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub payload: Payload,
    /// Cosine similarity, higher is closer.
    pub score: f32,
}

/// One predicate over a payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterCondition {
    /// Field equals the given string.
    Equals { key: String, value: String },
    /// Field lies within the inclusive string range. Either bound may be
    /// open.
    Range {
        key: String,
        gte: Option<String>,
        lte: Option<String>,
    },
}

/// Conjunction of [`FilterCondition`]s. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointFilter {
    pub must: Vec<FilterCondition>,
}

impl PointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(FilterCondition::Equals {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Add an inclusive range predicate.
    pub fn range(
        mut self,
        key: impl Into<String>,
        gte: Option<String>,
        lte: Option<String>,
    ) -> Self {
        self.must.push(FilterCondition::Range {
            key: key.into(),
            gte,
            lte,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate the filter against a payload.
    ///
    /// Values are compared as strings. Timestamps are written with
    /// [`format_timestamp`], so lexical order is chronological order.
    /// A missing or non-string field never matches.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|condition| match condition {
            FilterCondition::Equals { key, value } => {
                payload.get(key).and_then(|v| v.as_str()) == Some(value.as_str())
            }
            FilterCondition::Range { key, gte, lte } => {
                let Some(actual) = payload.get(key).and_then(|v| v.as_str()) else {
                    return false;
                };
                gte.as_deref().is_none_or(|lo| actual >= lo)
                    && lte.as_deref().is_none_or(|hi| actual <= hi)
            }
        })
    }
}

/// Render a timestamp the way it is persisted: RFC 3339, UTC, microseconds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn payload(user: &str, ts: &str) -> Payload {
        let mut p = Payload::new();
        p.insert("user_id".into(), json!(user));
        p.insert("timestamp".into(), json!(ts));
        p
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(PointFilter::new().matches(&Payload::new()));
    }

    #[test]
    fn test_equality_filter() {
        let filter = PointFilter::new().eq("user_id", "alice");
        assert!(filter.matches(&payload("alice", "x")));
        assert!(!filter.matches(&payload("bob", "x")));
        assert!(!filter.matches(&Payload::new()));
    }

    #[test]
    fn test_range_filter_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(2);
        let filter = PointFilter::new().range(
            "timestamp",
            Some(format_timestamp(&start)),
            Some(format_timestamp(&end)),
        );

        assert!(filter.matches(&payload("a", &format_timestamp(&start))));
        assert!(filter.matches(&payload("a", &format_timestamp(&end))));
        let after = end + Duration::microseconds(1);
        assert!(!filter.matches(&payload("a", &format_timestamp(&after))));
    }

    #[test]
    fn test_timestamp_format_sorts_chronologically() {
        let a = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        let b = a + Duration::milliseconds(1);
        assert!(format_timestamp(&a) < format_timestamp(&b));
        assert!(format_timestamp(&a).ends_with('Z'));
    }
}
