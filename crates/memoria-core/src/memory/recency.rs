//! Recency-weighted search and time-window queries.
//!
//! Re-ranking uses `factor = 1 / (1 + age_days * boost_factor)`: exactly 1
//! at age zero, strictly decreasing with age for any positive boost, never
//! negative. Ages from clock skew are clamped to zero, and a negative or
//! non-finite boost is treated as no boost.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use memoria_types::error::MemoryError;
use memoria_types::memory::{Memory, MemorySearchResult};

use super::record;
use super::repository::MemoryRepository;

/// Elapsed days between `timestamp` and `now`, fractional, never negative.
pub fn age_in_days(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - timestamp).num_milliseconds().max(0);
    millis as f64 / 86_400_000.0
}

pub fn recency_factor(age_days: f64, boost_factor: f32) -> f32 {
    let boost = if boost_factor.is_finite() {
        f64::from(boost_factor.max(0.0))
    } else {
        0.0
    };
    (1.0 / (1.0 + age_days.max(0.0) * boost)) as f32
}

/// Start of a `days`-long window ending at `now`. `None` when the window
/// reaches past the representable range, meaning no lower bound.
pub fn window_start(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days.max(0)).and_then(|span| now.checked_sub_signed(span))
}

/// UTC bounds covering whole days `first` through `last`, in either order.
pub fn day_span(first: NaiveDate, last: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let (first, last) = if first <= last { (first, last) } else { (last, first) };
    let start = first.and_time(NaiveTime::MIN).and_utc();
    let end = last.succ_opt().map_or(DateTime::<Utc>::MAX_UTC, |next| {
        next.and_time(NaiveTime::MIN).and_utc() - Duration::microseconds(1)
    });
    (start, end)
}

/// Apply the recency boost, sort by boosted score and keep `top_k`.
pub fn rerank(
    mut results: Vec<MemorySearchResult>,
    boost_factor: f32,
    top_k: usize,
    now: DateTime<Utc>,
) -> Vec<MemorySearchResult> {
    for result in &mut results {
        let factor = recency_factor(age_in_days(result.memory.timestamp, now), boost_factor);
        result.boosted_score = result.score * factor;
    }
    results.sort_by(|a, b| b.boosted_score.total_cmp(&a.boosted_score));
    results.truncate(top_k);
    results
}

#[derive(Clone)]
pub struct RecencySearch {
    repository: MemoryRepository,
    /// Candidates fetched before re-ranking; raised to `top_k` when smaller.
    pool: usize,
}

impl RecencySearch {
    pub fn new(repository: MemoryRepository, pool: usize) -> Self {
        Self { repository, pool }
    }

    #[tracing::instrument(name = "recency_search", skip(self, query))]
    pub async fn try_score_with_recency(
        &self,
        user_id: &str,
        query: &str,
        boost_factor: f32,
        top_k: usize,
    ) -> Result<Vec<MemorySearchResult>, MemoryError> {
        let pool = self.pool.max(top_k);
        let candidates = self
            .repository
            .try_search_with_scores(query, user_id, None, pool)
            .await?;
        Ok(rerank(candidates, boost_factor, top_k, Utc::now()))
    }

    pub async fn score_with_recency(
        &self,
        user_id: &str,
        query: &str,
        boost_factor: f32,
        top_k: usize,
    ) -> Vec<MemorySearchResult> {
        self.try_score_with_recency(user_id, query, boost_factor, top_k)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, user_id, "recency search failed; returning no results");
                Vec::new()
            })
    }

    /// Memories created within the last `days` days. No ranking.
    pub async fn recent(&self, user_id: &str, days: i64) -> Vec<Memory> {
        let cutoff = window_start(Utc::now(), days);
        let filter = record::time_window_filter(user_id, cutoff, None);
        self.repository
            .custom_search(&filter, self.repository.list_page_size())
            .await
    }

    /// Memories with `start <= timestamp <= end`. No ranking.
    pub async fn by_date_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Memory> {
        let filter = record::time_window_filter(user_id, Some(start), Some(end));
        self.repository
            .custom_search(&filter, self.repository.list_page_size())
            .await
    }
}
