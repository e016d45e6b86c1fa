//! VectorIndex trait for point storage with payload filtering.
//!
//! Defines the interface for the external vector database. The LanceDB
//! implementation lives in memoria-infra; an in-memory one backs the tests.

use memoria_types::error::RepositoryError;
use memoria_types::vector::{PointFilter, ScoredPoint, StoredPoint, VectorPoint};
use uuid::Uuid;

/// Trait for a vector collection of `(id, vector, payload)` points.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if it does not exist.
    ///
    /// Idempotent and safe under concurrent callers: a creator that loses
    /// the race observes "already exists" and proceeds.
    fn ensure_collection(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Write points, replacing any prior point with the same id.
    fn upsert(
        &self,
        points: &[VectorPoint],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Nearest points to `vector` that satisfy `filter`, by descending score.
    fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ScoredPoint>, RepositoryError>> + Send;

    /// Enumerate up to `limit` points matching `filter`, without a query vector.
    fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<StoredPoint>, RepositoryError>> + Send;

    /// Delete points by id. Missing ids are not an error.
    fn delete(
        &self,
        ids: &[Uuid],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch one point by id.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<StoredPoint>, RepositoryError>> + Send;
}
