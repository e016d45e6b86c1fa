//! Type-erased [`VectorIndex`], so the repository can hold LanceDB in
//! production and the in-memory index in tests behind one type.

use std::future::Future;
use std::pin::Pin;

use memoria_types::error::RepositoryError;
use memoria_types::vector::{PointFilter, ScoredPoint, StoredPoint, VectorPoint};
use uuid::Uuid;

use super::index::VectorIndex;

type IndexFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

pub trait ErasedIndex: Send + Sync {
    fn erased_ensure_collection(&self) -> IndexFuture<'_, ()>;

    fn erased_upsert<'a>(&'a self, points: &'a [VectorPoint]) -> IndexFuture<'a, ()>;

    fn erased_search<'a>(
        &'a self,
        vector: &'a [f32],
        filter: &'a PointFilter,
        limit: usize,
    ) -> IndexFuture<'a, Vec<ScoredPoint>>;

    fn erased_scroll<'a>(
        &'a self,
        filter: &'a PointFilter,
        limit: usize,
    ) -> IndexFuture<'a, Vec<StoredPoint>>;

    fn erased_delete<'a>(&'a self, ids: &'a [Uuid]) -> IndexFuture<'a, ()>;

    fn erased_get<'a>(&'a self, id: &'a Uuid) -> IndexFuture<'a, Option<StoredPoint>>;
}

impl<I: VectorIndex> ErasedIndex for I {
    fn erased_ensure_collection(&self) -> IndexFuture<'_, ()> {
        Box::pin(self.ensure_collection())
    }

    fn erased_upsert<'a>(&'a self, points: &'a [VectorPoint]) -> IndexFuture<'a, ()> {
        Box::pin(self.upsert(points))
    }

    fn erased_search<'a>(
        &'a self,
        vector: &'a [f32],
        filter: &'a PointFilter,
        limit: usize,
    ) -> IndexFuture<'a, Vec<ScoredPoint>> {
        Box::pin(self.search(vector, filter, limit))
    }

    fn erased_scroll<'a>(
        &'a self,
        filter: &'a PointFilter,
        limit: usize,
    ) -> IndexFuture<'a, Vec<StoredPoint>> {
        Box::pin(self.scroll(filter, limit))
    }

    fn erased_delete<'a>(&'a self, ids: &'a [Uuid]) -> IndexFuture<'a, ()> {
        Box::pin(self.delete(ids))
    }

    fn erased_get<'a>(&'a self, id: &'a Uuid) -> IndexFuture<'a, Option<StoredPoint>> {
        Box::pin(self.get(id))
    }
}

pub struct BoxVectorIndex(Box<dyn ErasedIndex>);

impl BoxVectorIndex {
    pub fn new<I: VectorIndex + 'static>(index: I) -> Self {
        Self(Box::new(index))
    }

    pub async fn ensure_collection(&self) -> Result<(), RepositoryError> {
        self.0.erased_ensure_collection().await
    }

    pub async fn upsert(&self, points: &[VectorPoint]) -> Result<(), RepositoryError> {
        self.0.erased_upsert(points).await
    }

    pub async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RepositoryError> {
        self.0.erased_search(vector, filter, limit).await
    }

    pub async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<StoredPoint>, RepositoryError> {
        self.0.erased_scroll(filter, limit).await
    }

    pub async fn delete(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
        self.0.erased_delete(ids).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<StoredPoint>, RepositoryError> {
        self.0.erased_get(id).await
    }
}
