//! LanceDB-backed `VectorIndex`.
//!
//! One table per collection. Payload fields map to string columns (see
//! [`super::schema`]); filters render to LanceDB SQL predicates. Similarity
//! is `1 - cosine distance`.

use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field};
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use serde_json::Value;
use tokio::sync::OnceCell;
use uuid::Uuid;

use memoria_core::memory::index::VectorIndex;
use memoria_types::error::RepositoryError;
use memoria_types::memory::payload_keys;
use memoria_types::vector::{FilterCondition, Payload, PointFilter, ScoredPoint, StoredPoint, VectorPoint};

use super::lance::LanceVectorStore;
use super::schema::{DISTANCE_COLUMN, ID_COLUMN, PAYLOAD_COLUMNS, memory_schema};

pub struct LanceVectorIndex {
    store: LanceVectorStore,
    table_name: String,
    dimension: usize,
    table: OnceCell<lancedb::Table>,
}

impl LanceVectorIndex {
    pub fn new(store: LanceVectorStore, table_name: impl Into<String>, dimension: usize) -> Self {
        Self {
            store,
            table_name: table_name.into(),
            dimension,
            table: OnceCell::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The table handle, opened or created on first use.
    async fn table(&self) -> Result<&lancedb::Table, RepositoryError> {
        self.table
            .get_or_try_init(|| async {
                let schema = Arc::new(memory_schema(self.dimension as i32));
                self.store.ensure_table(&self.table_name, schema).await
            })
            .await
    }

    fn build_record_batch(&self, points: &[VectorPoint]) -> Result<RecordBatch, RepositoryError> {
        let schema = Arc::new(memory_schema(self.dimension as i32));

        let mut values = Vec::with_capacity(points.len() * self.dimension);
        for point in points {
            if point.vector.len() != self.dimension {
                return Err(RepositoryError::Query(format!(
                    "vector for point {} has dimension {}, table expects {}",
                    point.id,
                    point.vector.len(),
                    self.dimension
                )));
            }
            values.extend_from_slice(&point.vector);
        }

        let id_array = StringArray::from(points.iter().map(|p| p.id.to_string()).collect::<Vec<_>>());
        let mut columns: Vec<Arc<dyn Array>> = vec![Arc::new(id_array)];
        for name in PAYLOAD_COLUMNS {
            let column: StringArray = points
                .iter()
                .map(|p| payload_column_value(&p.payload, name))
                .collect();
            columns.push(Arc::new(column));
        }

        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(Float32Array::from(values)),
            None,
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to build vector column: {e}")))?;
        columns.push(Arc::new(vector_array));

        RecordBatch::try_new(schema, columns)
            .map_err(|e| RepositoryError::Query(format!("Failed to build record batch: {e}")))
    }

    async fn collect(
        stream: impl futures_util::Stream<Item = Result<RecordBatch, lancedb::Error>>,
    ) -> Result<Vec<RecordBatch>, RepositoryError> {
        stream
            .try_collect()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to collect results: {e}")))
    }
}

/// Payload value as stored in a string column. Missing fields stay null.
fn payload_column_value(payload: &Payload, name: &str) -> Option<String> {
    match payload.get(name)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn string_column<'b>(batch: &'b RecordBatch, name: &str) -> Option<&'b StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

/// Rows of `batch` as `(id, payload, distance)`.
///
/// Rows with an unreadable id are skipped. Null payload columns are left
/// out of the payload so the repository can reject the record.
fn batch_to_rows(batch: &RecordBatch) -> Vec<(Uuid, Payload, Option<f32>)> {
    let Some(ids) = string_column(batch, ID_COLUMN) else {
        tracing::warn!("result batch has no id column; skipping");
        return Vec::new();
    };
    let payload_columns: Vec<(&str, Option<&StringArray>)> = PAYLOAD_COLUMNS
        .iter()
        .map(|name| (*name, string_column(batch, name)))
        .collect();
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let id = match Uuid::parse_str(ids.value(i)) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(raw_id = ids.value(i), error = %e, "skipping row with bad id");
                continue;
            }
        };

        let mut payload = Payload::new();
        for (name, column) in &payload_columns {
            let Some(column) = column else { continue };
            if column.is_null(i) {
                continue;
            }
            let raw = column.value(i);
            let value = if *name == payload_keys::METADATA {
                match serde_json::from_str::<Value>(raw) {
                    Ok(value @ Value::Object(_)) => value,
                    _ => continue,
                }
            } else {
                Value::String(raw.to_string())
            };
            payload.insert((*name).to_string(), value);
        }

        let distance = distances.map(|d| d.value(i));
        rows.push((id, payload, distance));
    }
    rows
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Render a filter as a LanceDB SQL predicate. `None` for an empty filter.
pub fn filter_to_sql(filter: &PointFilter) -> Result<Option<String>, RepositoryError> {
    let mut clauses = Vec::new();
    for condition in &filter.must {
        let key = match condition {
            FilterCondition::Equals { key, .. } | FilterCondition::Range { key, .. } => key,
        };
        if !is_identifier(key) {
            return Err(RepositoryError::Query(format!("invalid filter field: {key:?}")));
        }
        match condition {
            FilterCondition::Equals { value, .. } => {
                clauses.push(format!("{key} = {}", quote(value)));
            }
            FilterCondition::Range { gte, lte, .. } => {
                if let Some(gte) = gte {
                    clauses.push(format!("{key} >= {}", quote(gte)));
                }
                if let Some(lte) = lte {
                    clauses.push(format!("{key} <= {}", quote(lte)));
                }
            }
        }
    }
    Ok((!clauses.is_empty()).then(|| clauses.join(" AND ")))
}

fn id_list(ids: &[Uuid]) -> String {
    ids.iter()
        .map(|id| quote(&id.to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl VectorIndex for LanceVectorIndex {
    async fn ensure_collection(&self) -> Result<(), RepositoryError> {
        self.table().await.map(|_| ())
    }

    async fn upsert(&self, points: &[VectorPoint]) -> Result<(), RepositoryError> {
        if points.is_empty() {
            return Ok(());
        }
        let table = self.table().await?;
        let batch = self.build_record_batch(points)?;

        let ids: Vec<Uuid> = points.iter().map(|p| p.id).collect();
        table
            .delete(&format!("{ID_COLUMN} IN ({})", id_list(&ids)))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to replace points: {e}")))?;

        let schema = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to add points: {e}")))?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;

        let mut query = table
            .vector_search(vector)
            .map_err(|e| RepositoryError::Query(format!("Vector search setup failed: {e}")))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(limit);
        if let Some(predicate) = filter_to_sql(filter)? {
            query = query.only_if(predicate);
        }
        let results = query
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Vector search failed: {e}")))?;

        let mut hits: Vec<ScoredPoint> = Self::collect(results)
            .await?
            .iter()
            .flat_map(batch_to_rows)
            .map(|(id, payload, distance)| ScoredPoint {
                id,
                payload,
                score: 1.0 - distance.unwrap_or(1.0),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }

    async fn scroll(
        &self,
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<StoredPoint>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;

        let mut query = table.query().limit(limit);
        if let Some(predicate) = filter_to_sql(filter)? {
            query = query.only_if(predicate);
        }
        let results = query
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Scroll query failed: {e}")))?;

        Ok(Self::collect(results)
            .await?
            .iter()
            .flat_map(batch_to_rows)
            .map(|(id, payload, _)| StoredPoint { id, payload })
            .collect())
    }

    async fn delete(&self, ids: &[Uuid]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        let table = self.table().await?;
        table
            .delete(&format!("{ID_COLUMN} IN ({})", id_list(ids)))
            .await
            .map_err(|e| RepositoryError::Query(format!("Failed to delete points: {e}")))?;
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<StoredPoint>, RepositoryError> {
        let table = self.table().await?;
        let results = table
            .query()
            .only_if(format!("{ID_COLUMN} = {}", quote(&id.to_string())))
            .limit(1)
            .execute()
            .await
            .map_err(|e| RepositoryError::Query(format!("Point lookup failed: {e}")))?;

        Ok(Self::collect(results)
            .await?
            .iter()
            .flat_map(batch_to_rows)
            .map(|(id, payload, _)| StoredPoint { id, payload })
            .next())
    }
}
