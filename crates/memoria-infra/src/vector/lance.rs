//! Embedded LanceDB connection for the memory store.
//!
//! A `LanceVectorStore` owns one connection rooted at
//! `{data_dir}/vector_store`. Each logical collection is one table in it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_schema::Schema;

use memoria_types::error::RepositoryError;

fn connection_error(context: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Connection(format!("{context}: {e}"))
}

pub struct LanceVectorStore {
    db: lancedb::Connection,
    base_path: PathBuf,
}

impl LanceVectorStore {
    /// Connect to the store at `base_path`, creating the directory first.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path)
            .await
            .map_err(|e| connection_error(&format!("cannot create {}", base_path.display()), e))?;

        let Some(uri) = base_path.to_str() else {
            return Err(RepositoryError::Connection(format!(
                "vector store path is not UTF-8: {}",
                base_path.display()
            )));
        };
        let db = lancedb::connect(uri)
            .execute()
            .await
            .map_err(|e| connection_error("cannot open LanceDB", e))?;

        tracing::debug!(path = %base_path.display(), "vector store connected");
        Ok(Self { db, base_path })
    }

    /// Open `name`, creating it empty with `schema` when missing.
    ///
    /// Two processes may race to create the same table; the loser sees
    /// `TableAlreadyExists` and opens the winner's table instead.
    pub async fn ensure_table(
        &self,
        name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, RepositoryError> {
        let opened = match self.db.open_table(name).execute().await {
            Err(lancedb::Error::TableNotFound { .. }) => None,
            other => Some(other),
        };
        let result = match opened {
            Some(result) => result,
            None => match self.db.create_empty_table(name, schema).execute().await {
                Err(lancedb::Error::TableAlreadyExists { .. }) => {
                    tracing::debug!(table = name, "lost table creation race; reopening");
                    self.db.open_table(name).execute().await
                }
                created => {
                    if created.is_ok() {
                        tracing::info!(table = name, "created memory table");
                    }
                    created
                }
            },
        };
        result.map_err(|e| connection_error(&format!("cannot prepare table '{name}'"), e))
    }

    pub async fn table_names(&self) -> Result<Vec<String>, RepositoryError> {
        self.db
            .table_names()
            .execute()
            .await
            .map_err(|e| connection_error("cannot list tables", e))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}
