//! Vector database infrastructure for memory embeddings.
//!
//! LanceDB table management and the `VectorIndex` built on it, plus the
//! fastembed-based local embedder. Arrow schemas define the table layout.

pub mod embedder;
pub mod index;
pub mod lance;
pub mod schema;
