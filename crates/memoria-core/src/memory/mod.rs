//! Long-term memory for Memoria.
//!
//! Ports (`VectorIndex`, `Embedder`) with their boxed wrappers, the
//! `MemoryRepository` built on them, and the pipeline stages layered on the
//! repository: extraction, near-duplicate lookup, LLM reconciliation,
//! recency-ranked search, question answering and pattern analysis.
//! `MemoryManager` composes them.

pub mod box_embedder;
pub mod box_index;
pub mod completion;
pub mod dedup;
pub mod embedder;
pub mod extractor;
pub mod format;
pub mod index;
pub mod locks;
pub mod manager;
pub mod parse;
pub mod patterns;
pub mod prompts;
pub mod recall;
pub mod recency;
pub mod reconciler;
pub mod record;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
