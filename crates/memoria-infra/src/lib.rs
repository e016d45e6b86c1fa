//! Infrastructure layer for Memoria.
//!
//! Contains implementations of the ports defined in `memoria-core`: a
//! LanceDB-backed vector index, a local fastembed embedder, and
//! OpenAI-compatible LLM providers. Also loads `config.toml` from the data
//! directory.

pub mod config;
pub mod llm;
pub mod vector;
