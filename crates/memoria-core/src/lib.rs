//! Memory pipeline logic and port trait definitions for Memoria.
//!
//! This crate defines the "ports" (vector index, embedder and LLM provider
//! traits) that the infrastructure layer implements, plus the extraction,
//! reconciliation, retrieval and pattern-analysis logic built on them. It
//! depends only on `memoria-types` -- never on `memoria-infra` or any
//! database/IO crate.

pub mod llm;
pub mod memory;
