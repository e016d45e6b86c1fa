//! Shared domain types for Memoria.
//!
//! This crate contains the types that flow through the memory pipeline:
//! stored memories, reconciliation transcripts and merge decisions, vector
//! index points and filters, LLM request shapes, pattern reports, recall
//! answers, the configuration tree, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod pattern;
pub mod recall;
pub mod vector;
