//! Observability setup for Memoria: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
