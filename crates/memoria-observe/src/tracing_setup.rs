//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use memoria_types::config::ObserveConfig;
//!
//! memoria_observe::tracing_setup::init_tracing(&ObserveConfig::default(), None).unwrap();
//! // ...
//! memoria_observe::tracing_setup::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use memoria_types::config::{LogFormat, ObserveConfig};

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Pick the filter: an explicit directive wins, then `RUST_LOG`, then the
/// configured default.
pub fn build_filter(config: &ObserveConfig, directive_override: Option<&str>) -> EnvFilter {
    if let Some(directive) = directive_override {
        return EnvFilter::new(directive);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
}

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// `log_format` picks human-readable or JSON lines; `otel_stdout` adds a
/// `tracing-opentelemetry` layer exporting spans to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(
    config: &ObserveConfig,
    directive_override: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = build_filter(config, directive_override);

    let (pretty_layer, json_layer) = match config.log_format {
        LogFormat::Pretty => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
        ),
    };

    let otel_layer = if config.otel_stdout {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("memoria");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let filter = build_filter(&ObserveConfig::default(), Some("memoria=trace"));
        assert_eq!(filter.to_string(), "memoria=trace");
    }

    #[test]
    fn test_init_twice_errors() {
        let config = ObserveConfig::default();
        // Whichever test initializes first wins; the second call must fail.
        let _ = init_tracing(&config, Some("warn"));
        assert!(init_tracing(&config, Some("warn")).is_err());
        shutdown_tracing();
    }
}
