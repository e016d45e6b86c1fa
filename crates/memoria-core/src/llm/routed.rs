//! Length-based routing between two providers.
//!
//! Short prompts go to a fast model, long prompts to a larger one. The
//! threshold counts characters of the system prompt plus all messages.

use memoria_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::box_provider::BoxLlmProvider;
use super::provider::LlmProvider;

pub struct RoutedProvider {
    short: BoxLlmProvider,
    long: BoxLlmProvider,
    /// Long-route model id, substituted into requests sent to `long`.
    long_model: String,
    threshold_chars: usize,
}

impl RoutedProvider {
    pub fn new(
        short: BoxLlmProvider,
        long: BoxLlmProvider,
        long_model: impl Into<String>,
        threshold_chars: usize,
    ) -> Self {
        Self {
            short,
            long,
            long_model: long_model.into(),
            threshold_chars,
        }
    }

    fn is_long(&self, request: &CompletionRequest) -> bool {
        request.prompt_chars() >= self.threshold_chars
    }
}

impl LlmProvider for RoutedProvider {
    fn name(&self) -> &str {
        "routed"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.is_long(request) {
            tracing::debug!(
                provider = self.long.name(),
                chars = request.prompt_chars(),
                "routing long prompt"
            );
            let mut routed = request.clone();
            routed.model = self.long_model.clone();
            self.long.complete(&routed).await
        } else {
            tracing::debug!(provider = self.short.name(), "routing short prompt");
            self.short.complete(request).await
        }
    }
}
