//! Single-shot completions with a deadline.

use std::sync::Arc;
use std::time::Duration;

use memoria_types::config::LlmConfig;
use memoria_types::error::MemoryError;
use memoria_types::llm::{CompletionRequest, Message};

use crate::llm::box_provider::BoxLlmProvider;

/// Request parameters shared by every pipeline call.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// Model id; empty lets the provider pick its default.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl CompletionSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            model: config.endpoint.effective_model(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// Shared handle to the completion backend.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<BoxLlmProvider>,
    settings: CompletionSettings,
}

impl CompletionClient {
    pub fn new(provider: Arc<BoxLlmProvider>, settings: CompletionSettings) -> Self {
        Self { provider, settings }
    }

    /// Send `system` + one user message and return the raw response text.
    ///
    /// An elapsed deadline becomes [`MemoryError::Timeout`] tagged with
    /// `operation`.
    pub async fn complete(
        &self,
        operation: &'static str,
        system: String,
        user: String,
    ) -> Result<String, MemoryError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![Message::user(user)],
            system: Some(system),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
        };

        let response = tokio::time::timeout(self.settings.timeout, self.provider.complete(&request))
            .await
            .map_err(|_| MemoryError::Timeout {
                operation,
                after_ms: self.settings.timeout.as_millis() as u64,
            })??;

        tracing::debug!(
            operation,
            provider = self.provider.name(),
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "completion finished"
        );
        Ok(response.content)
    }
}
