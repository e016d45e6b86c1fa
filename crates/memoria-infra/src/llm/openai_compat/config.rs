//! Configuration for OpenAI-compatible providers.

use secrecy::SecretString;

use memoria_types::config::{EndpointConfig, LlmProviderKind};
use memoria_types::llm::LlmError;

/// Everything needed to construct a [`super::OpenAiCompatibleProvider`].
///
/// Does not derive Debug: it carries the API key.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "gemini", "groq").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.groq.com/openai/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model used when a request leaves the model empty.
    pub model: String,
}

impl OpenAiCompatConfig {
    /// Build from an endpoint section and an already-resolved key.
    pub fn from_endpoint(endpoint: &EndpointConfig, api_key: SecretString) -> Result<Self, LlmError> {
        let base_url = endpoint.effective_base_url().ok_or_else(|| {
            LlmError::InvalidRequest(format!(
                "provider '{}' needs an explicit base_url",
                endpoint.provider
            ))
        })?;
        let model = endpoint.effective_model();
        if model.is_empty() {
            return Err(LlmError::InvalidRequest(format!(
                "provider '{}' needs an explicit model",
                endpoint.provider
            )));
        }
        Ok(Self {
            provider_name: endpoint.provider.to_string(),
            base_url,
            api_key,
            model,
        })
    }
}

/// Convenience for the well-known hosted endpoints.
pub fn defaults_for(kind: LlmProviderKind, api_key: SecretString, model: &str) -> Result<OpenAiCompatConfig, LlmError> {
    OpenAiCompatConfig::from_endpoint(
        &EndpointConfig {
            provider: kind,
            model: Some(model.to_string()),
            base_url: None,
            api_key_env: None,
        },
        api_key,
    )
}
