//! LLM provider construction.
//!
//! [`build_provider`] turns the `[llm]` config section into a ready
//! [`BoxLlmProvider`]: one OpenAI-compatible endpoint, or two behind a
//! length-based router when `[llm.long_prompt]` is present.

pub mod openai_compat;

use secrecy::SecretString;

use memoria_core::llm::box_provider::BoxLlmProvider;
use memoria_core::llm::routed::RoutedProvider;
use memoria_types::config::{EndpointConfig, LlmConfig};
use memoria_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Read an API key from the environment variable `var`.
///
/// An unset or blank variable is [`LlmError::MissingApiKey`].
pub fn resolve_api_key(var: &str) -> Result<SecretString, LlmError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
        _ => Err(LlmError::MissingApiKey(var.to_string())),
    }
}

/// Build a provider for one endpoint, resolving its key with `lookup`.
fn endpoint_provider(
    endpoint: &EndpointConfig,
    lookup: &impl Fn(&str) -> Result<SecretString, LlmError>,
) -> Result<OpenAiCompatibleProvider, LlmError> {
    let api_key = lookup(&endpoint.effective_api_key_env())?;
    let config = OpenAiCompatConfig::from_endpoint(endpoint, api_key)?;
    Ok(OpenAiCompatibleProvider::new(config))
}

fn build_with(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Result<SecretString, LlmError>,
) -> Result<BoxLlmProvider, LlmError> {
    let primary = endpoint_provider(&config.endpoint, &lookup)?;
    let Some(route) = &config.long_prompt else {
        tracing::info!(
            provider = %config.endpoint.provider,
            model = %config.endpoint.effective_model(),
            "llm provider ready"
        );
        return Ok(BoxLlmProvider::new(primary));
    };

    let long = endpoint_provider(&route.endpoint, &lookup)?;
    tracing::info!(
        short = %config.endpoint.effective_model(),
        long = %route.endpoint.effective_model(),
        threshold_chars = route.threshold_chars,
        "llm provider ready with long-prompt routing"
    );
    Ok(BoxLlmProvider::new(RoutedProvider::new(
        BoxLlmProvider::new(primary),
        BoxLlmProvider::new(long),
        route.endpoint.effective_model(),
        route.threshold_chars,
    )))
}

/// Create the completion provider described by `config`.
pub fn build_provider(config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    build_with(config, resolve_api_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_types::config::{LlmProviderKind, LongPromptRoute};

    fn fake_keys(present: &'static [&'static str]) -> impl Fn(&str) -> Result<SecretString, LlmError> {
        move |var| {
            if present.contains(&var) {
                Ok(SecretString::from("k".to_string()))
            } else {
                Err(LlmError::MissingApiKey(var.to_string()))
            }
        }
    }

    #[test]
    fn test_single_endpoint() {
        let provider = build_with(&LlmConfig::default(), fake_keys(&["GEMINI_API_KEY"])).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        let err = build_with(&LlmConfig::default(), fake_keys(&[])).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(ref var) if var == "GEMINI_API_KEY"));
    }

    #[test]
    fn test_long_prompt_route_builds_router() {
        let config = LlmConfig {
            endpoint: EndpointConfig {
                provider: LlmProviderKind::Groq,
                ..Default::default()
            },
            long_prompt: Some(LongPromptRoute {
                threshold_chars: 200,
                endpoint: EndpointConfig {
                    provider: LlmProviderKind::Gemini,
                    ..Default::default()
                },
            }),
            ..Default::default()
        };
        let provider =
            build_with(&config, fake_keys(&["GROQ_API_KEY", "GEMINI_API_KEY"])).unwrap();
        assert_eq!(provider.name(), "routed");

        let err = build_with(&config, fake_keys(&["GROQ_API_KEY"])).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(ref var) if var == "GEMINI_API_KEY"));
    }

    #[test]
    fn test_resolve_api_key_unset() {
        let err = resolve_api_key("MEMORIA_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }
}
