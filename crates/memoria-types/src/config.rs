//! Configuration types for Memoria.
//!
//! `MemoriaConfig` represents the `config.toml` in the data directory. Every
//! section and field has a default, so an empty or partial file is valid.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration for the memory subsystem.
///
/// Loaded from `~/.memoria/config.toml` (or `$MEMORIA_DATA_DIR/config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoriaConfig {
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    pub reconcile: ReconcileConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub observe: ObserveConfig,
}

/// Vector collection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name of the LanceDB table holding all memories.
    pub collection_name: String,
    /// Embedding dimension. Must match the embedding model.
    pub vector_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_name: "memories".to_string(),
            vector_size: 768,
        }
    }
}

/// Search and listing tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Memories a search-routed question is answered from.
    pub search_limit: usize,
    /// Cap on bulk listing per owner.
    pub list_page_size: usize,
    /// Candidate pool fetched before recency re-ranking.
    pub recency_pool: usize,
    /// Steepness of the recency decay.
    pub boost_factor: f32,
    /// Results returned after recency re-ranking.
    pub top_k: usize,
    /// Window used by "recent" queries.
    pub recent_days: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            search_limit: 5,
            list_page_size: 50,
            recency_pool: 20,
            boost_factor: 0.1,
            top_k: 10,
            recent_days: 7,
        }
    }
}

/// Reconciliation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Minimum similarity for an existing memory to be shown to the merge model.
    pub similarity_threshold: f32,
    /// Number of near-duplicates fetched per candidate.
    pub candidates_per_fact: usize,
    /// Upper bound on existing memories included in the merge prompt.
    pub max_context_memories: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            candidates_per_fact: 5,
            max_context_memories: 50,
        }
    }
}

/// Which hosted API family to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Gemini,
    Groq,
    #[serde(rename = "openai")]
    OpenAi,
    /// Any other OpenAI-compatible endpoint; requires `base_url`.
    Custom,
}

impl LlmProviderKind {
    /// Base URL of the provider's OpenAI-compatible endpoint.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProviderKind::Gemini => {
                Some("https://generativelanguage.googleapis.com/v1beta/openai")
            }
            LlmProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            LlmProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            LlmProviderKind::Custom => None,
        }
    }

    /// Environment variable conventionally holding the API key.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => "GEMINI_API_KEY",
            LlmProviderKind::Groq => "GROQ_API_KEY",
            LlmProviderKind::OpenAi => "OPENAI_API_KEY",
            LlmProviderKind::Custom => "MEMORIA_LLM_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => "gemini-2.0-flash",
            LlmProviderKind::Groq => "llama-3.3-70b-versatile",
            LlmProviderKind::OpenAi => "gpt-4o-mini",
            LlmProviderKind::Custom => "",
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProviderKind::Gemini => write!(f, "gemini"),
            LlmProviderKind::Groq => write!(f, "groq"),
            LlmProviderKind::OpenAi => write!(f, "openai"),
            LlmProviderKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(LlmProviderKind::Gemini),
            "groq" => Ok(LlmProviderKind::Groq),
            "openai" => Ok(LlmProviderKind::OpenAi),
            "custom" => Ok(LlmProviderKind::Custom),
            other => Err(format!("invalid llm provider: '{other}'")),
        }
    }
}

/// One concrete endpoint: provider family, model and credentials source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub provider: LlmProviderKind,
    /// Model id; the provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl EndpointConfig {
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn effective_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
    }

    pub fn effective_api_key_env(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| self.provider.default_api_key_env().to_string())
    }
}

/// Route prompts longer than `threshold_chars` to a second endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongPromptRoute {
    #[serde(default = "default_long_prompt_threshold")]
    pub threshold_chars: usize,
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
}

fn default_long_prompt_threshold() -> usize {
    200
}

/// Completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_prompt: Option<LongPromptRoute>,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            temperature: 0.2,
            max_tokens: 2048,
            timeout_secs: 60,
            long_prompt: None,
        }
    }
}

/// Local embedding model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name as published on Hugging Face.
    pub model: String,
    pub timeout_secs: u64,
    /// Where model files are cached; fastembed's default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "BAAI/bge-base-en-v1.5".to_string(),
            timeout_secs: 30,
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserveConfig {
    pub log_format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Export spans to stdout through OpenTelemetry.
    pub otel_stdout: bool,
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            default_filter: "memoria=info,warn".to_string(),
            otel_stdout: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MemoriaConfig::default();
        assert_eq!(config.store.collection_name, "memories");
        assert_eq!(config.store.vector_size, 768);
        assert_eq!(config.retrieval.search_limit, 5);
        assert_eq!(config.retrieval.list_page_size, 50);
        assert!(config.retrieval.recency_pool > config.retrieval.top_k);
        assert!((config.reconcile.similarity_threshold - 0.8).abs() < f32::EPSILON);
        assert!((config.llm.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.llm.endpoint.provider, LlmProviderKind::Gemini);
        assert!(config.llm.long_prompt.is_none());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: MemoriaConfig = toml::from_str("").unwrap();
        assert_eq!(config, MemoriaConfig::default());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let toml_str = r#"
[retrieval]
boost_factor = 0.5

[llm]
provider = "groq"
temperature = 0.0

[llm.long_prompt]
threshold_chars = 400
provider = "gemini"
model = "gemini-2.5-pro"

[observe]
log_format = "json"
"#;
        let config: MemoriaConfig = toml::from_str(toml_str).unwrap();
        assert!((config.retrieval.boost_factor - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.llm.endpoint.provider, LlmProviderKind::Groq);
        assert_eq!(config.llm.endpoint.effective_model(), "llama-3.3-70b-versatile");
        assert_eq!(config.llm.max_tokens, 2048);

        let route = config.llm.long_prompt.unwrap();
        assert_eq!(route.threshold_chars, 400);
        assert_eq!(route.endpoint.effective_model(), "gemini-2.5-pro");
        assert_eq!(config.observe.log_format, LogFormat::Json);
    }

    #[test]
    fn test_endpoint_defaults_per_provider() {
        let endpoint = EndpointConfig {
            provider: LlmProviderKind::Custom,
            model: Some("local".to_string()),
            base_url: None,
            api_key_env: None,
        };
        assert!(endpoint.effective_base_url().is_none());
        assert_eq!(endpoint.effective_api_key_env(), "MEMORIA_LLM_API_KEY");
        assert_eq!(
            LlmProviderKind::Groq.default_base_url(),
            Some("https://api.groq.com/openai/v1")
        );
    }

    #[test]
    fn test_provider_kind_roundtrip() {
        for kind in [
            LlmProviderKind::Gemini,
            LlmProviderKind::Groq,
            LlmProviderKind::OpenAi,
            LlmProviderKind::Custom,
        ] {
            let parsed: LlmProviderKind = kind.to_string().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_serde_roundtrip_toml() {
        let config = MemoriaConfig::default();
        let rendered = toml::to_string(&config).unwrap();
        let parsed: MemoriaConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
