//! Chat-completions client for OpenAI-compatible endpoints.
//!
//! Gemini, Groq and OpenAI all accept the same request shape at different
//! base URLs, so one [`OpenAiCompatibleProvider`] covers every configured
//! endpoint.

pub mod config;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionResponse, FinishReason,
};
use secrecy::ExposeSecret;

use memoria_core::llm::provider::LlmProvider;
use memoria_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, Message, MessageRole, StopReason, Usage,
};

use self::config::OpenAiCompatConfig;

/// No `Debug`: the client embeds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    default_model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_base(&config.base_url)
                .with_api_key(config.api_key.expose_secret()),
        );
        Self {
            client,
            provider_name: config.provider_name,
            default_model: config.model,
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let system = request.system.as_ref().map(|text| system_message(text));
        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(to_chat_message))
            .collect();

        let model = if request.model.is_empty() {
            &self.default_model
        } else {
            &request.model
        };

        CreateChatCompletionRequest {
            model: model.clone(),
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        }
    }
}

fn system_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(text.to_string()),
        name: None,
    })
}

fn to_chat_message(message: &Message) -> ChatCompletionRequestMessage {
    let text = message.content.clone();
    match message.role {
        MessageRole::System => system_message(&text),
        MessageRole::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(text),
            name: None,
        }),
        #[allow(deprecated)]
        MessageRole::Assistant => {
            ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                content: Some(ChatCompletionRequestAssistantMessageContent::Text(text)),
                refusal: None,
                name: None,
                audio: None,
                tool_calls: None,
                function_call: None,
            })
        }
    }
}

fn stop_reason(finish: Option<&FinishReason>) -> StopReason {
    match finish {
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::ContentFilter) => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// First choice of a chat response, flattened into a [`CompletionResponse`].
fn into_completion(response: CreateChatCompletionResponse) -> CompletionResponse {
    let first = response.choices.into_iter().next();
    let stop = stop_reason(first.as_ref().and_then(|c| c.finish_reason.as_ref()));
    let content = first.and_then(|c| c.message.content).unwrap_or_default();
    let usage = response.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    CompletionResponse {
        id: response.id,
        content,
        model: response.model,
        stop_reason: stop,
        usage,
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.build_request(request);
        tracing::debug!(provider = %self.provider_name, model = %body.model, "chat completion");

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(map_openai_error)?;
        Ok(into_completion(response))
    }
}

/// Classify an API error body by its code, type and message.
fn classify_api_error(code: &str, kind: &str, message: &str) -> Option<LlmError> {
    let auth_markers = ["Incorrect API key", "Invalid API key", "API key not valid"];
    if matches!(code, "authentication_error" | "invalid_api_key")
        || kind == "authentication_error"
        || auth_markers.iter().any(|m| message.contains(m))
    {
        return Some(LlmError::AuthenticationFailed);
    }
    if code == "rate_limit_exceeded" || kind == "rate_limit_error" {
        return Some(LlmError::RateLimited {
            retry_after_ms: None,
        });
    }
    if code == "context_length_exceeded" || message.contains("maximum context length") {
        return Some(LlmError::ContextLengthExceeded);
    }
    if code == "server_error" || kind == "overloaded_error" {
        return Some(LlmError::Overloaded(message.to_string()));
    }
    None
}

fn map_openai_error(err: OpenAIError) -> LlmError {
    let classified = match &err {
        OpenAIError::ApiError(api) => classify_api_error(
            api.code.as_deref().unwrap_or_default(),
            api.r#type.as_deref().unwrap_or_default(),
            &api.message,
        ),
        OpenAIError::Reqwest(http) => match http.status().map(|s| s.as_u16()) {
            Some(401 | 403) => Some(LlmError::AuthenticationFailed),
            Some(429) => Some(LlmError::RateLimited {
                retry_after_ms: None,
            }),
            Some(503 | 529) => Some(LlmError::Overloaded(err.to_string())),
            _ => None,
        },
        OpenAIError::JSONDeserialize(_, body) => Some(LlmError::Deserialization(format!(
            "failed to parse response: {body}"
        ))),
        OpenAIError::InvalidArgument(msg) => Some(LlmError::InvalidRequest(msg.clone())),
        _ => None,
    };
    classified.unwrap_or_else(|| LlmError::Provider {
        message: err.to_string(),
    })
}
