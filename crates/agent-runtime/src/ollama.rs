//! Ollama Completion Gateway
//!
//! Implementation of `CompletionGateway` for local Ollama inference. Serves
//! text and structured completions; capability-advertised calls are not
//! supported and fail fast with the trait default.

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionGateway, FinishReason, GenerationOptions, ModelInfo, TokenUsage,
    },
    structured,
};
use async_trait::async_trait;
use ollama_rs::{
    Ollama,
    generation::{
        chat::{ChatMessage, ChatMessageResponse, request::ChatMessageRequest},
        parameters::{FormatType, JsonStructure},
    },
    models::ModelOptions,
};
use schemars::schema::RootSchema;
use serde_json::Value;

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Model used when the caller leaves it empty
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            model: "llama3.2".into(),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = std::env::var("OLLAMA_HOST").unwrap_or(defaults.host);
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model);

        Self { host, port, model }
    }
}

/// Ollama gateway
pub struct OllamaProvider {
    client: Ollama,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a new Ollama provider with custom host/port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::from_config(OllamaConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Self {
        Self {
            client: Ollama::new(config.host.as_str(), config.port),
            config,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Self {
        Self::from_config(OllamaConfig::default())
    }

    /// Convert agent messages to Ollama format; the system instruction
    /// becomes a leading system message.
    fn convert_messages(messages: &[Message], system: Option<&str>) -> Vec<ChatMessage> {
        system
            .map(|s| ChatMessage::system(s.to_string()))
            .into_iter()
            .chain(messages.iter().map(|m| match m.role {
                Role::User => ChatMessage::user(m.text()),
                Role::Assistant => ChatMessage::assistant(m.text()),
            }))
            .collect()
    }

    /// Build Ollama generation options
    fn build_options(opts: &GenerationOptions) -> ModelOptions {
        let mut options = ModelOptions::default()
            .temperature(opts.temperature)
            .num_predict(i32::try_from(opts.max_tokens).unwrap_or(i32::MAX));

        if let Some(top_p) = opts.top_p {
            options = options.top_p(top_p);
        }
        if !opts.stop_sequences.is_empty() {
            options = options.stop(opts.stop_sequences.clone());
        }
        options
    }

    fn request(&self, messages: &[Message], options: &GenerationOptions) -> ChatMessageRequest {
        let model = if options.model.is_empty() {
            self.config.model.clone()
        } else {
            options.model.clone()
        };

        ChatMessageRequest::new(
            model,
            Self::convert_messages(messages, options.system_prompt.as_deref()),
        )
        .options(Self::build_options(options))
    }

    async fn send(&self, request: ChatMessageRequest) -> Result<ChatMessageResponse> {
        tracing::debug!(model = %request.model_name, messages = request.messages.len(), "Ollama request");
        self.client
            .send_chat_messages(request)
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))
    }

    /// Convert Ollama response to agent completion
    fn convert_completion(response: ChatMessageResponse) -> Completion {
        Completion {
            content: response.message.content,
            usage: response.final_data.as_ref().map(|d| {
                let prompt = u32::try_from(d.prompt_eval_count).unwrap_or(u32::MAX);
                let completion = u32::try_from(d.eval_count).unwrap_or(u32::MAX);
                TokenUsage {
                    prompt_tokens: prompt,
                    completion_tokens: completion,
                    total_tokens: prompt.saturating_add(completion),
                }
            }),
            model: response.model,
            truncated: false,
            finish_reason: Some(FinishReason::Stop),
        }
    }
}

#[async_trait]
impl CompletionGateway for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                context_length: None, // Not exposed by Ollama API
            })
            .collect())
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let response = self.send(self.request(messages, options)).await?;
        Ok(Self::convert_completion(response))
    }

    /// Uses Ollama's native JSON format constraint in addition to the
    /// appended instruction, then validates like every other backend.
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &Value,
        options: &GenerationOptions,
    ) -> Result<Value> {
        let augmented = structured::with_structured_instruction(messages, schema);
        let format = serde_json::from_value::<RootSchema>(schema.clone())
            .map_or(FormatType::Json, |root| {
                FormatType::StructuredJson(JsonStructure::new_for_schema(root))
            });

        let request = self.request(&augmented, options).format(format);
        let response = self.send(request).await?;
        structured::parse_structured(&response.message.content, schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::CapabilityDescriptor;

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
    }

    #[test]
    fn test_message_conversion_prepends_system() {
        let messages = vec![Message::user("Hello"), Message::assistant("Hi there")];

        let converted = OllamaProvider::convert_messages(&messages, Some("You are helpful."));
        assert_eq!(converted.len(), 3);
        assert_eq!(converted[0].content, "You are helpful.");
        assert_eq!(converted[2].content, "Hi there");

        assert_eq!(OllamaProvider::convert_messages(&messages, None).len(), 2);
    }

    #[tokio::test]
    async fn test_capability_calls_fail_fast() {
        let provider = OllamaProvider::localhost();
        let descriptor = CapabilityDescriptor {
            name: "noop".into(),
            description: "Does nothing".into(),
            input_schema: serde_json::json!({"type": "object"}),
            output_schema: serde_json::json!({}),
        };

        let err = provider
            .complete_with_capabilities(&[Message::user("hi")], &[descriptor], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::CapabilityUnsupported(name) if name == "ollama"));
    }
}
