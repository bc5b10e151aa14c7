//! Completion Gateway Strategy Pattern
//!
//! Defines a common interface for all model backends (Anthropic, Ollama, ...)
//! so agents work with any of them without code changes. Operations come in
//! three levels of structure: free text, schema-constrained JSON, and
//! tool-augmented completion.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{CompletionGateway, GenerationOptions};
//!
//! let gateway = AnthropicProvider::from_env()?;
//! let options = GenerationOptions::default().with_system_prompt("Be brief.");
//! let reply = gateway.complete_text(&messages, &options).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::{ContentBlock, Message};
use crate::structured;
use crate::tool::{CapabilityDescriptor, ToolCall};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Per-call generation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "claude-sonnet-4-5", "llama3.2")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default)]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,

    /// System instruction for this call
    #[serde(default)]
    pub system_prompt: Option<String>,
}

const fn default_temperature() -> f32 {
    0.3
}
const fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: None,
            stop_sequences: Vec::new(),
            system_prompt: None,
        }
    }
}

impl GenerationOptions {
    /// Options for `model` with default sampling
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Copy of these options carrying a different system instruction
    #[must_use]
    pub fn with_system_prompt(&self, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(prompt.into()),
            ..self.clone()
        }
    }
}

/// Response from a plain completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Whether the response was truncated
    pub truncated: bool,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

/// Token usage statistics
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

/// Result of a tool-augmented completion
#[derive(Clone, Debug)]
pub struct CompletionOutcome {
    /// Text emitted by the model (may be empty)
    pub text: String,

    /// Tool requests, in the order the model issued them
    pub tool_calls: Vec<ToolCall>,

    /// Backend finish reason
    pub finish_reason: FinishReason,

    /// The model turn exactly as it must be re-inserted into history
    pub message: Message,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,
}

impl CompletionOutcome {
    /// A final answer with no tool requests
    pub fn final_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            message: Message::assistant_blocks(vec![ContentBlock::text(text.clone())]),
            text,
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: None,
        }
    }

    /// A turn requesting tools, optionally preceded by text
    pub fn tool_use(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let text = text.into();
        let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
        if !text.is_empty() {
            blocks.push(ContentBlock::text(text.clone()));
        }
        blocks.extend(tool_calls.iter().map(ContentBlock::from));

        Self {
            message: Message::assistant_blocks(blocks),
            text,
            tool_calls,
            finish_reason: FinishReason::ToolUse,
            usage: None,
        }
    }

    /// More tool calls pending; the turn must be answered before the next
    /// model call.
    pub fn has_pending_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub context_length: Option<u32>,
}

/// Strategy trait for model backends
///
/// Implement this trait to add support for new backends.
/// Agents and pipelines work exclusively through this interface.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Short backend name used in errors and logs
    fn name(&self) -> &str;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    /// Generate a completion from messages
    async fn complete(&self, messages: &[Message], options: &GenerationOptions)
    -> Result<Completion>;

    /// Single free-text reply
    async fn complete_text(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String> {
        Ok(self.complete(messages, options).await?.content)
    }

    /// Reply constrained to JSON matching `schema`.
    ///
    /// A reply that cannot be parsed or does not conform fails with
    /// [`AgentError::SchemaViolation`]; there is no automatic retry.
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &Value,
        options: &GenerationOptions,
    ) -> Result<Value> {
        let augmented = structured::with_structured_instruction(messages, schema);
        let raw = self.complete_text(&augmented, options).await?;
        structured::parse_structured(&raw, schema)
    }

    /// Completion with the advertised capabilities. Backends without tool
    /// calling fail fast.
    async fn complete_with_capabilities(
        &self,
        _messages: &[Message],
        _capabilities: &[CapabilityDescriptor],
        _options: &GenerationOptions,
    ) -> Result<CompletionOutcome> {
        Err(AgentError::CapabilityUnsupported(self.name().to_string()))
    }
}

/// Ordered gateways with failover on retryable errors
///
/// The active gateway only changes when a call fails with an error for which
/// [`AgentError::is_retryable`] holds; other errors are returned as-is.
pub struct FailoverGateway {
    gateways: Vec<Arc<dyn CompletionGateway>>,
    current_index: AtomicUsize,
}

impl FailoverGateway {
    pub fn new(gateways: Vec<Arc<dyn CompletionGateway>>) -> Result<Self> {
        if gateways.is_empty() {
            return Err(AgentError::Config("failover requires at least one gateway".into()));
        }

        Ok(Self {
            gateways,
            current_index: AtomicUsize::new(0),
        })
    }

    /// Currently active gateway
    pub fn current(&self) -> Arc<dyn CompletionGateway> {
        let idx = self.current_index.load(Ordering::SeqCst) % self.gateways.len();
        Arc::clone(&self.gateways[idx])
    }

    /// Advance to next gateway
    pub fn advance(&self) {
        self.current_index.fetch_add(1, Ordering::SeqCst);
    }

    async fn attempt<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn(Arc<dyn CompletionGateway>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut last_error = None;

        for _ in 0..self.gateways.len() {
            let gateway = self.current();
            match op(Arc::clone(&gateway)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(gateway = gateway.name(), error = %e, "Gateway failed, failing over");
                    self.advance();
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AgentError::ProviderUnavailable("no gateway".into())))
    }
}

#[async_trait]
impl CompletionGateway for FailoverGateway {
    fn name(&self) -> &str {
        "failover"
    }

    async fn health_check(&self) -> Result<bool> {
        for gateway in &self.gateways {
            if gateway.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.current().list_models().await
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.attempt(|g| async move { g.complete(messages, options).await })
            .await
    }

    async fn complete_with_capabilities(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
        options: &GenerationOptions,
    ) -> Result<CompletionOutcome> {
        self.attempt(|g| async move {
            g.complete_with_capabilities(messages, capabilities, options)
                .await
        })
        .await
    }
}
