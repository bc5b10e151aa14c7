//! Anthropic Completion Gateway
//!
//! Implementation of `CompletionGateway` over the Anthropic Messages API,
//! including native tool calling.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{ContentBlock, Message, MessageContent, Role},
    provider::{
        Completion, CompletionGateway, CompletionOutcome, FinishReason, GenerationOptions,
        ModelInfo, TokenUsage,
    },
    tool::{CapabilityDescriptor, ToolCall},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const API_VERSION: &str = "2023-06-01";

/// Stored in history in place of a reply with no content
const EMPTY_TURN: &str = "(no content)";

/// Anthropic provider configuration
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// API key sent as `x-api-key`
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Default model when the caller leaves it empty
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
            model: agent_core::provider::DEFAULT_MODEL.into(),
            timeout_secs: 600,
        }
    }

    /// Read `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL` and `ANTHROPIC_MODEL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AgentError::Config("ANTHROPIC_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            config.model = model;
        }

        Ok(config)
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a MessageContent,
}

#[derive(Serialize)]
struct WireTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<&'a str>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
    display_name: Option<String>,
}

/// Anthropic Messages API gateway
pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn model<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        if options.model.is_empty() {
            &self.config.model
        } else {
            &options.model
        }
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        capabilities: &'a [CapabilityDescriptor],
        options: &'a GenerationOptions,
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model: self.model(options),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            system: options.system_prompt.as_deref(),
            stop_sequences: options.stop_sequences.iter().map(String::as_str).collect(),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            tools: capabilities
                .iter()
                .map(|c| WireTool {
                    name: &c.name,
                    description: &c.description,
                    input_schema: &c.input_schema,
                })
                .collect(),
        }
    }

    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse> {
        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Anthropic request"
        );

        let response = self
            .client
            .post(self.url("messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("invalid response body: {e}")))
    }
}

fn transport_error(e: reqwest::Error) -> AgentError {
    if e.is_timeout() || e.is_connect() {
        AgentError::ProviderUnavailable(e.to_string())
    } else {
        AgentError::Upstream(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body),
        s if s.is_server_error() || s.as_u16() == 529 => {
            AgentError::ProviderUnavailable(format!("{s}: {body}"))
        }
        s => AgentError::Upstream(format!("{s}: {body}")),
    })
}

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("tool_use") => FinishReason::ToolUse,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

fn usage(response: &MessagesResponse) -> Option<TokenUsage> {
    response.usage.as_ref().map(|u| TokenUsage {
        prompt_tokens: u.input_tokens,
        completion_tokens: u.output_tokens,
        total_tokens: u.input_tokens.saturating_add(u.output_tokens),
    })
}

fn into_outcome(response: MessagesResponse) -> CompletionOutcome {
    let finish = finish_reason(response.stop_reason.as_deref());
    let usage = usage(&response);

    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut blocks = Vec::with_capacity(response.content.len());

    for block in response.content {
        match block {
            ResponseBlock::Text { text } if text.trim().is_empty() => {}
            ResponseBlock::Text { text } => {
                blocks.push(ContentBlock::text(text.clone()));
                texts.push(text);
            }
            ResponseBlock::ToolUse { id, name, input } => {
                let call = ToolCall { id, name, input };
                blocks.push(ContentBlock::from(&call));
                tool_calls.push(call);
            }
            ResponseBlock::Other => {}
        }
    }

    // The Messages API rejects assistant turns with empty content on replay
    if blocks.is_empty() {
        blocks.push(ContentBlock::text(EMPTY_TURN));
    }

    CompletionOutcome {
        text: texts.join("\n"),
        tool_calls,
        finish_reason: finish,
        message: Message::assistant_blocks(blocks),
        usage,
    }
}

#[async_trait]
impl CompletionGateway for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn health_check(&self) -> Result<bool> {
        match self.list_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Anthropic health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("models"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(transport_error)?;

        let list: ModelList = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Upstream(format!("invalid model list: {e}")))?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.display_name.unwrap_or_else(|| m.id.clone()),
                id: m.id,
                context_length: None,
            })
            .collect())
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = self.build_request(messages, &[], options);
        let response = self.send(&request).await?;
        let outcome = into_outcome(response);

        Ok(Completion {
            truncated: outcome.finish_reason == FinishReason::Length,
            content: outcome.text,
            model: request.model.to_string(),
            usage: outcome.usage,
            finish_reason: Some(outcome.finish_reason),
        })
    }

    async fn complete_with_capabilities(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
        options: &GenerationOptions,
    ) -> Result<CompletionOutcome> {
        let request = self.build_request(messages, capabilities, options);
        let response = self.send(&request).await?;
        tracing::debug!(model = %response.model, stop = ?response.stop_reason, "Anthropic response");

        Ok(into_outcome(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ToolResult;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        let mut config = AnthropicConfig::new("test_api_key");
        config.base_url = server.uri();
        AnthropicProvider::new(config).unwrap()
    }

    fn descriptor() -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: "user_profile".into(),
            description: "Save or load a profile".into(),
            input_schema: json!({"type": "object", "properties": {"action": {"type": "string"}}}),
            output_schema: json!({}),
        }
    }

    #[tokio::test]
    async fn test_complete_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "system": "Be brief.",
                "messages": [{"role": "user", "content": "Hello?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_123",
                "type": "message",
                "role": "assistant",
                "model": "claude-sonnet-4-5",
                "content": [{"type": "text", "text": "Hello! How can I help?"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 7}
            })))
            .mount(&server)
            .await;

        let options = GenerationOptions::default().with_system_prompt("Be brief.");
        let completion = provider(&server)
            .complete(&[Message::user("Hello?")], &options)
            .await
            .unwrap();

        assert_eq!(completion.content, "Hello! How can I help?");
        assert_eq!(completion.usage.unwrap().total_tokens, 19);
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_tool_use_round_trip_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({
                "tools": [{"name": "user_profile"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-sonnet-4-5",
                "content": [
                    {"type": "text", "text": "Let me load your profile."},
                    {"type": "tool_use", "id": "toolu_01", "name": "user_profile",
                     "input": {"action": "load", "user_id": "ana"}}
                ],
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 40, "output_tokens": 20}
            })))
            .mount(&server)
            .await;

        let outcome = provider(&server)
            .complete_with_capabilities(
                &[Message::user("Hi")],
                &[descriptor()],
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.finish_reason, FinishReason::ToolUse);
        assert_eq!(outcome.text, "Let me load your profile.");
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].input["user_id"], "ana");

        // The continuation turn serializes back into the wire block shape
        let wire = serde_json::to_value(&outcome.message.content).unwrap();
        assert_eq!(wire[1]["type"], "tool_use");
        assert_eq!(wire[1]["id"], "toolu_01");

        let results = Message::tool_results(&[ToolResult::success("toolu_01", &json!({"ok": true}))]);
        let wire = serde_json::to_value(&results.content).unwrap();
        assert_eq!(wire[0]["type"], "tool_result");
        assert_eq!(wire[0]["tool_use_id"], "toolu_01");
    }

    #[test]
    fn test_empty_reply_keeps_history_replayable() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "model": "claude-sonnet-4-5",
            "content": [],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        let outcome = into_outcome(response);

        assert!(outcome.text.is_empty());
        assert!(!outcome.has_pending_tool_calls());
        assert_eq!(outcome.message.text(), EMPTY_TURN);

        let wire = serde_json::to_value(&outcome.message.content).unwrap();
        assert_eq!(wire, json!([{"type": "text", "text": EMPTY_TURN}]));
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete_text(&[Message::user("Hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bad_request_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete_text(&[Message::user("Hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Upstream(msg) if msg.contains("bad model")));
    }

    #[tokio::test]
    async fn test_structured_completion_strips_fences() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-sonnet-4-5",
                "content": [{"type": "text", "text": "```json\n{\"summary\": \"ok\"}\n```"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let schema = json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"]
        });
        let value = provider(&server)
            .complete_structured(&[Message::user("Summarize")], &schema, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "claude-sonnet-4-5", "display_name": "Claude Sonnet 4.5", "type": "model"}]
            })))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let models = provider.list_models().await.unwrap();
        assert_eq!(models[0].name, "Claude Sonnet 4.5");
        assert!(provider.health_check().await.unwrap());
    }
}
