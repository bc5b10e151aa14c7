//! Tool System
//!
//! Capability contract and dispatcher. Capabilities are registered once at
//! agent assembly and dispatched by name from model tool requests or direct
//! driver calls.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::schema::{check_instance, json_schema_for};

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier assigned by the backend
    pub id: String,

    /// Capability name
    pub name: String,

    /// Raw, untyped input
    #[serde(default)]
    pub input: Value,
}

/// Result of one dispatched call, already serialized for transport
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Identifier of the originating call
    pub tool_use_id: String,

    /// Serialized success payload or `{"error": ...}` descriptor
    pub content: String,

    /// Whether `content` is an error descriptor
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(tool_use_id: impl Into<String>, output: &Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: output.to_string(),
            is_error: false,
        }
    }

    pub fn error(tool_use_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content: json!({ "error": message.into() }).to_string(),
            is_error: true,
        }
    }

    /// Parse the payload back into JSON
    pub fn payload(&self) -> Value {
        serde_json::from_str(&self.content).unwrap_or_else(|_| Value::String(self.content.clone()))
    }
}

/// Capability descriptor advertised to the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique capability identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// JSON Schema of the accepted input
    pub input_schema: Value,

    /// JSON Schema of the produced output
    #[serde(default)]
    pub output_schema: Value,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Describe the capability
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Validate and execute. Implementations must reject input that does not
    /// satisfy the declared input schema with [`AgentError::Validation`].
    async fn invoke(&self, input: Value) -> Result<Value>;

    /// Validate raw input against the declared schema
    fn validate(&self, input: &Value) -> Result<()> {
        let descriptor = self.descriptor();
        check_instance(&descriptor.input_schema, input).map_err(AgentError::Validation)
    }
}

/// Strongly typed capability; schemas are derived from the associated types.
///
/// Register through [`ToolRegistry::register_typed`] or wrap in [`Typed`].
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + JsonSchema + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn run(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Adapter exposing a [`TypedTool`] through the object-safe [`Tool`] contract
pub struct Typed<T>(pub T);

#[async_trait]
impl<T: TypedTool> Tool for Typed<T> {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: T::NAME.into(),
            description: T::DESCRIPTION.into(),
            input_schema: json_schema_for::<T::Input>(),
            output_schema: json_schema_for::<T::Output>(),
        }
    }

    async fn invoke(&self, input: Value) -> Result<Value> {
        self.validate(&input)?;
        let typed: T::Input = serde_json::from_value(input)
            .map_err(|e| AgentError::Validation(e.to_string()))?;

        let output = self.0.run(typed).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// How the calls of one model turn are executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One call at a time, in request order
    #[default]
    Sequential,
    /// All calls at once; results still come back in request order
    Concurrent,
}

/// Registry and dispatcher for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    descriptors: Vec<CapabilityDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an ordered list, rejecting duplicate names
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_boxed(tool)?;
        }
        Ok(registry)
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_boxed(Arc::new(tool))
    }

    /// Register a typed tool
    pub fn register_typed<T: TypedTool>(&mut self, tool: T) -> Result<()> {
        self.register(Typed(tool))
    }

    /// Register a shared tool
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let descriptor = tool.descriptor();

        if descriptor.name.is_empty() {
            return Err(AgentError::Config("capability name must not be empty".into()));
        }
        if self.index.contains_key(&descriptor.name) {
            return Err(AgentError::Config(format!(
                "duplicate capability name: {}",
                descriptor.name
            )));
        }

        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.descriptors.push(descriptor);
        self.tools.push(tool);
        Ok(())
    }

    /// Resolve a tool by name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&idx| Arc::clone(&self.tools[idx]))
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> &[CapabilityDescriptor] {
        &self.descriptors
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Direct driver invocation; errors are returned to the caller
    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self
            .resolve(name)
            .ok_or_else(|| AgentError::UnknownCapability(name.to_string()))?;

        tool.validate(&input)?;
        tool.invoke(input).await
    }

    /// Execute a model tool request. Never fails: unknown names, invalid
    /// input, execution errors and panics all become error results.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.resolve(&call.name) else {
            tracing::warn!(tool = %call.name, id = %call.id, "Unknown capability requested");
            return ToolResult::error(
                &call.id,
                AgentError::UnknownCapability(call.name.clone()).to_string(),
            );
        };

        if let Err(e) = tool.validate(&call.input) {
            tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Rejected tool input");
            return ToolResult::error(&call.id, message_of(&e));
        }

        tracing::info!(tool = %call.name, id = %call.id, "Executing tool");

        match AssertUnwindSafe(tool.invoke(call.input.clone()))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => ToolResult::success(&call.id, &output),
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Tool failed");
                ToolResult::error(&call.id, message_of(&e))
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "capability panicked".into());
                tracing::warn!(tool = %call.name, id = %call.id, %reason, "Tool panicked");
                ToolResult::error(&call.id, reason)
            }
        }
    }

    /// Execute every request of one model turn, one result per request in
    /// request order.
    pub async fn execute_all(&self, calls: &[ToolCall], mode: DispatchMode) -> Vec<ToolResult> {
        match mode {
            DispatchMode::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.execute(call).await);
                }
                results
            }
            DispatchMode::Concurrent => {
                futures::future::join_all(calls.iter().map(|call| self.execute(call))).await
            }
        }
    }
}

/// Message placed in an error descriptor
fn message_of(err: &AgentError) -> String {
    match err {
        AgentError::Validation(msg) | AgentError::ToolExecution(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoInput {
        text: String,
        #[serde(default)]
        times: Option<u32>,
    }

    #[derive(Serialize, JsonSchema)]
    struct EchoOutput {
        echoed: String,
    }

    struct EchoTool;

    #[async_trait]
    impl TypedTool for EchoTool {
        type Input = EchoInput;
        type Output = EchoOutput;

        const NAME: &'static str = "echo";
        const DESCRIPTION: &'static str = "Repeat the given text";

        async fn run(&self, input: EchoInput) -> Result<EchoOutput> {
            let times = input.times.unwrap_or(1) as usize;
            Ok(EchoOutput {
                echoed: input.text.repeat(times),
            })
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor {
                name: "explode".into(),
                description: "Always fails".into(),
                input_schema: json!({"type": "object"}),
                output_schema: json!({}),
            }
        }

        async fn invoke(&self, _input: Value) -> Result<Value> {
            Err(AgentError::ToolExecution("disk on fire".into()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor {
                name: "panic".into(),
                description: "Panics".into(),
                input_schema: json!({"type": "object"}),
                output_schema: json!({}),
            }
        }

        async fn invoke(&self, _input: Value) -> Result<Value> {
            panic!("unexpected state");
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register_typed(EchoTool).unwrap();
        registry.register(FailingTool).unwrap();
        registry.register(PanickingTool).unwrap();
        registry
    }

    fn call(id: &str, name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    #[test]
    fn test_tool_registry() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names(), vec!["echo", "explode", "panic"]);
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("unknown").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = registry();
        let err = registry.register_typed(EchoTool).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_typed_descriptor_has_schemas() {
        let registry = registry();
        let echo = &registry.descriptors()[0];
        assert_eq!(echo.input_schema["type"], "object");
        assert!(echo.output_schema["properties"].get("echoed").is_some());
    }

    #[tokio::test]
    async fn test_execute_success() {
        let registry = registry();
        let result = registry
            .execute(&call("c1", "echo", json!({"text": "hi", "times": 2})))
            .await;

        assert!(!result.is_error);
        assert_eq!(result.tool_use_id, "c1");
        assert_eq!(result.payload()["echoed"], "hihi");
    }

    #[tokio::test]
    async fn test_execute_never_fails() {
        let registry = registry();

        let unknown = registry.execute(&call("c1", "teleport", json!({}))).await;
        assert!(unknown.is_error);
        assert_eq!(unknown.payload()["error"], "unknown capability: teleport");

        let malformed = registry.execute(&call("c2", "echo", json!({"times": "x"}))).await;
        assert!(malformed.is_error);
        assert_eq!(malformed.tool_use_id, "c2");

        let failing = registry.execute(&call("c3", "explode", json!({}))).await;
        assert!(failing.is_error);
        assert_eq!(failing.payload()["error"], "disk on fire");

        let panicking = registry.execute(&call("c4", "panic", json!({}))).await;
        assert!(panicking.is_error);
        assert_eq!(panicking.payload()["error"], "unexpected state");
    }

    #[tokio::test]
    async fn test_execute_all_preserves_order() {
        let registry = registry();
        let calls = vec![
            call("a", "echo", json!({"text": "x"})),
            call("b", "nope", json!({})),
            call("c", "echo", json!({"text": "y"})),
        ];

        for mode in [DispatchMode::Sequential, DispatchMode::Concurrent] {
            let results = registry.execute_all(&calls, mode).await;
            let ids: Vec<_> = results.iter().map(|r| r.tool_use_id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert!(results[1].is_error);
        }
    }

    #[tokio::test]
    async fn test_direct_invoke_surfaces_errors() {
        let registry = registry();

        let err = registry.invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));

        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownCapability(_)));

        let ok = registry.invoke("echo", json!({"text": "a"})).await.unwrap();
        assert_eq!(ok["echoed"], "a");
    }

    /// Raw tool that trusts its input and counts how often it runs
    struct WeatherTool {
        runs: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Tool for WeatherTool {
        fn descriptor(&self) -> CapabilityDescriptor {
            CapabilityDescriptor {
                name: "weather".into(),
                description: "Weather for a city".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"]
                }),
                output_schema: json!({}),
            }
        }

        async fn invoke(&self, input: Value) -> Result<Value> {
            self.runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(json!({"city": input["city"], "sky": "clear"}))
        }
    }

    #[tokio::test]
    async fn test_direct_invoke_validates_raw_tools() {
        let tool = Arc::new(WeatherTool {
            runs: std::sync::atomic::AtomicUsize::new(0),
        });
        let mut registry = ToolRegistry::new();
        registry.register_boxed(tool.clone()).unwrap();

        let err = registry.invoke("weather", json!({"town": "Oslo"})).await.unwrap_err();
        assert!(matches!(err, AgentError::Validation(_)));
        assert_eq!(tool.runs.load(std::sync::atomic::Ordering::SeqCst), 0);

        let ok = registry.invoke("weather", json!({"city": "Oslo"})).await.unwrap();
        assert_eq!(ok["sky"], "clear");
        assert_eq!(tool.runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
