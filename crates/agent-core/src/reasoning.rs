//! Reasoning Loop
//!
//! Conversational tool-calling loop. The model is called with every
//! registered capability; each tool-requesting turn is answered in full by
//! one driver turn of results before the model is called again.
//!
//! ```text
//!   AwaitingModel ──final──▶ AwaitingInput ──text──▶ AwaitingModel
//!        │   ▲                    │
//!     tools  │                   end
//!        ▼   │                    ▼
//!   DispatchingTools         SessionEnded
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{CompletionGateway, CompletionOutcome, GenerationOptions};
use crate::session::{ChatSession, LoopState};
use crate::tool::{DispatchMode, Tool, ToolRegistry, TypedTool, Typed};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System instruction sent with every model call
    pub system_prompt: String,

    /// Maximum model calls per driver turn before the session is ended
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// How the calls of one model turn are executed
    pub dispatch: DispatchMode,

    /// Deadline for a single model call
    pub call_timeout: Option<Duration>,

    /// Driver inputs that end the session (case-insensitive)
    pub end_words: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            dispatch: DispatchMode::Sequential,
            call_timeout: None,
            end_words: ["exit", "quit", "bye"].map(String::from).to_vec(),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Use the available tools when they help answer the request, then reply concisely.";

/// Driver turn in conversational mode
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverInput {
    Text(String),
    End,
}

/// One tool dispatch recorded in a turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolActivity {
    pub id: String,
    pub name: String,
    pub is_error: bool,
}

/// What happened while the loop ran up to the next driver turn
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TurnReport {
    /// Text emitted by each model turn, in order
    pub replies: Vec<String>,

    /// Tools dispatched, in order
    pub tools: Vec<ToolActivity>,

    /// Whether the session ended during this turn
    pub ended: bool,
}

impl TurnReport {
    /// All emitted text joined for display
    pub fn text(&self) -> String {
        self.replies.join("\n\n")
    }
}

/// Batch result status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Batch result; always produced, never an error
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutput {
    pub status: RunStatus,
    pub reply: String,
    pub tools_used: Vec<String>,
    pub error: Option<String>,
}

/// The main Agent struct
pub struct Agent {
    gateway: Arc<dyn CompletionGateway>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent. At least one capability must be registered.
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self> {
        if tools.is_empty() {
            return Err(AgentError::Config("agent requires at least one tool".into()));
        }
        if config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be positive".into()));
        }

        Ok(Self {
            gateway,
            tools,
            config,
        })
    }

    /// Classify a raw driver line
    pub fn interpret(&self, line: &str) -> DriverInput {
        let trimmed = line.trim();
        if self
            .config
            .end_words
            .iter()
            .any(|word| word.eq_ignore_ascii_case(trimmed))
        {
            DriverInput::End
        } else {
            DriverInput::Text(trimmed.to_string())
        }
    }

    /// Open a session seeded with `first_turn` and run it to the first
    /// driver prompt.
    pub async fn open(&self, first_turn: &str) -> (ChatSession, Result<TurnReport>) {
        let mut session = ChatSession::seeded(first_turn);
        tracing::info!(session = %session.id, "Session opened");
        let report = self.advance(&mut session).await;
        (session, report)
    }

    /// Feed one driver turn and run until the model yields back
    pub async fn submit(&self, session: &mut ChatSession, input: DriverInput) -> Result<TurnReport> {
        session.ensure_active()?;

        if session.state != LoopState::AwaitingInput {
            return Err(AgentError::Session(format!(
                "session {} is not awaiting input ({:?})",
                session.id, session.state
            )));
        }

        match input {
            DriverInput::End => {
                session.end("ended by driver");
                Ok(TurnReport {
                    ended: true,
                    ..TurnReport::default()
                })
            }
            DriverInput::Text(text) => {
                session.conversation.push(Message::user(text));
                session.state = LoopState::AwaitingModel;
                session.touch();
                self.advance(session).await
            }
        }
    }

    /// Step the loop until it awaits input or the session ends. Gateway
    /// failures end the session and are returned.
    pub async fn advance(&self, session: &mut ChatSession) -> Result<TurnReport> {
        let mut report = TurnReport::default();
        let mut model_calls = 0;

        loop {
            match session.state {
                LoopState::AwaitingModel => {
                    if model_calls >= self.config.max_iterations {
                        let err = AgentError::MaxIterations(self.config.max_iterations);
                        session.end(err.to_string());
                        return Err(err);
                    }
                    model_calls += 1;

                    let outcome = match self.call_model(session).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            session.end(e.user_message());
                            return Err(e);
                        }
                    };

                    if !outcome.text.trim().is_empty() {
                        report.replies.push(outcome.text.clone());
                    }

                    session.conversation.push(outcome.message);
                    if outcome.tool_calls.is_empty() {
                        session.state = LoopState::AwaitingInput;
                    } else {
                        session.pending_calls = outcome.tool_calls;
                        session.state = LoopState::DispatchingTools;
                    }
                }
                LoopState::DispatchingTools => {
                    let calls = std::mem::take(&mut session.pending_calls);
                    if !calls.is_empty() {
                        tracing::debug!(session = %session.id, count = calls.len(), "Dispatching tools");
                        let results = self.tools.execute_all(&calls, self.config.dispatch).await;

                        report.tools.extend(calls.iter().zip(&results).map(|(call, result)| {
                            ToolActivity {
                                id: call.id.clone(),
                                name: call.name.clone(),
                                is_error: result.is_error,
                            }
                        }));
                        session.conversation.push(Message::tool_results(&results));
                    }
                    session.state = LoopState::AwaitingModel;
                }
                LoopState::AwaitingInput => {
                    session.touch();
                    return Ok(report);
                }
                LoopState::SessionEnded => {
                    report.ended = true;
                    return session.ensure_active().map(|()| report);
                }
            }
        }
    }

    async fn call_model(&self, session: &ChatSession) -> Result<CompletionOutcome> {
        let options = self
            .config
            .generation
            .with_system_prompt(&self.config.system_prompt);

        tracing::debug!(
            session = %session.id,
            turns = session.conversation.len(),
            model = %options.model,
            "Calling model"
        );

        let call = self.gateway.complete_with_capabilities(
            session.conversation.messages(),
            self.tools.descriptors(),
            &options,
        );

        match self.config.call_timeout {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .map_err(|_| AgentError::Upstream(format!("model call exceeded {deadline:?}")))?,
            None => call.await,
        }
    }

    /// Batch mode: run one goal to a final reply. Failures are reported in
    /// the returned status rather than as an error.
    pub async fn ask(&self, goal: &str) -> RunOutput {
        let (session, report) = self.open(goal).await;

        match report {
            Ok(report) => RunOutput {
                status: RunStatus::Success,
                reply: report.replies.last().cloned().unwrap_or_default(),
                tools_used: report.tools.into_iter().map(|t| t.name).collect(),
                error: None,
            },
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "Batch run failed");
                RunOutput {
                    status: RunStatus::Failed,
                    reply: e.user_message(),
                    tools_used: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the gateway
    pub fn gateway(&self) -> &Arc<dyn CompletionGateway> {
        &self.gateway
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    gateway: Option<Arc<dyn CompletionGateway>>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            tools: Vec::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn CompletionGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    #[must_use]
    pub fn typed_tool<T: TypedTool>(self, tool: T) -> Self {
        self.tool(Typed(tool))
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.generation.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch = mode;
        self
    }

    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn end_words(mut self, words: &[&str]) -> Self {
        self.config.end_words = words.iter().map(|w| (*w).to_string()).collect();
        self
    }

    /// Fails on a missing gateway, an empty or duplicate tool registration,
    /// or a zero iteration bound.
    pub fn build(self) -> Result<Agent> {
        let gateway = self
            .gateway
            .ok_or_else(|| AgentError::Config("Gateway is required".into()))?;
        let registry = ToolRegistry::from_tools(self.tools)?;

        Agent::new(gateway, Arc::new(registry), self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RequestKind, ScriptedGateway};
    use crate::tool::ToolCall;
    use async_trait::async_trait;
    use schemars::JsonSchema;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    struct LookupInput {
        user_id: String,
    }

    #[derive(Serialize, JsonSchema)]
    struct LookupOutput {
        name: String,
    }

    struct LookupTool;

    #[async_trait]
    impl TypedTool for LookupTool {
        type Input = LookupInput;
        type Output = LookupOutput;

        const NAME: &'static str = "lookup";
        const DESCRIPTION: &'static str = "Look up a user";

        async fn run(&self, input: LookupInput) -> Result<LookupOutput> {
            Ok(LookupOutput {
                name: format!("user {}", input.user_id),
            })
        }
    }

    fn call(id: &str, name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    fn agent(gateway: Arc<ScriptedGateway>) -> Agent {
        AgentBuilder::new()
            .gateway(gateway)
            .typed_tool(LookupTool)
            .system_prompt("Be a coach.")
            .max_iterations(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_bad_registration() {
        let gateway = Arc::new(ScriptedGateway::new());

        let empty = AgentBuilder::new().gateway(gateway.clone()).build();
        assert!(matches!(empty, Err(AgentError::Config(_))));

        let duplicate = AgentBuilder::new()
            .gateway(gateway)
            .typed_tool(LookupTool)
            .typed_tool(LookupTool)
            .build();
        assert!(matches!(duplicate, Err(AgentError::Config(_))));

        let no_gateway = AgentBuilder::new().typed_tool(LookupTool).build();
        assert!(matches!(no_gateway, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_interpret_end_words() {
        let agent = agent(Arc::new(ScriptedGateway::new()));
        assert_eq!(agent.interpret("  BYE "), DriverInput::End);
        assert_eq!(agent.interpret("quit"), DriverInput::End);
        assert_eq!(
            agent.interpret("bye for now"),
            DriverInput::Text("bye for now".into())
        );
    }

    #[tokio::test]
    async fn test_valid_and_unknown_calls_answered_in_one_turn() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_outcome(CompletionOutcome::tool_use(
            "Checking.",
            vec![
                call("t1", "lookup", json!({"user_id": "ana"})),
                call("t2", "teleport", json!({})),
            ],
        ));
        gateway.push_text("Hi Ana!");

        let agent = agent(gateway.clone());
        let (session, report) = agent.open("Hello, I'm ready to start.").await;
        let report = report.unwrap();

        assert_eq!(report.replies, vec!["Checking.", "Hi Ana!"]);
        assert_eq!(session.state, LoopState::AwaitingInput);
        assert!(session.conversation.check_alternation().is_ok());

        // seed, tool request, results, final reply
        let messages = session.conversation.messages();
        assert_eq!(messages.len(), 4);
        let results = &messages[2];
        assert_eq!(results.answered_call_ids(), vec!["t1", "t2"]);

        let activity: Vec<_> = report.tools.iter().map(|t| (t.id.as_str(), t.is_error)).collect();
        assert_eq!(activity, vec![("t1", false), ("t2", true)]);

        // Second model call sees the results; every call carries descriptors
        // and the per-call system instruction.
        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.kind == RequestKind::Capabilities));
        assert_eq!(requests[0].capabilities[0].name, "lookup");
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[0].options.system_prompt.as_deref(), Some("Be a coach."));
    }

    #[tokio::test]
    async fn test_driver_turns_and_end_signal() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_text("Welcome back.");
        gateway.push_text("Leg day it is.");

        let agent = agent(gateway);
        let (mut session, _) = agent.open("hello").await;

        let report = agent
            .submit(&mut session, DriverInput::Text("legs please".into()))
            .await
            .unwrap();
        assert_eq!(report.text(), "Leg day it is.");

        let report = agent.submit(&mut session, DriverInput::End).await.unwrap();
        assert!(report.ended);
        assert_eq!(session.state, LoopState::SessionEnded);

        let err = agent
            .submit(&mut session, DriverInput::Text("again".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SessionEnded(_)));
    }

    #[tokio::test]
    async fn test_gateway_failure_ends_session() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_error(AgentError::Upstream("503 overloaded".into()));

        let agent = agent(gateway);
        let (session, report) = agent.open("hello").await;

        assert!(matches!(report, Err(AgentError::Upstream(_))));
        assert_eq!(session.state, LoopState::SessionEnded);
        assert!(session.end_reason.unwrap().contains("503 overloaded"));
    }

    #[tokio::test]
    async fn test_unsupported_backend_fails_fast() {
        let agent = agent(Arc::new(ScriptedGateway::text_only()));
        let output = agent.ask("plan my week").await;

        assert_eq!(output.status, RunStatus::Failed);
        assert!(output.error.unwrap().contains("unsupported"));
    }

    #[tokio::test]
    async fn test_iteration_bound_ends_session() {
        let gateway = Arc::new(ScriptedGateway::new());
        for i in 0..5 {
            gateway.push_outcome(CompletionOutcome::tool_use(
                "",
                vec![call(&format!("t{i}"), "lookup", json!({"user_id": "x"}))],
            ));
        }

        let agent = agent(gateway.clone());
        let (session, report) = agent.open("loop forever").await;

        assert!(matches!(report, Err(AgentError::MaxIterations(4))));
        assert_eq!(gateway.request_count(), 4);
        assert!(!session.is_active());
        assert!(session.conversation.check_alternation().is_ok());
    }

    #[tokio::test]
    async fn test_ask_returns_final_reply() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_outcome(CompletionOutcome::tool_use(
            "",
            vec![call("t1", "lookup", json!({"user_id": "7"}))],
        ));
        gateway.push_text("Found user 7.");

        let output = agent(gateway).ask("who is 7?").await;
        assert_eq!(output.status, RunStatus::Success);
        assert_eq!(output.reply, "Found user 7.");
        assert_eq!(output.tools_used, vec!["lookup"]);
        assert!(output.error.is_none());
    }

    struct StalledGateway;

    #[async_trait]
    impl CompletionGateway for StalledGateway {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<crate::provider::ModelInfo>> {
            Ok(Vec::new())
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _options: &GenerationOptions,
        ) -> Result<crate::provider::Completion> {
            Err(AgentError::Upstream("plain completion not scripted".into()))
        }

        async fn complete_with_capabilities(
            &self,
            _messages: &[Message],
            _capabilities: &[crate::tool::CapabilityDescriptor],
            _options: &GenerationOptions,
        ) -> Result<CompletionOutcome> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CompletionOutcome::final_text("too late"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_call_times_out_and_ends_session() {
        let agent = AgentBuilder::new()
            .gateway(Arc::new(StalledGateway))
            .typed_tool(LookupTool)
            .call_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let (session, report) = agent.open("hello").await;

        assert!(matches!(report, Err(AgentError::Upstream(ref msg)) if msg.contains("exceeded")));
        assert_eq!(session.state, LoopState::SessionEnded);
        assert!(!session.is_active());
    }
}
