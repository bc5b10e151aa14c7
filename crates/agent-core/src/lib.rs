//! # agent-core
//!
//! Backend-agnostic completion gateway, schema-described capabilities and
//! the conversational tool-calling loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Agent                               │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────────┐  │
//! │  │  Tool-call  │  │    Tool      │  │  CompletionGateway  │  │
//! │  │    Loop     │──│  Dispatcher  │──│     (Strategy)      │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `CompletionGateway` trait enables swapping between Anthropic, Ollama,
//! or any other backend without changing agent logic.

pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod reasoning;
pub mod schema;
pub mod session;
pub mod structured;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{ContentBlock, Conversation, Message, MessageContent, Role};
pub use provider::{CompletionGateway, CompletionOutcome, FailoverGateway, GenerationOptions};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, DriverInput, RunOutput, RunStatus, TurnReport};
pub use session::{ChatSession, LoopState, MemorySessionStore, SessionId, SessionStore};
pub use structured::complete_as;
pub use tool::{
    CapabilityDescriptor, DispatchMode, Tool, ToolCall, ToolRegistry, ToolResult, Typed, TypedTool,
};
