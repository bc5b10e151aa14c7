//! # agent-runtime
//!
//! Completion gateway backends.
//!
//! ## Providers
//!
//! - **Anthropic**: Messages API with native tool calling
//! - **Ollama** (default feature): local inference; text and structured
//!   completions only
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::AnthropicProvider;
//!
//! let gateway = AnthropicProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .gateway(Arc::new(gateway))
//!     .typed_tool(MyTool)
//!     .build()?;
//! ```

pub mod anthropic;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use anthropic::{AnthropicConfig, AnthropicProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{AgentError, CompletionGateway, GenerationOptions, Message, Result};
