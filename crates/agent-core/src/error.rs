//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Input does not satisfy a capability's declared schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested capability is not registered
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    /// Structured completion reply could not be parsed as conforming data
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Transport or provider failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Backend cannot serve capability-advertised completions
    #[error("Capability calling unsupported by {0}")]
    CapabilityUnsupported(String),

    /// Rate limited by the provider
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Capability execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Maximum model calls reached within one driver turn
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Operation attempted on a session that already ended
    #[error("Session ended: {0}")]
    SessionEnded(String),

    /// Session bookkeeping error
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid construction-time configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::RateLimited(_) | Self::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Upstream(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::CapabilityUnsupported(backend) => {
                format!("The configured AI service ({backend}) cannot use tools.")
            }
            Self::UnknownCapability(name) => format!("The tool '{name}' is not available."),
            Self::Validation(msg) => format!("Invalid tool input: {msg}"),
            Self::SchemaViolation(_) => "The AI service returned malformed data.".into(),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::MaxIterations(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::SessionEnded(_) => "This session has ended. Please start a new one.".into(),
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
