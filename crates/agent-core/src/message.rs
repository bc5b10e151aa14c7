//! Conversation Messages
//!
//! Turn format shared by the loop and every gateway backend. A turn carries
//! either plain text or a list of content blocks (text, tool requests, tool
//! results), which is enough to re-insert a model turn verbatim.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Driver-originated turn (user text or tool results)
    User,
    /// Model-originated turn
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One segment of a multi-part turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl From<&ToolCall> for ContentBlock {
    fn from(call: &ToolCall) -> Self {
        Self::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.input.clone(),
        }
    }
}

impl From<&ToolResult> for ContentBlock {
    fn from(result: &ToolResult) -> Self {
        Self::ToolResult {
            tool_use_id: result.tool_use_id.clone(),
            content: result.content.clone(),
            is_error: result.is_error,
        }
    }
}

/// Turn payload: plain text or content blocks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single turn in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text or block content
    pub content: MessageContent,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a driver text message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(content.into()))
    }

    /// Create a model text message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(content.into()))
    }

    /// Create a model message from content blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self::new(Role::Assistant, MessageContent::Blocks(blocks))
    }

    /// Create the driver turn answering a batch of tool requests
    pub fn tool_results(results: &[ToolResult]) -> Self {
        Self::new(
            Role::User,
            MessageContent::Blocks(results.iter().map(ContentBlock::from).collect()),
        )
    }

    /// Concatenated text segments
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Tool requests carried by this turn
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Call identifiers answered by this turn
    pub fn answered_call_ids(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Whether this is a model turn requesting tools
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls().is_empty()
    }
}

/// Append-only conversation history
///
/// History is never pruned. Compaction is left to callers that need a
/// bounded window.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check that every tool-requesting model turn is immediately followed by
    /// a driver turn holding exactly one result per call identifier.
    pub fn check_alternation(&self) -> Result<()> {
        for (idx, message) in self.messages.iter().enumerate() {
            if !message.requests_tools() {
                continue;
            }

            let requested: Vec<String> = message.tool_calls().into_iter().map(|c| c.id).collect();
            let next = self.messages.get(idx + 1).ok_or_else(|| {
                AgentError::Session(format!("turn {idx} has unanswered tool requests"))
            })?;

            if next.role != Role::User {
                return Err(AgentError::Session(format!(
                    "turn {idx} requests tools but is followed by a {} turn",
                    next.role
                )));
            }

            let answered = next.answered_call_ids();
            let unique: HashSet<&str> = answered.iter().copied().collect();
            let expected: HashSet<&str> = requested.iter().map(String::as_str).collect();

            if answered.len() != requested.len() || unique != expected {
                return Err(AgentError::Session(format!(
                    "turn {} answers {:?} but turn {idx} requested {:?}",
                    idx + 1,
                    answered,
                    requested
                )));
            }
        }

        Ok(())
    }
}
