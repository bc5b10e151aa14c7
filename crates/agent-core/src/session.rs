//! Session Management
//!
//! A chat session owns one conversation and the loop state that drives it.
//! Sessions are exclusively owned while a turn runs; stores hand out clones.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, Role};
use crate::tool::ToolCall;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the tool-calling loop stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Next step is a model call
    AwaitingModel,
    /// The last model turn requested tools that are not yet answered
    DispatchingTools,
    /// Waiting for the next driver turn
    AwaitingInput,
    /// Terminal
    SessionEnded,
}

/// Session metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Explicit title; otherwise derived from the first driver turn
    pub title: Option<String>,

    /// Owner, when the driver identified one
    pub user_id: Option<String>,
}

/// A conversational session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Loop state
    pub state: LoopState,

    /// Requests of the last model turn awaiting dispatch
    #[serde(default)]
    pub pending_calls: Vec<ToolCall>,

    /// Session metadata
    pub metadata: SessionMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Why the session ended, once it has
    pub end_reason: Option<String>,
}

impl ChatSession {
    /// Empty session waiting for its first driver turn
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: Conversation::new(),
            state: LoopState::AwaitingInput,
            pending_calls: Vec::new(),
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
            end_reason: None,
        }
    }

    /// Session seeded with an initial driver turn, ready for a model call
    pub fn seeded(first_turn: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.conversation.push(Message::user(first_turn));
        session.state = LoopState::AwaitingModel;
        session
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Explicit title, else a preview of the first driver text turn
    pub fn title(&self) -> String {
        if let Some(title) = &self.metadata.title {
            return title.clone();
        }

        let first_text = self
            .conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::User && m.answered_call_ids().is_empty());

        first_text.map_or_else(
            || format!("Session {}", self.id.0.chars().take(8).collect::<String>()),
            |m| {
                let text = m.text();
                let preview: String = text.chars().take(50).collect();
                if text.chars().count() > 50 {
                    format!("{preview}...")
                } else {
                    preview
                }
            },
        )
    }

    /// End the session; later driver turns are rejected
    pub fn end(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(session = %self.id, %reason, "Session ended");
        self.state = LoopState::SessionEnded;
        self.pending_calls.clear();
        self.end_reason = Some(reason);
        self.touch();
    }

    pub fn is_active(&self) -> bool {
        self.state != LoopState::SessionEnded
    }

    /// Fail with [`AgentError::SessionEnded`] once ended
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(AgentError::SessionEnded(
                self.end_reason.clone().unwrap_or_else(|| self.id.to_string()),
            ))
        }
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
pub trait SessionStore: Send + Sync {
    /// Save a session
    fn save(&self, session: &ChatSession) -> Result<()>;

    /// Load a session by ID
    fn load(&self, id: &SessionId) -> Result<Option<ChatSession>>;

    /// Delete a session
    fn delete(&self, id: &SessionId) -> Result<()>;

    /// List sessions for a user
    fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<ChatSession>>;
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, ChatSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AgentError {
    AgentError::Session("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &ChatSession) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<ChatSession>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(id);
        Ok(())
    }

    fn list(&self, user_id: Option<&str>, limit: usize) -> Result<Vec<ChatSession>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        let mut result: Vec<_> = sessions
            .values()
            .filter(|s| user_id.is_none_or(|uid| s.metadata.user_id.as_deref() == Some(uid)))
            .cloned()
            .collect();

        // Sort by updated_at descending
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = ChatSession::new();
        assert!(session.is_active());
        assert_eq!(session.state, LoopState::AwaitingInput);
        assert_eq!(session.message_count(), 0);

        let seeded = ChatSession::seeded("Hello, I'm ready to start.");
        assert_eq!(seeded.state, LoopState::AwaitingModel);
        assert_eq!(seeded.title(), "Hello, I'm ready to start.");
    }

    #[test]
    fn test_end_is_terminal() {
        let mut session = ChatSession::seeded("hi");
        session.end("driver said bye");
        assert!(!session.is_active());
        assert!(matches!(session.ensure_active(), Err(AgentError::SessionEnded(r)) if r == "driver said bye"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        let mut session = ChatSession::new();
        session.metadata.user_id = Some("ana".into());
        let id = session.id.clone();

        store.save(&session).unwrap();
        store.save(&ChatSession::new()).unwrap();

        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.unwrap().id, id);
        assert_eq!(store.list(Some("ana"), 10).unwrap().len(), 1);
        assert_eq!(store.list(None, 10).unwrap().len(), 2);

        store.delete(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
    }
}
