//! Scripted Completion Gateway
//!
//! For testing and demos. Replies are queued up front and handed out in
//! order; every call is recorded so tests can inspect what was sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{
    Completion, CompletionGateway, CompletionOutcome, FinishReason, GenerationOptions, ModelInfo,
};
use crate::tool::CapabilityDescriptor;

enum Scripted {
    Text(String),
    Outcome(CompletionOutcome),
    Error(AgentError),
}

/// Kind of gateway call that was made
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Text,
    Capabilities,
}

/// A recorded gateway call
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    pub messages: Vec<Message>,
    pub options: GenerationOptions,
    pub capabilities: Vec<CapabilityDescriptor>,
}

/// Gateway returning queued replies
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
    supports_tools: bool,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            supports_tools: true,
        }
    }

    /// Gateway that refuses capability-advertised completions
    pub fn text_only() -> Self {
        Self {
            supports_tools: false,
            ..Self::new()
        }
    }

    /// Queue a plain text reply
    pub fn push_text(&self, text: impl Into<String>) {
        self.enqueue(Scripted::Text(text.into()));
    }

    /// Queue a tool-augmented outcome
    pub fn push_outcome(&self, outcome: CompletionOutcome) {
        self.enqueue(Scripted::Outcome(outcome));
    }

    /// Queue a failure
    pub fn push_error(&self, error: AgentError) {
        self.enqueue(Scripted::Error(error));
    }

    /// Calls made so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    fn enqueue(&self, reply: Scripted) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    fn next(&self, request: RecordedRequest) -> Result<Scripted> {
        self.requests
            .lock()
            .map_err(|_| AgentError::Other("request log poisoned".into()))?
            .push(request);

        self.replies
            .lock()
            .map_err(|_| AgentError::Other("reply queue poisoned".into()))?
            .pop_front()
            .ok_or_else(|| AgentError::Upstream("scripted replies exhausted".into()))
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            name: "Scripted".into(),
            context_length: None,
        }])
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let reply = self.next(RecordedRequest {
            kind: RequestKind::Text,
            messages: messages.to_vec(),
            options: options.clone(),
            capabilities: Vec::new(),
        })?;

        let content = match reply {
            Scripted::Text(text) => text,
            Scripted::Outcome(outcome) => outcome.text,
            Scripted::Error(e) => return Err(e),
        };

        Ok(Completion {
            content,
            model: options.model.clone(),
            usage: None,
            truncated: false,
            finish_reason: Some(FinishReason::Stop),
        })
    }

    async fn complete_with_capabilities(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
        options: &GenerationOptions,
    ) -> Result<CompletionOutcome> {
        if !self.supports_tools {
            return Err(AgentError::CapabilityUnsupported(self.name().to_string()));
        }

        let reply = self.next(RecordedRequest {
            kind: RequestKind::Capabilities,
            messages: messages.to_vec(),
            options: options.clone(),
            capabilities: capabilities.to_vec(),
        })?;

        match reply {
            Scripted::Text(text) => Ok(CompletionOutcome::final_text(text)),
            Scripted::Outcome(outcome) => Ok(outcome),
            Scripted::Error(e) => Err(e),
        }
    }
}
