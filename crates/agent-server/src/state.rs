//! Application State

use std::sync::Arc;

use agent_core::{Agent, CompletionGateway, GenerationOptions, MemorySessionStore};
use gym_trainer::{COACH_TEMPERATURE, ProfileStore, assemble_trainer_agent};
use summarizer::{ChunkingConfig, SummarizePipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Completion backend (Anthropic, Ollama, ...)
    pub gateway: Arc<dyn CompletionGateway>,

    /// Conversational trainer agent
    pub trainer: Arc<Agent>,

    /// Document summarizer
    pub summarizer: Arc<SummarizePipeline>,

    /// Open trainer conversations
    pub sessions: Arc<MemorySessionStore>,
}

impl AppState {
    /// Wire the trainer and summarizer to one backend
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        model: &str,
        profiles: Arc<dyn ProfileStore>,
        chunking: ChunkingConfig,
    ) -> agent_core::Result<Self> {
        let options = GenerationOptions::for_model(model);

        let coach_options = GenerationOptions {
            temperature: COACH_TEMPERATURE,
            ..options.clone()
        };
        let trainer = assemble_trainer_agent(Arc::clone(&gateway), profiles, coach_options)?;
        let summarizer = SummarizePipeline::new(Arc::clone(&gateway), options, chunking);

        Ok(Self {
            gateway,
            trainer: Arc::new(trainer),
            summarizer: Arc::new(summarizer),
            sessions: Arc::new(MemorySessionStore::new()),
        })
    }
}
