//! # gym-trainer
//!
//! Conversational personal trainer built on the agent-core tool loop.
//!
//! ```text
//!   driver ──▶ Agent (COACH_PROMPT) ──▶ user_profile       ──▶ ProfileStore
//!                                  ├──▶ workout_generator  ──▶ model
//!                                  ├──▶ progress_tracker   ──▶ ProfileStore + model
//!                                  └──▶ feedback_adapter   ──▶ ProfileStore + model
//! ```
//!
//! Profiles and workout history live behind [`ProfileStore`]; the default
//! [`JsonFileStore`] keeps them as JSON files under one data directory.

pub mod error;
pub mod model;
pub mod store;
pub mod svckit;

use std::sync::Arc;

use agent_core::{Agent, AgentBuilder, CompletionGateway, GenerationOptions};

pub use error::{Result, TrainerError};
pub use model::{FitnessLevel, UserProfile, WorkoutSession, streak_ending};
pub use store::{JsonFileStore, MemoryProfileStore, ProfileStore};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        FeedbackAdapterTool, ProgressTrackerTool, UserProfileTool, WorkoutGeneratorTool,
    };
}

/// First driver turn of every conversation
pub const GREETING: &str = "Hello, I'm ready to start.";

/// Shown when the driver ends the conversation
pub const FAREWELL: &str = "Great work today! Keep pushing. Every session counts. See you next time!";

/// Sampling temperature for coaching conversations
pub const COACH_TEMPERATURE: f32 = 0.7;

/// System prompt for the trainer agent
pub const COACH_PROMPT: &str = r#"You are Coach AI, a friendly, motivating, and knowledgeable personal gym trainer.
You help users achieve their fitness goals through personalised coaching.

## Tools Available

- `user_profile` - save or load a user's fitness profile (always do this first)
- `workout_generator` - create a tailored workout plan
- `progress_tracker` - log a completed workout and track progress
- `feedback_adapter` - adapt the training plan based on user feedback

## Guidelines

1. Always ask for the user's name/user_id before calling any tool.
2. Before generating a workout, load the user's profile (action="load").
   If no profile exists, collect: name, age, fitness level, goals, equipment,
   injuries, and sessions per week, then save it (action="save").
3. When logging a session, ask for: exercises done (name, sets, reps, weight),
   energy level (1-5), difficulty rating (1-5), and optional notes.
4. Be encouraging, specific, and concise. Use the user's name when you know it.
5. After tool calls, explain results in plain, motivating language. Don't just
   dump raw JSON at the user."#;

/// Build the trainer agent: coach prompt, the four trainer tools and the
/// session end words `exit`, `quit`, `bye`.
///
/// `generation` is used for the conversation and for every model call the
/// tools make.
pub fn assemble_trainer_agent(
    gateway: Arc<dyn CompletionGateway>,
    store: Arc<dyn ProfileStore>,
    generation: GenerationOptions,
) -> agent_core::Result<Agent> {
    AgentBuilder::new()
        .gateway(Arc::clone(&gateway))
        .system_prompt(COACH_PROMPT)
        .generation(generation.clone())
        .end_words(&["exit", "quit", "bye"])
        .typed_tool(tools::UserProfileTool::new(Arc::clone(&store)))
        .typed_tool(tools::WorkoutGeneratorTool::new(
            Arc::clone(&gateway),
            generation.clone(),
        ))
        .typed_tool(tools::ProgressTrackerTool::new(
            Arc::clone(&gateway),
            generation.clone(),
            Arc::clone(&store),
        ))
        .typed_tool(tools::FeedbackAdapterTool::new(gateway, generation, store))
        .build()
}
