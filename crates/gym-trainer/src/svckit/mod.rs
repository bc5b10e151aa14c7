//! Service Kit - Agent Tools
//!
//! Trainer capabilities exposed to the model through `agent_core::TypedTool`.

mod feedback_adapter;
mod progress_tracker;
mod user_profile;
mod workout_generator;

pub use feedback_adapter::{FeedbackAdapterInput, FeedbackAdapterTool, FeedbackPlan, IntensityAdjustment};
pub use progress_tracker::{ProgressReport, ProgressTrackerInput, ProgressTrackerTool};
pub use user_profile::{ProfileAction, UserProfileInput, UserProfileOutput, UserProfileTool};
pub use workout_generator::{
    FocusArea, MainExercise, TimedExercise, WorkoutGeneratorTool, WorkoutPlan, WorkoutRequest,
};

use agent_core::AgentError;

use crate::model::WorkoutSession;

/// Sessions shown to the model when reviewing history
pub const RECENT_WINDOW: usize = 5;

/// Pretty JSON of the last [`RECENT_WINDOW`] sessions and how many there are
pub(crate) fn recent_history(sessions: &[WorkoutSession]) -> Result<(String, usize), AgentError> {
    let recent = &sessions[sessions.len().saturating_sub(RECENT_WINDOW)..];
    Ok((serde_json::to_string_pretty(recent)?, recent.len()))
}
