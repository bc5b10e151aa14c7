//! Progress Tracker Tool
//!
//! Logs a completed session, then asks the model to summarize progress
//! over the most recent history.

use std::sync::Arc;

use agent_core::{CompletionGateway, GenerationOptions, Message, Result, TypedTool, complete_as};
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::recent_history;
use crate::model::{WorkoutSession, streak_ending};
use crate::store::ProfileStore;

const PROGRESS_PROMPT: &str = "You are an encouraging personal trainer reviewing a client's \
workout history. Summarise their recent progress in 2-3 motivating sentences and identify any \
noteworthy achievements (e.g. consistency streak, improving difficulty tolerance, reaching \
session milestones). Be specific and positive.";

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProgressTrackerInput {
    /// The user's unique identifier.
    pub user_id: String,

    /// Muscle group or training style for this session.
    pub focus_area: String,

    /// How long the session lasted.
    pub duration_minutes: u32,

    /// Exercises done this session. Each entry should have: name, sets_done,
    /// reps_done and optionally weight_used.
    pub exercises_completed: Vec<Value>,

    /// Energy level 1 (exhausted) to 5 (great).
    #[schemars(range(min = 1, max = 5))]
    pub energy_level: u8,

    /// Difficulty 1 (too easy) to 5 (too hard).
    #[schemars(range(min = 1, max = 5))]
    pub difficulty_rating: u8,

    /// Any extra notes about the session.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Model-written part of the report
#[derive(Debug, Deserialize, JsonSchema)]
struct ProgressReview {
    progress_summary: String,
    achievements: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ProgressReport {
    pub total_sessions: usize,
    pub streak_days: u32,
    pub progress_summary: String,
    pub achievements: Vec<String>,
}

/// Tool for logging sessions and reporting progress
pub struct ProgressTrackerTool {
    gateway: Arc<dyn CompletionGateway>,
    options: GenerationOptions,
    store: Arc<dyn ProfileStore>,
}

impl ProgressTrackerTool {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        options: GenerationOptions,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            gateway,
            options,
            store,
        }
    }
}

#[async_trait]
impl TypedTool for ProgressTrackerTool {
    type Input = ProgressTrackerInput;
    type Output = ProgressReport;

    const NAME: &'static str = "progress_tracker";
    const DESCRIPTION: &'static str = "Log a completed workout session and summarise the \
        user's overall progress. Requires: user_id, focus_area, duration_minutes, \
        exercises_completed, energy_level (1-5), difficulty_rating (1-5), and optional notes. \
        Returns total sessions, current streak, a progress summary, and achievements.";

    async fn run(&self, input: ProgressTrackerInput) -> Result<ProgressReport> {
        let today = Utc::now().date_naive();
        let session = WorkoutSession {
            date: today,
            focus_area: input.focus_area,
            duration_minutes: input.duration_minutes,
            exercises_completed: input.exercises_completed,
            energy_level: input.energy_level,
            difficulty_rating: input.difficulty_rating,
            notes: input.notes,
        };
        self.store.append_session(&input.user_id, &session).await?;

        let sessions = self.store.load_sessions(&input.user_id).await?;
        let total = sessions.len();
        let streak = streak_ending(&sessions, today);
        tracing::info!(user = %input.user_id, total, streak, "Workout logged");

        let (history, shown) = recent_history(&sessions)?;
        let prompt = format!(
            "The user just completed session #{total}.\n\
             Streak: {streak} consecutive day(s).\n\n\
             Recent sessions (last {shown}):\n{history}\n\n\
             Write a short motivating progress summary and list specific achievements."
        );

        let options = self.options.with_system_prompt(PROGRESS_PROMPT);
        let review: ProgressReview =
            complete_as(self.gateway.as_ref(), &[Message::user(prompt)], &options).await?;

        Ok(ProgressReport {
            total_sessions: total,
            streak_days: streak,
            progress_summary: review.progress_summary,
            achievements: review.achievements,
        })
    }
}
