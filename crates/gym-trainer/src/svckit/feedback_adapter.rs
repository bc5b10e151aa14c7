//! Feedback Adapter Tool
//!
//! Reads recent history plus free-text feedback and decides how training
//! intensity should change.

use std::sync::Arc;

use agent_core::{CompletionGateway, GenerationOptions, Message, Result, TypedTool, complete_as};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::recent_history;
use crate::store::ProfileStore;

const FEEDBACK_PROMPT: &str = "You are an expert personal trainer analysing a client's recent \
workout history and feedback. Determine whether the training intensity should increase, \
decrease, or stay the same. Provide specific, actionable recommendations for the next sessions \
and an encouraging message to keep the client motivated.";

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackAdapterInput {
    /// The user's unique identifier.
    pub user_id: String,

    /// The user's free-text feedback about their recent workouts, e.g.
    /// 'workouts feel too easy' or 'I'm always sore for days'.
    pub user_feedback: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntensityAdjustment {
    Increase,
    Decrease,
    Maintain,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackPlan {
    /// Whether to increase, decrease, or maintain current training intensity.
    pub intensity_adjustment: IntensityAdjustment,

    /// Specific changes to make to future workouts.
    pub adjusted_recommendations: Vec<String>,

    /// An encouraging personalised message.
    pub motivation_message: String,

    /// Concrete suggestions for the next 1-2 workout sessions.
    pub next_workout_suggestions: Vec<String>,
}

pub struct FeedbackAdapterTool {
    gateway: Arc<dyn CompletionGateway>,
    options: GenerationOptions,
    store: Arc<dyn ProfileStore>,
}

impl FeedbackAdapterTool {
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
impl TypedTool for FeedbackAdapterTool {
    type Input = FeedbackAdapterInput;
    type Output = FeedbackPlan;

    const NAME: &'static str = "feedback_adapter";
    const DESCRIPTION: &'static str = "Analyse the user's recent workout history and feedback \
        to adapt their training plan. Requires: user_id and user_feedback (free text describing \
        how recent workouts felt). Returns an intensity adjustment direction, specific \
        recommendations, a motivational message, and suggestions for the next sessions.";

    async fn run(&self, input: FeedbackAdapterInput) -> Result<FeedbackPlan> {
        let sessions = self.store.load_sessions(&input.user_id).await?;

        let history = if sessions.is_empty() {
            "No sessions logged yet.".to_string()
        } else {
            recent_history(&sessions)?.0
        };
        let shown = sessions.len().min(super::RECENT_WINDOW);

        let prompt = format!(
            "User feedback: {}\n\nRecent workout history (last {shown} sessions):\n{history}",
            input.user_feedback
        );

        let options = self.options.with_system_prompt(FEEDBACK_PROMPT);
        let plan: FeedbackPlan =
            complete_as(self.gateway.as_ref(), &[Message::user(prompt)], &options).await?;

        tracing::info!(
            user = %input.user_id,
            adjustment = ?plan.intensity_adjustment,
            "Training plan adapted"
        );
        Ok(plan)
    }
}
