//! Workout Generator Tool
//!
//! Builds a structured workout plan (warmup, main block, cooldown) from the
//! trainee's level, goals, equipment and limitations.

use std::sync::Arc;

use agent_core::{CompletionGateway, GenerationOptions, Message, Result, TypedTool, complete_as};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::FitnessLevel;

const WORKOUT_PROMPT: &str = "You are an expert personal trainer. Generate a safe, effective, \
and well-structured workout plan tailored to the user's fitness level, goals, available \
equipment, and any injuries or physical limitations. Always include a warmup, main exercises, \
and cooldown. Be specific with sets, reps, and rest periods. Provide clear instructions.";

/// Primary muscle group or training style of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    FullBody,
    UpperBody,
    LowerBody,
    Cardio,
    Core,
}

impl FocusArea {
    /// Human-readable form, e.g. "upper body"
    pub const fn label(self) -> &'static str {
        match self {
            Self::FullBody => "full body",
            Self::UpperBody => "upper body",
            Self::LowerBody => "lower body",
            Self::Cardio => "cardio",
            Self::Core => "core",
        }
    }
}

const fn default_duration() -> u32 {
    45
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutRequest {
    /// User's current fitness level.
    pub fitness_level: FitnessLevel,

    /// Fitness goals, e.g. ["build muscle", "lose weight"].
    pub goals: Vec<String>,

    /// Available equipment, e.g. ["dumbbells", "bodyweight only"].
    pub equipment: Vec<String>,

    /// Injuries or limitations to work around. Empty list if none.
    #[serde(default)]
    pub injuries: Vec<String>,

    /// Primary muscle group or training style for this session.
    pub focus_area: FocusArea,

    /// Target total workout duration in minutes.
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
}

impl WorkoutRequest {
    fn to_prompt(&self) -> String {
        let injuries = if self.injuries.is_empty() {
            "none".to_string()
        } else {
            self.injuries.join(", ")
        };

        format!(
            "Create a {}-minute {} workout.\n\
             Fitness level: {}\n\
             Goals: {}\n\
             Equipment: {}\n\
             Injuries/limitations: {}",
            self.duration_minutes,
            self.focus_area.label(),
            self.fitness_level,
            self.goals.join(", "),
            self.equipment.join(", "),
            injuries,
        )
    }
}

/// Warmup or cooldown movement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimedExercise {
    pub exercise: String,
    pub duration_seconds: u32,
    pub instructions: String,
}

/// Main-block exercise
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MainExercise {
    pub exercise: String,
    pub sets: u32,
    /// e.g. "10", "8-12", or "30 seconds"
    pub reps: String,
    pub rest_seconds: u32,
    pub instructions: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutPlan {
    pub workout_name: String,
    pub warmup: Vec<TimedExercise>,
    pub exercises: Vec<MainExercise>,
    pub cooldown: Vec<TimedExercise>,
    pub coach_notes: String,
}

/// Tool for generating workout plans
pub struct WorkoutGeneratorTool {
    gateway: Arc<dyn CompletionGateway>,
    options: GenerationOptions,
}

impl WorkoutGeneratorTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, options: GenerationOptions) -> Self {
        Self { gateway, options }
    }
}

#[async_trait]
impl TypedTool for WorkoutGeneratorTool {
    type Input = WorkoutRequest;
    type Output = WorkoutPlan;

    const NAME: &'static str = "workout_generator";
    const DESCRIPTION: &'static str = "Generate a complete, personalised workout plan. \
        Requires: fitness_level, goals, equipment, injuries, focus_area, and duration_minutes. \
        Returns a structured plan with warmup, main exercises (sets/reps/rest), cooldown, \
        and coaching notes.";

    async fn run(&self, input: WorkoutRequest) -> Result<WorkoutPlan> {
        tracing::debug!(
            focus = input.focus_area.label(),
            minutes = input.duration_minutes,
            "Generating workout"
        );

        let options = self.options.with_system_prompt(WORKOUT_PROMPT);
        complete_as(self.gateway.as_ref(), &[Message::user(input.to_prompt())], &options).await
    }
}
