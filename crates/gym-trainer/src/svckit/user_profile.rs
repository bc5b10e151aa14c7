//! User Profile Tool
//!
//! Saves or loads a trainee's profile. Pure storage, no model call.

use std::sync::Arc;

use agent_core::{Result, TypedTool};
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{FitnessLevel, UserProfile};
use crate::store::ProfileStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileAction {
    /// Create or update the profile
    Save,
    /// Retrieve an existing profile
    Load,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct UserProfileInput {
    /// 'save' to create/update the profile, 'load' to retrieve it.
    pub action: ProfileAction,

    /// Unique identifier for the user (e.g. username).
    pub user_id: String,

    /// User's full name.
    #[serde(default)]
    pub name: Option<String>,

    /// User's age in years.
    #[serde(default)]
    pub age: Option<u32>,

    /// Current fitness level.
    #[serde(default)]
    pub fitness_level: Option<FitnessLevel>,

    /// Fitness goals, e.g. ["lose weight", "build muscle"].
    #[serde(default)]
    pub goals: Option<Vec<String>>,

    /// Available equipment, e.g. ["dumbbells", "bodyweight only"].
    #[serde(default)]
    pub equipment: Option<Vec<String>>,

    /// Injuries or physical limitations, e.g. ["lower back"]. Use [] if none.
    #[serde(default)]
    pub injuries: Option<Vec<String>>,

    /// How many workout sessions per week the user plans.
    #[serde(default)]
    pub sessions_per_week: Option<u32>,
}

impl UserProfileInput {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_none()),
            ("age", self.age.is_none()),
            ("fitness_level", self.fitness_level.is_none()),
            ("goals", self.goals.is_none()),
            ("equipment", self.equipment.is_none()),
            ("sessions_per_week", self.sessions_per_week.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct UserProfileOutput {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl UserProfileOutput {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            profile: None,
        }
    }
}

/// Tool for saving and loading profiles
pub struct UserProfileTool {
    store: Arc<dyn ProfileStore>,
}

impl UserProfileTool {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    async fn load(&self, user_id: &str) -> Result<UserProfileOutput> {
        Ok(match self.store.load_profile(user_id).await? {
            Some(profile) => UserProfileOutput {
                success: true,
                message: format!("Profile loaded for user '{user_id}'."),
                profile: Some(profile),
            },
            None => UserProfileOutput::failure(format!(
                "No profile found for user '{user_id}'. Please save one first."
            )),
        })
    }

    async fn save(&self, input: UserProfileInput) -> Result<UserProfileOutput> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Ok(UserProfileOutput::failure(format!(
                "Cannot save profile: missing required fields: {}.",
                missing.join(", ")
            )));
        }

        // Updates keep the original creation time
        let created_at = self
            .store
            .load_profile(&input.user_id)
            .await?
            .map_or_else(Utc::now, |existing| existing.created_at);

        let profile = UserProfile {
            name: input.name.unwrap_or_default(),
            age: input.age.unwrap_or_default(),
            fitness_level: input.fitness_level.unwrap_or(FitnessLevel::Beginner),
            goals: input.goals.unwrap_or_default(),
            equipment: input.equipment.unwrap_or_default(),
            injuries: input.injuries.unwrap_or_default(),
            sessions_per_week: input.sessions_per_week.unwrap_or_default(),
            created_at,
            updated_at: created_at,
            user_id: input.user_id,
        };

        let saved = self.store.save_profile(&profile).await?;
        tracing::info!(user = %saved.user_id, "Profile saved");

        Ok(UserProfileOutput {
            success: true,
            message: format!("Profile saved for user '{}'.", saved.user_id),
            profile: Some(saved),
        })
    }
}

#[async_trait]
impl TypedTool for UserProfileTool {
    type Input = UserProfileInput;
    type Output = UserProfileOutput;

    const NAME: &'static str = "user_profile";
    const DESCRIPTION: &'static str = "Save or retrieve a user's fitness profile. \
        Use action='save' with all profile fields to create or update a profile. \
        Use action='load' with just the user_id to retrieve an existing profile.";

    async fn run(&self, input: UserProfileInput) -> Result<UserProfileOutput> {
        match input.action {
            ProfileAction::Load => self.load(&input.user_id).await,
            ProfileAction::Save => self.save(input).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProfileStore;
    use agent_core::ToolRegistry;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register_typed(UserProfileTool::new(Arc::new(MemoryProfileStore::new())))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_load_missing_profile_is_not_an_error() {
        let output = registry()
            .invoke("user_profile", json!({"action": "load", "user_id": "sam"}))
            .await
            .unwrap();

        assert_eq!(output["success"], false);
        assert_eq!(
            output["message"],
            "No profile found for user 'sam'. Please save one first."
        );
        assert!(output.get("profile").is_none());
    }

    #[tokio::test]
    async fn test_save_reports_missing_fields() {
        let output = registry()
            .invoke(
                "user_profile",
                json!({"action": "save", "user_id": "sam", "name": "Sam", "age": 29}),
            )
            .await
            .unwrap();

        assert_eq!(output["success"], false);
        assert_eq!(
            output["message"],
            "Cannot save profile: missing required fields: fitness_level, goals, equipment, sessions_per_week."
        );
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let registry = registry();
        let saved = registry
            .invoke(
                "user_profile",
                json!({
                    "action": "save",
                    "user_id": "sam",
                    "name": "Sam",
                    "age": 29,
                    "fitness_level": "intermediate",
                    "goals": ["build muscle"],
                    "equipment": ["barbell"],
                    "sessions_per_week": 4
                }),
            )
            .await
            .unwrap();
        assert_eq!(saved["success"], true);
        assert_eq!(saved["profile"]["injuries"], json!([]));

        let loaded = registry
            .invoke("user_profile", json!({"action": "load", "user_id": "sam"}))
            .await
            .unwrap();
        assert_eq!(loaded["success"], true);
        assert_eq!(loaded["profile"]["fitness_level"], "intermediate");
        assert_eq!(loaded["profile"]["sessions_per_week"], 4);
    }

    #[tokio::test]
    async fn test_unknown_action_fails_validation() {
        let err = registry()
            .invoke("user_profile", json!({"action": "delete", "user_id": "sam"}))
            .await
            .unwrap_err();
        assert!(matches!(err, agent_core::AgentError::Validation(_)));
    }
}
