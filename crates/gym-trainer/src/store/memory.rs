//! In-memory profile store (for development/testing)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{ProfileStore, check_user_id};
use crate::error::Result;
use crate::model::{UserProfile, WorkoutSession};

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    progress: RwLock<HashMap<String, Vec<WorkoutSession>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        check_user_id(&profile.user_id)?;
        let mut stored = profile.clone();
        stored.updated_at = Utc::now();

        self.profiles
            .write()
            .await
            .insert(stored.user_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn append_session(&self, user_id: &str, session: &WorkoutSession) -> Result<()> {
        check_user_id(user_id)?;
        session.validate()?;

        self.progress
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(session.clone());
        Ok(())
    }

    async fn load_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        Ok(self
            .progress
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
