//! Profile & Progress Persistence
//!
//! Storage boundary for trainee profiles and their workout history.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryProfileStore;

use async_trait::async_trait;

use crate::error::{Result, TrainerError};
use crate::model::{UserProfile, WorkoutSession};

/// Profile and progress storage (Strategy pattern)
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Create or replace a profile; `updated_at` is refreshed on write
    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile>;

    /// Load a profile, `None` when the user has none
    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Append one session to the user's history
    async fn append_session(&self, user_id: &str, session: &WorkoutSession) -> Result<()>;

    /// Full history in logging order, empty when nothing was logged
    async fn load_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>>;
}

/// User ids become file names, so keep them to one plain path segment
pub(crate) fn check_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.trim().is_empty()
        && user_id != "."
        && user_id != ".."
        && !user_id.contains(['/', '\\', '\0']);

    if valid {
        Ok(())
    } else {
        Err(TrainerError::InvalidRecord(format!("invalid user id: {user_id:?}")))
    }
}
