//! JSON file store
//!
//! ```text
//!   <root>/profiles/<user_id>.json            one profile object
//!   <root>/progress/<user_id>_progress.json   array of sessions
//! ```
//!
//! Files are written as pretty-printed JSON. Directories are created on
//! first write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::{ProfileStore, check_user_id};
use crate::error::{Result, TrainerError};
use crate::model::{UserProfile, WorkoutSession};

pub struct JsonFileStore {
    root: PathBuf,
    /// Serializes read-modify-write of progress files
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_path(&self, user_id: &str) -> PathBuf {
        self.root.join("profiles").join(format!("{user_id}.json"))
    }

    fn progress_path(&self, user_id: &str) -> PathBuf {
        self.root
            .join("progress")
            .join(format!("{user_id}_progress.json"))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| TrainerError::Storage(format!("corrupt file {}: {e}", path.display())))
}

async fn write_json<T: Serialize + Sync>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn save_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        check_user_id(&profile.user_id)?;
        let mut stored = profile.clone();
        stored.updated_at = Utc::now();

        let path = self.profile_path(&stored.user_id);
        write_json(&path, &stored).await?;
        tracing::debug!(user = %stored.user_id, path = %path.display(), "Profile saved");
        Ok(stored)
    }

    async fn load_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        check_user_id(user_id)?;
        read_json(&self.profile_path(user_id)).await
    }

    async fn append_session(&self, user_id: &str, session: &WorkoutSession) -> Result<()> {
        check_user_id(user_id)?;
        session.validate()?;

        let _guard = self.write_lock.lock().await;
        let path = self.progress_path(user_id);
        let mut sessions: Vec<WorkoutSession> = read_json(&path).await?.unwrap_or_default();
        sessions.push(session.clone());
        write_json(&path, &sessions).await?;

        tracing::debug!(user = %user_id, total = sessions.len(), "Session logged");
        Ok(())
    }

    async fn load_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        check_user_id(user_id)?;
        Ok(read_json(&self.progress_path(user_id)).await?.unwrap_or_default())
    }
}
