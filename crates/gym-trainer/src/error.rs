//! Error Types for the Gym Trainer

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainerError>;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<TrainerError> for AgentError {
    fn from(err: TrainerError) -> Self {
        match err {
            TrainerError::InvalidRecord(msg) => Self::Validation(msg),
            TrainerError::Io(e) => Self::Io(e),
            other => Self::ToolExecution(other.to_string()),
        }
    }
}
