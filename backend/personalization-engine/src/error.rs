use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Catalog item not found: {0}")]
    ItemNotFound(Uuid),

    /// Another writer updated the profile between our read and write
    #[error("Profile write conflict for user {user_id} (expected version {expected})")]
    Conflict { user_id: Uuid, expected: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::UserNotFound(_) | EngineError::ItemNotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict { .. })
    }
}
