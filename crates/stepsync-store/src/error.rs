use stepsync_core::StepsyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("account not found: {id}")]
    NotFound { id: i64 },

    #[error("account already exists: {login}")]
    Duplicate { login: String },

    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(String),
}

impl From<StoreError> for StepsyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => StepsyncError::AccountNotFound { id },
            StoreError::Duplicate { login } => StepsyncError::Duplicate(login),
            other => StepsyncError::Database(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
