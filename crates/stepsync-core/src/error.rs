use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Account not found: {id}")]
    AccountNotFound { id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate account: {0}")]
    Duplicate(String),
}

impl StepsyncError {
    /// Short error code string included in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StepsyncError::Config(_) => "CONFIG_ERROR",
            StepsyncError::Database(_) => "DATABASE_ERROR",
            StepsyncError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            StepsyncError::InvalidInput(_) => "INVALID_INPUT",
            StepsyncError::Duplicate(_) => "DUPLICATE",
        }
    }
}

pub type Result<T> = std::result::Result<T, StepsyncError>;
