use thiserror::Error;

/// Errors surfaced by the domain services. Business-rule messages are shown
/// to the admin console as-is, so they stay in Vietnamese.
#[derive(Debug, Error)]
pub enum MotelError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type MotelResult<T> = Result<T, MotelError>;

impl MotelError {
    pub fn validation(message: impl Into<String>) -> Self {
        MotelError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        MotelError::NotFound(message.into())
    }
}
