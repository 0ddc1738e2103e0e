use thiserror::Error;

/// Core error types for Wardlink domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid staff role: {0}")]
    InvalidRole(String),

    #[error("Invalid presence status: {0}")]
    InvalidStatus(String),

    #[error("Invalid priority tier: {0}")]
    InvalidPriority(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new InvalidRole error
    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    /// Create a new InvalidStatus error
    pub fn invalid_status(status: impl Into<String>) -> Self {
        Self::InvalidStatus(status.into())
    }

    /// Create a new InvalidPriority error
    pub fn invalid_priority(priority: impl Into<String>) -> Self {
        Self::InvalidPriority(priority.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
