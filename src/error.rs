use crate::client::DatastoreError;

/// Application error type returned by every repository operation
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Resource errors
    #[error("{0} not found")]
    NotFound(String),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Datastore errors (transport, API, single-row violations)
    #[error("Datastore error: {0}")]
    Datastore(#[from] DatastoreError),

    // Row could not be mapped to or from an entity
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AppError {
    /// True for the distinct not-found outcome of single-row operations
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

/// Result type alias for repository operations
pub type AppResult<T> = Result<T, AppError>;
