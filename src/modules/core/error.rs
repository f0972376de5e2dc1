//! Error types for Querybridge

use querybridge_types::ExecutionState;
use thiserror::Error;

use crate::domain::ExecutionEvent;

/// Main error type for Querybridge operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Unknown query identifier
    #[error("Query not found: {0}")]
    NotFound(String),

    /// No registered variant for the endpoint's declared source type
    #[error("Unsupported source type: {0}")]
    UnsupportedSourceType(String),

    /// Local/standard conversion failed on a malformed payload
    #[error("Translation error: {0}")]
    Translation(String),

    /// Blob store read/write/delete failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Blob key absent from the blob store
    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    /// Document store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The connector's call to the external source failed
    #[error("Remote execution failed: {0}")]
    RemoteExecution(String),

    /// The execution state machine refused an event
    #[error("Cannot apply '{event}' to a query in state '{from}'")]
    InvalidTransition {
        from: ExecutionState,
        event: ExecutionEvent,
    },

    /// Configuration file parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    /// Returns true if this error should be logged at error level
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            QueryError::Storage(_)
                | QueryError::BlobNotFound(_)
                | QueryError::Persistence(_)
                | QueryError::Server(_)
                | QueryError::Io(_)
        )
    }

    /// Returns true if this error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            QueryError::NotFound(_)
                | QueryError::UnsupportedSourceType(_)
                | QueryError::Translation(_)
                | QueryError::Validation(_)
                | QueryError::InvalidTransition { .. }
        )
    }

    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::NotFound(_) => 404,
            QueryError::UnsupportedSourceType(_)
            | QueryError::Translation(_)
            | QueryError::Validation(_) => 400,
            QueryError::InvalidTransition { .. } => 409,
            _ => 500,
        }
    }

    /// Sanitize the error message to avoid leaking sensitive information
    pub fn sanitized_message(&self) -> String {
        match self {
            // Driver messages may carry connection strings
            QueryError::Persistence(_) => "Document store error".to_string(),
            QueryError::Storage(_) | QueryError::BlobNotFound(_) => {
                "Object storage error".to_string()
            }
            QueryError::RemoteExecution(_) => "Remote source error".to_string(),
            QueryError::Io(_) | QueryError::Server(_) => "Internal server error".to_string(),

            _ => self.to_string(),
        }
    }
}

/// Result type alias using QueryError
pub type Result<T> = std::result::Result<T, QueryError>;
