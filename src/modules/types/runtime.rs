//! Runtime type definitions for request/response handling

use serde::{Deserialize, Serialize};

/// Body of `POST /execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Identifier of the query to execute
    pub query: String,
    /// Caller-supplied execution parameters, passed through to the connector
    #[serde(default)]
    pub input: serde_json::Value,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Create an error response
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Body returned after a successful deletion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// Identifier of the removed query
    pub id: String,
    /// Whether a blob-stored output was removed together with the record
    pub blob_removed: bool,
}
