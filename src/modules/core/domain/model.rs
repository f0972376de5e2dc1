//! Persisted query record

use serde::{Deserialize, Serialize};
use std::fmt;

use super::QueryStatus;

/// One registered query, as stored in the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    /// Store-assigned identifier, empty until inserted
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Which connector to use and where the source lives
    pub endpoint: Endpoint,

    /// Opaque to everything but the connector
    #[serde(default)]
    pub credentials: Credentials,

    #[serde(default)]
    pub input: QueryInput,

    #[serde(default)]
    pub output: QueryOutput,

    #[serde(default)]
    pub status: QueryStatus,
}

/// Source descriptor; `source_type` selects the connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub source_type: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub source_host: String,
    #[serde(default)]
    pub source_port: u16,
    #[serde(default)]
    pub public: bool,
}

impl Endpoint {
    /// Base URL of the source, e.g. `http://transmart.example.org:80`
    pub fn base_url(&self) -> String {
        let host = self.source_host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        if self.source_port == 0 {
            host
        } else {
            format!("{}:{}", host, self.source_port)
        }
    }
}

/// Username/password pair handed to the connector
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Query input: connector-native payload plus a cache of its standard form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub local: serde_json::Value,
    #[serde(default)]
    pub std: serde_json::Value,
}

/// Query output: either the local-format payload inline, or a blob key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    /// Byte length of the local-format output when it was last set
    #[serde(default)]
    pub data_size: u64,
    #[serde(default)]
    pub is_blob_stored: bool,
    #[serde(default)]
    pub data: Option<String>,
}

/// Borrowed view of where an output payload lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPayload<'a> {
    Empty,
    Inline(&'a str),
    Blob(&'a str),
}

impl QueryOutput {
    /// Output kept inside the record
    pub fn inline(local: String) -> Self {
        Self {
            data_size: local.len() as u64,
            is_blob_stored: false,
            data: Some(local),
        }
    }

    /// Output kept in the object store under `key`
    pub fn blob(key: String, data_size: u64) -> Self {
        Self {
            data_size,
            is_blob_stored: true,
            data: Some(key),
        }
    }

    pub fn payload(&self) -> OutputPayload<'_> {
        match (self.is_blob_stored, self.data.as_deref()) {
            (_, None) => OutputPayload::Empty,
            (true, Some(key)) => OutputPayload::Blob(key),
            (false, Some(local)) => OutputPayload::Inline(local),
        }
    }

    /// Key of the blob holding this output, if any
    pub fn blob_key(&self) -> Option<&str> {
        match self.payload() {
            OutputPayload::Blob(key) => Some(key),
            _ => None,
        }
    }
}

/// Caller-supplied fields of a query about to be registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuery {
    pub endpoint: Endpoint,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub input: QueryInput,
}

impl QueryModel {
    /// Build an unsaved record: no id, `unknown` status, empty output
    pub fn new(query: NewQuery) -> Self {
        Self {
            id: String::new(),
            endpoint: query.endpoint,
            credentials: query.credentials,
            input: query.input,
            output: QueryOutput::default(),
            status: QueryStatus::default(),
        }
    }

    /// Source type declared by the endpoint
    pub fn source_type(&self) -> &str {
        &self.endpoint.source_type
    }
}
