//! Source-agnostic ("standard") formats exchanged with callers

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{QueryError, Result};

/// Canonical query input understood by every connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardInput {
    /// Resource path on the source (e.g. `/v2/observations`)
    pub resource: String,

    /// Connector-interpreted selection criteria
    #[serde(default)]
    pub filter: Value,

    /// Kind of data requested (e.g. `clinical`, `json`)
    #[serde(default)]
    pub data_type: String,
}

/// Canonical query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardOutput {
    /// Source type that produced the records
    pub source: String,

    pub records: Vec<Value>,

    /// Source-specific metadata describing the records
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub dimensions: Value,
}

impl StandardInput {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| QueryError::Translation(format!("Invalid standard input: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl StandardOutput {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| QueryError::Translation(format!("Invalid standard output: {}", e)))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
