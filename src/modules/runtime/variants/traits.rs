//! Query variant trait definition

use async_trait::async_trait;
use querybridge_core::{Credentials, Endpoint, Result};
use serde_json::Value;

/// Everything a variant needs to run one remote call
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub query_id: String,
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    /// Connector-native input stored on the query
    pub local_input: Value,
    /// Caller-supplied parameters of this execution (may be `null`)
    pub parameters: Value,
}

/// Capability set of a connector
///
/// Translations are pure and deterministic; they fail with
/// `QueryError::Translation` on structurally invalid payloads. `execute` is the
/// only operation that may suspend for an unbounded time; any timeout is the
/// variant's own business.
#[async_trait]
pub trait QueryVariant: Send + Sync {
    /// Source type this variant is registered under
    fn source_type(&self) -> &str;

    fn input_local_to_standard(&self, local: &Value) -> Result<Value>;

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value>;

    /// Local outputs are text; their byte length is the stored `dataSize`
    fn output_local_to_standard(&self, local: &str) -> Result<Value>;

    fn output_standard_to_local(&self, standard: &Value) -> Result<String>;

    /// Call the remote source and return a standard-format result
    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value>;
}
