//! Generic JSON-over-HTTP connector (`REST`)

use async_trait::async_trait;
use querybridge_core::{QueryError, Result, StandardInput, StandardOutput};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::traits::{ExecutionContext, QueryVariant};

pub const SOURCE_TYPE: &str = "REST";

const DATA_TYPE: &str = "json";

/// Native input: `{ path, query }` where `query` maps names to scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RestInput {
    path: String,
    #[serde(default)]
    query: Map<String, Value>,
}

/// Plain GET against `{host}:{port}{path}` with optional basic auth.
///
/// Local output is the response body: a JSON array of records, or any other
/// JSON value taken as a single record. Output with `dimensions` is kept as
/// `{"records": [...], "dimensions": ...}`, and a body of exactly that shape
/// is read back the same way.
pub struct RestVariant {
    client: Client,
}

impl RestVariant {
    /// Use `client` for every request; its timeout bounds each remote call
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn parse_input(local: &Value) -> Result<RestInput> {
        let input: RestInput = serde_json::from_value(local.clone())
            .map_err(|e| QueryError::Translation(format!("Invalid {} input: {}", SOURCE_TYPE, e)))?;
        if !input.path.starts_with('/') {
            return Err(QueryError::Translation(format!(
                "{} path must start with '/': {}",
                SOURCE_TYPE, input.path
            )));
        }
        Ok(input)
    }
}

/// Query-string values are sent as text; nested values as compact JSON
fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    query
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

/// `{"records": [...], "dimensions": ...}` and nothing else
fn is_envelope(body: &Map<String, Value>) -> bool {
    body.len() == 2
        && body.contains_key("dimensions")
        && matches!(body.get("records"), Some(Value::Array(_)))
}

#[async_trait]
impl QueryVariant for RestVariant {
    fn source_type(&self) -> &str {
        SOURCE_TYPE
    }

    fn input_local_to_standard(&self, local: &Value) -> Result<Value> {
        let input = Self::parse_input(local)?;
        StandardInput {
            resource: input.path,
            filter: Value::Object(input.query),
            data_type: DATA_TYPE.to_string(),
        }
        .to_value()
    }

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value> {
        let input = StandardInput::from_value(standard)?;
        let query = match input.filter {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(QueryError::Translation(format!(
                    "{} filter must be an object",
                    SOURCE_TYPE
                )))
            }
        };
        let local = serde_json::to_value(RestInput {
            path: input.resource,
            query,
        })?;
        // Validate the shape we just produced
        Self::parse_input(&local)?;
        Ok(local)
    }

    fn output_local_to_standard(&self, local: &str) -> Result<Value> {
        let body: Value = serde_json::from_str(local)
            .map_err(|e| QueryError::Translation(format!("{} output is not JSON: {}", SOURCE_TYPE, e)))?;
        let (records, dimensions) = match body {
            Value::Array(items) => (items, Value::Null),
            Value::Object(mut envelope) if is_envelope(&envelope) => {
                let dimensions = envelope.remove("dimensions").unwrap_or(Value::Null);
                match envelope.remove("records") {
                    Some(Value::Array(items)) => (items, dimensions),
                    _ => (Vec::new(), dimensions),
                }
            }
            other => (vec![other], Value::Null),
        };
        StandardOutput {
            source: SOURCE_TYPE.to_string(),
            records,
            dimensions,
        }
        .to_value()
    }

    fn output_standard_to_local(&self, standard: &Value) -> Result<String> {
        let output = StandardOutput::from_value(standard)?;
        if output.source != SOURCE_TYPE {
            return Err(QueryError::Translation(format!(
                "{} cannot store output of source '{}'",
                SOURCE_TYPE, output.source
            )));
        }
        if output.dimensions.is_null() {
            return Ok(serde_json::to_string(&output.records)?);
        }
        Ok(serde_json::to_string(&json!({
            "records": output.records,
            "dimensions": output.dimensions,
        }))?)
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let mut input = Self::parse_input(&ctx.local_input)?;
        if let Value::Object(overrides) = &ctx.parameters {
            for (k, v) in overrides {
                input.query.insert(k.clone(), v.clone());
            }
        }

        let url = format!("{}{}", ctx.endpoint.base_url(), input.path);
        debug!("Query {}: GET {}", ctx.query_id, input.path);

        let mut request = self
            .client
            .get(&url)
            .query(&query_pairs(&input.query))
            .header(ACCEPT, "application/json");
        if !ctx.credentials.username.is_empty() {
            request = request.basic_auth(&ctx.credentials.username, Some(&ctx.credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueryError::RemoteExecution(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::RemoteExecution(format!(
                "{} answered with status {}",
                input.path, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QueryError::RemoteExecution(format!("Reading response failed: {}", e)))?;

        self.output_local_to_standard(&body)
            .map_err(|e| QueryError::RemoteExecution(format!("Unexpected response shape: {}", e)))
    }
}
