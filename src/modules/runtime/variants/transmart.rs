//! tranSMART 17.1 connector (`TS171`)
//!
//! Authenticates with the OAuth password grant, then issues one GET against
//! the v2 REST API. Observation queries answer with a hypercube
//! (`dimensionDeclarations`, `dimensionElements`, `cells`); its cells become
//! the standard records and everything else is kept as `dimensions`. Output
//! without dimensions is stored as a plain array of records.

use async_trait::async_trait;
use querybridge_core::{Credentials, QueryError, Result, StandardInput, StandardOutput};
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::traits::{ExecutionContext, QueryVariant};

pub const SOURCE_TYPE: &str = "TS171";

/// OAuth client registered by default on tranSMART servers
const OAUTH_CLIENT_ID: &str = "glowingbear-js";

/// Query-string key receiving the serialized constraint when the URI has no placeholder
const DEFAULT_CONSTRAINT_KEY: &str = "constraint";

/// Native input: `{ uri, params, type }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransmartInput {
    uri: String,
    #[serde(default)]
    params: Value,
    #[serde(rename = "type", default)]
    data_type: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// tranSMART 17.1 query variant
pub struct TransmartVariant {
    client: Client,
}

impl TransmartVariant {
    /// Use `client` for every request; its timeout bounds each remote call
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn parse_input(local: &Value) -> Result<TransmartInput> {
        serde_json::from_value(local.clone())
            .map_err(|e| QueryError::Translation(format!("Invalid {} input: {}", SOURCE_TYPE, e)))
    }

    async fn authenticate(&self, base: &str, credentials: &Credentials) -> Result<String> {
        let url = format!("{}/oauth/token", base);
        let form = [
            ("grant_type", "password"),
            ("client_id", OAUTH_CLIENT_ID),
            ("client_secret", ""),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| QueryError::RemoteExecution(format!("Authentication request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(QueryError::RemoteExecution(format!(
                "Authentication rejected with status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            QueryError::RemoteExecution(format!("Unexpected authentication response: {}", e))
        })?;
        Ok(token.access_token)
    }
}

/// Resolve `uri` against `base`, placing the JSON-encoded `params` into the
/// query-string key left empty in the URI (e.g. `?constraint=`).
fn build_url(base: &str, uri: &str, params: &Value) -> Result<Url> {
    let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
    let mut url = Url::parse(&format!("{}{}", base, path))
        .map_err(|e| QueryError::RemoteExecution(format!("Invalid source URL: {}", e)))?;

    let encoded = params.to_string();
    let mut placed = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for part in query.split('&').filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((key, value)) if !value.is_empty() => {
                pairs.push((key.to_string(), value.to_string()));
            }
            Some((key, _)) => {
                pairs.push((key.to_string(), encoded.clone()));
                placed = true;
            }
            None => {
                pairs.push((part.to_string(), encoded.clone()));
                placed = true;
            }
        }
    }
    if !placed && !params.is_null() {
        pairs.push((DEFAULT_CONSTRAINT_KEY.to_string(), encoded));
    }

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url)
}

#[async_trait]
impl QueryVariant for TransmartVariant {
    fn source_type(&self) -> &str {
        SOURCE_TYPE
    }

    fn input_local_to_standard(&self, local: &Value) -> Result<Value> {
        let input = Self::parse_input(local)?;
        StandardInput {
            resource: input.uri,
            filter: input.params,
            data_type: input.data_type,
        }
        .to_value()
    }

    fn input_standard_to_local(&self, standard: &Value) -> Result<Value> {
        let input = StandardInput::from_value(standard)?;
        Ok(serde_json::to_value(TransmartInput {
            uri: input.resource,
            params: input.filter,
            data_type: input.data_type,
        })?)
    }

    fn output_local_to_standard(&self, local: &str) -> Result<Value> {
        let body: Value = serde_json::from_str(local)
            .map_err(|e| QueryError::Translation(format!("{} output is not JSON: {}", SOURCE_TYPE, e)))?;

        let (records, dimensions) = match body {
            Value::Object(mut hypercube) => match hypercube.remove("cells") {
                Some(Value::Array(cells)) => (cells, Value::Object(hypercube)),
                Some(_) => {
                    return Err(QueryError::Translation(
                        "Hypercube 'cells' must be an array".to_string(),
                    ))
                }
                None => (vec![Value::Object(hypercube)], Value::Null),
            },
            Value::Array(items) => (items, Value::Null),
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
        let mut hypercube: Map<String, Value> = match output.dimensions {
            Value::Null => return Ok(serde_json::to_string(&output.records)?),
            Value::Object(map) => map,
            _ => {
                return Err(QueryError::Translation(
                    "Hypercube dimensions must be an object".to_string(),
                ))
            }
        };
        if hypercube.contains_key("cells") {
            return Err(QueryError::Translation(
                "Hypercube dimensions cannot contain 'cells'".to_string(),
            ));
        }
        hypercube.insert("cells".to_string(), Value::Array(output.records));
        Ok(serde_json::to_string(&Value::Object(hypercube))?)
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let mut input = Self::parse_input(&ctx.local_input)?;
        if let Some(constraint) = ctx.parameters.get(DEFAULT_CONSTRAINT_KEY) {
            input.params = constraint.clone();
        }

        let base = ctx.endpoint.base_url();
        let token = self.authenticate(&base, &ctx.credentials).await?;
        let url = build_url(&base, &input.uri, &input.params)?;
        debug!("Query {}: GET {}", ctx.query_id, url.path());

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| QueryError::RemoteExecution(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::RemoteExecution(format!(
                "{} answered with status {}",
                url.path(),
                status
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant() -> TransmartVariant {
        TransmartVariant::new(Client::new())
    }

    fn local_input() -> Value {
        json!({
            "uri": "/v2/observations?constraint=",
            "params": {
                "type": "combination",
                "operator": "and",
                "args": [
                    { "type": "concept", "path": "\\Public Studies\\Demography\\Gender\\Male\\" }
                ]
            },
            "type": "clinical"
        })
    }

    #[test]
    fn test_input_translation() {
        let variant = variant();
        let standard = variant.input_local_to_standard(&local_input()).unwrap();
        assert_eq!(standard["resource"], json!("/v2/observations?constraint="));
        assert_eq!(standard["dataType"], json!("clinical"));
        assert_eq!(standard["filter"]["operator"], json!("and"));

        let local = variant.input_standard_to_local(&standard).unwrap();
        assert_eq!(local, local_input());
    }

    #[test]
    fn test_input_without_uri_is_rejected() {
        let result = variant().input_local_to_standard(&json!({"params": {}}));
        assert!(matches!(result, Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_hypercube_output_translation() {
        let variant = variant();
        let local = r#"{"dimensionDeclarations":[{"name":"patient"}],"cells":[{"numericValue":1.0},{"stringValue":"F"}]}"#;
        let standard = variant.output_local_to_standard(local).unwrap();
        assert_eq!(standard["source"], json!("TS171"));
        assert_eq!(standard["records"].as_array().unwrap().len(), 2);
        assert_eq!(standard["dimensions"]["dimensionDeclarations"][0]["name"], json!("patient"));

        let back = variant.output_standard_to_local(&standard).unwrap();
        let reparsed: Value = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, serde_json::from_str::<Value>(local).unwrap());
    }

    #[test]
    fn test_plain_output_round_trip() {
        let variant = variant();
        let standard = json!({"source": "TS171", "records": [{"id": "s1"}]});
        let local = variant.output_standard_to_local(&standard).unwrap();
        assert_eq!(local, r#"[{"id":"s1"}]"#);
        assert_eq!(variant.output_local_to_standard(&local).unwrap(), standard);
    }

    #[test]
    fn test_output_dimensions_round_trip() {
        let variant = variant();
        for dimensions in [json!({}), json!({"dimensionDeclarations": [{"name": "study"}]})] {
            let standard = json!({
                "source": "TS171",
                "records": [{"id": 1}],
                "dimensions": dimensions
            });
            let local = variant.output_standard_to_local(&standard).unwrap();
            assert_eq!(variant.output_local_to_standard(&local).unwrap(), standard);
        }
    }

    #[test]
    fn test_cells_inside_dimensions_rejected() {
        let standard = json!({
            "source": "TS171",
            "records": [{"id": 1}],
            "dimensions": {"cells": []}
        });
        let result = variant().output_standard_to_local(&standard);
        assert!(matches!(result, Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_output_from_other_source_rejected() {
        let result = variant().output_standard_to_local(&json!({"source": "REST", "records": []}));
        assert!(matches!(result, Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_output_not_json() {
        let result = variant().output_local_to_standard("<html>502</html>");
        assert!(matches!(result, Err(QueryError::Translation(_))));
    }

    #[test]
    fn test_build_url_fills_placeholder() {
        let url = build_url(
            "http://transmart.example.org:80",
            "/v2/observations?constraint=",
            &json!({"type": "true"}),
        )
        .unwrap();
        assert_eq!(url.path(), "/v2/observations");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("constraint".to_string(), r#"{"type":"true"}"#.to_string())]);
    }

    #[test]
    fn test_build_url_keeps_fixed_pairs() {
        let url = build_url("http://tm", "/v2/studies?limit=5", &Value::Null).unwrap();
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("limit".to_string(), "5".to_string())]);
    }

    #[tokio::test]
    #[ignore] // Requires network access to a tranSMART instance
    async fn test_transmart_execute_against_demo_server() {
        let ctx = ExecutionContext {
            query_id: "demo".into(),
            endpoint: querybridge_core::Endpoint {
                source_type: SOURCE_TYPE.into(),
                source_name: "Transmart instance".into(),
                source_host: "http://transmart.thehyve.net".into(),
                source_port: 80,
                public: false,
            },
            credentials: Credentials {
                username: "demo-user".into(),
                password: "demo-user".into(),
            },
            local_input: local_input(),
            parameters: Value::Null,
        };
        let result = variant().execute(&ctx).await.unwrap();
        assert_eq!(result["source"], json!("TS171"));
    }
}
