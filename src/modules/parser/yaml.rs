//! YAML configuration parser

use querybridge_core::{Config, QueryError, ServerConfig, StorageBackend, StorageConfig};
use serde::Deserialize;

use crate::env::EnvSubstitutor;

/// YAML parser for Querybridge configuration files
pub struct YamlParser;

/// On-disk schema. Kept permissive: `port` may be a number or a string and
/// `mongo_url` is accepted as an alias of `url`.
#[derive(Debug, Deserialize)]
struct RawConfig {
    name: String,

    #[serde(default)]
    server: Option<RawServer>,

    #[serde(default)]
    storage: Option<RawStorage>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    #[serde(default)]
    host: Option<String>,

    #[serde(default)]
    port: Option<serde_yaml::Value>,

    #[serde(default)]
    log_level: Option<u8>,

    #[serde(default)]
    enable_cors: Option<bool>,

    #[serde(default)]
    request_timeout_secs: Option<u64>,

    #[serde(default)]
    shutdown_grace_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawStorage {
    #[serde(default)]
    backend: Option<String>,

    #[serde(default)]
    url: Option<String>,

    /// Older field name
    #[serde(default)]
    mongo_url: Option<String>,

    #[serde(default)]
    database: Option<String>,

    #[serde(default)]
    collection: Option<String>,

    #[serde(default)]
    bucket: Option<String>,

    #[serde(default)]
    inline_threshold: Option<u64>,
}

impl YamlParser {
    /// Parse a YAML string into a Config, substituting environment variables first
    pub fn parse(content: &str) -> Result<Config, QueryError> {
        let substitutor = EnvSubstitutor::new();
        let substituted = substitutor.substitute(content)?;
        Self::parse_raw(&substituted)
    }

    /// Parse a YAML string without environment variable substitution
    pub fn parse_raw(content: &str) -> Result<Config, QueryError> {
        let raw = serde_yaml::from_str::<RawConfig>(content)
            .map_err(|e| QueryError::Config(format!("YAML parse error: {}", e)))?;
        raw_to_config(raw)
    }
}

fn raw_to_config(raw: RawConfig) -> Result<Config, QueryError> {
    let mut config = Config::new(raw.name);

    if let Some(s) = raw.server {
        let defaults = ServerConfig::default();
        config.server = ServerConfig {
            host: s.host.or(defaults.host),
            port: s.port.and_then(yaml_scalar_to_string).or(defaults.port),
            log_level: s.log_level.or(defaults.log_level),
            enable_cors: s.enable_cors.unwrap_or(defaults.enable_cors),
            request_timeout_secs: s.request_timeout_secs.or(defaults.request_timeout_secs),
            shutdown_grace_secs: s.shutdown_grace_secs.or(defaults.shutdown_grace_secs),
        };
    }

    if let Some(s) = raw.storage {
        let defaults = StorageConfig::default();
        let backend = match s.backend {
            Some(name) => name.parse::<StorageBackend>().map_err(QueryError::Config)?,
            None => defaults.backend,
        };
        config.storage = StorageConfig {
            backend,
            url: s.url.or(s.mongo_url).unwrap_or_default(),
            database: s.database.unwrap_or(defaults.database),
            collection: s.collection.unwrap_or(defaults.collection),
            bucket: s.bucket.unwrap_or(defaults.bucket),
            inline_threshold: s.inline_threshold.unwrap_or(defaults.inline_threshold),
        };
    }

    Ok(config)
}

fn yaml_scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s),
        other => serde_yaml::to_string(&other)
            .ok()
            .map(|s| s.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybridge_core::DEFAULT_INLINE_THRESHOLD;

    #[test]
    fn test_parse_minimal_config() {
        let config = YamlParser::parse_raw("name: minimal-bridge\n").unwrap();
        assert_eq!(config.name, "minimal-bridge");
        assert_eq!(config.port(), 8080);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.inline_threshold, DEFAULT_INLINE_THRESHOLD);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: full-bridge
server:
  host: 127.0.0.1
  port: "9090"
  log_level: 0
  enable_cors: true
  request_timeout_secs: 5
  shutdown_grace_secs: 2
storage:
  backend: mongo
  mongo_url: "mongodb://localhost:27017"
  database: bridge
  collection: q
  bucket: blobs
  inline_threshold: 4096
"#;
        let config = YamlParser::parse_raw(yaml).unwrap();
        assert_eq!(config.server.host(), "127.0.0.1");
        assert_eq!(config.port(), 9090);
        assert_eq!(config.log_level(), 0);
        assert_eq!(config.server.request_timeout().as_secs(), 5);
        assert_eq!(config.server.shutdown_grace().as_secs(), 2);
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.storage.url, "mongodb://localhost:27017");
        assert_eq!(config.storage.database, "bridge");
        assert_eq!(config.storage.bucket, "blobs");
        assert_eq!(config.storage.inline_threshold, 4096);
    }

    #[test]
    fn test_parse_unknown_backend() {
        let yaml = "name: x\nstorage:\n  backend: s3\n";
        let result = YamlParser::parse_raw(yaml);
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let yaml = "invalid: yaml: content: [";
        assert!(YamlParser::parse_raw(yaml).is_err());
    }
}
