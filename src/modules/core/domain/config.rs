//! Service configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default inline/blob cutoff: 8 MiB
pub const DEFAULT_INLINE_THRESHOLD: u64 = 8 * 1024 * 1024;

/// Largest accepted cutoff. An inline output must leave room for the rest of
/// the record inside the 16 MiB BSON document limit.
pub const MAX_INLINE_THRESHOLD: u64 = 12 * 1024 * 1024;

/// Root configuration of a Querybridge service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the service
    pub name: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Create a configuration with default server and in-memory storage
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Get the server port, defaulting to 8080
    pub fn port(&self) -> u16 {
        self.server
            .port
            .as_ref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080)
    }

    /// Get the log level, defaulting to 1 (INFO)
    pub fn log_level(&self) -> u8 {
        self.server.log_level.unwrap_or(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("querybridge")
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (default: 0.0.0.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port to listen on (default: 8080)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// Log level: 0=DEBUG, 1=INFO, 2=WARN, 3=ERROR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<u8>,

    /// Send permissive CORS headers
    #[serde(default)]
    pub enable_cors: bool,

    /// Per-request timeout in seconds (default: 30)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Seconds running executions get to finish on shutdown (default: 10)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_grace_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Some("0.0.0.0".to_string()),
            port: Some("8080".to_string()),
            log_level: Some(1),
            enable_cors: false,
            request_timeout_secs: Some(30),
            shutdown_grace_secs: Some(10),
        }
    }
}

impl ServerConfig {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs.unwrap_or(10))
    }
}

/// Which document/blob store pair backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB collection plus a GridFS bucket
    Mongodb,
    /// Process-local maps, lost on exit
    #[default]
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Mongodb => write!(f, "mongodb"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::Mongodb),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

/// Document store and blob store connection descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Connection URL (supports environment variable substitution)
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    /// GridFS bucket holding blob-stored outputs
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Outputs of at least this many bytes go to the blob store
    #[serde(default = "default_inline_threshold")]
    pub inline_threshold: u64,
}

fn default_database() -> String {
    "querybridge".to_string()
}

fn default_collection() -> String {
    "queries".to_string()
}

fn default_bucket() -> String {
    "query_output".to_string()
}

fn default_inline_threshold() -> u64 {
    DEFAULT_INLINE_THRESHOLD
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            url: String::new(),
            database: default_database(),
            collection: default_collection(),
            bucket: default_bucket(),
            inline_threshold: DEFAULT_INLINE_THRESHOLD,
        }
    }
}
